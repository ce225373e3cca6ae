//! Who is allowed to mutate a world (SPEC §4.4 step 1, §6 "assert the caller
//! is permitted").

/// A world's position in the replication topology.
///
/// `assert_can_modify` (see [`super::world2::World2`]/[`super::world3::World3`])
/// passes for [`WorldRole::Authority`] and [`WorldRole::LocalOnly`]
/// unconditionally, and for [`WorldRole::Observer`] only while a
/// `receiving_modifications` scope is active (SPEC §6 "observer receive").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldRole {
  /// The peer that owns the modification log and drives replication.
  Authority,
  /// No replication at all (single-player); behaves like an authority for
  /// permission purposes but never ticks [`crate::replication`].
  LocalOnly,
  /// A replication client; may only mutate while replaying a received frame.
  Observer,
}
