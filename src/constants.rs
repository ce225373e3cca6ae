//! Crate-wide constants shared by the quantised sample store.

/// Fixed margin (in samples) added on every side of a chunk's nominal
/// resolution so neighbouring chunks agree on boundary gradients.
///
/// The spec fixes this at 1; it is not configurable per quality setting.
pub const MARGIN: i32 = 1;

/// Highest encodable quantised distance value.
///
/// Chosen odd-adjacent (254, not 255) so that `encode(0.0) == MAX_ENCODED / 2`
/// is exact and `encode(d) + encode(-d) == MAX_ENCODED` holds for every
/// representable `d` — both are relied on by [`crate::quantize`] and by the
/// `subtract` rule in [`crate::sample_array`].
pub const MAX_ENCODED: u8 = 254;

/// Encoded value representing "exactly on the surface".
pub const MID_ENCODED: u8 = MAX_ENCODED / 2;

/// Default soft cap, in microseconds, on main-thread chunk-task draining per
/// tick (see [`crate::task::TickBudget`]).
pub const DEFAULT_TICK_BUDGET_MICROS: u64 = 1_000;

/// Maximum number of modifications packed into one replication frame.
pub const MAX_FRAME_MODIFICATIONS: usize = 64;
