//! Error taxonomy (SPEC §7).
//!
//! Programmer errors are not represented here at all — they are
//! `panic!`/`assert!` at the call site, matching "Assertion failures are
//! fatal and halt the process in debug builds." Configuration warnings are
//! not `Result`s either: they are logged via `tracing::warn!` and the
//! affected operation is silently skipped. Only the "recoverable by resync"
//! class gets a typed error, since it is the only class a caller is expected
//! to branch on.

use thiserror::Error;

/// Errors recoverable by the replication protocol's own resync mechanism.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
  /// The wire byte stream named a shape-registry index with no registered
  /// entry. The frame containing it is dropped; the next server tick
  /// retransmits from the same cursor.
  #[error("shape registry index {index} is not registered (registry has {registered} entries)")]
  UnknownShapeIndex { index: u32, registered: usize },

  /// The observer's locally tracked modification count did not match the
  /// frame's `previous_modification_count`. The frame is dropped.
  #[error(
    "modification frame out of sync: local count {local}, frame expects previous count {expected}"
  )]
  FrameOutOfSync { local: u32, expected: u32 },

  /// A frame claimed more modifications than `MAX_FRAME_MODIFICATIONS`
  /// permits, or fewer bytes were available than the header promised.
  #[error("malformed modification frame: {reason}")]
  MalformedFrame { reason: &'static str },
}

/// Errors surfaced from a background task (SPEC §7: "Background task
/// exceptions propagate into the returned task and are surfaced to the
/// caller; they do not kill the world").
#[derive(Debug, Error)]
pub enum BackgroundTaskError {
  /// The worker closure panicked; the channel sender was dropped without
  /// sending a result.
  #[error("background task panicked before producing a result")]
  Panicked,
}
