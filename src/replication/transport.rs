//! Transport host trait (SPEC §4.5 supplement).
//!
//! The distilled protocol only describes the frame wire layout; it never
//! says how bytes actually move between authority and observer. This stays
//! a host concern the same way [`crate::host::MeshWriter`] keeps rendering
//! out of the core: the core only ever hands the transport an already-encoded
//! byte buffer.

use thiserror::Error;

/// Opaque per-connection identity the host assigns to each observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
  /// The host's outbound channel is full or the peer is gone; the frame was
  /// not durably enqueued. `ReplicationServer::tick` does not advance the
  /// observer's cursor when this is returned (SPEC §9).
  #[error("transport could not enqueue frame for observer")]
  NotEnqueued,
}

/// Host-supplied byte pipe between an authority and its observers.
///
/// `enqueue_frame` must not report success unless the frame is durably
/// queued for delivery: the server never retries a frame once `Ok` comes
/// back, it only advances the cursor past it.
pub trait ReplicationTransport: Send {
  fn enqueue_frame(&mut self, observer: ObserverId, frame: &[u8]) -> Result<(), TransportError>;

  /// Pulls the next inbound frame addressed to this peer, if any. An
  /// observer calls this once per tick to drain frames sent by its
  /// authority.
  fn poll_inbound(&mut self) -> Option<Vec<u8>>;
}
