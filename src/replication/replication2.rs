//! Authority and observer replication drivers for [`crate::world::World2`].
//! Mirrors [`super::replication3`] one axis down.

use std::collections::HashMap;

use tracing::warn;

use crate::constants::MAX_FRAME_MODIFICATIONS;
use crate::error::ProtocolError;
use crate::host::{MainThread, ServerTick};
use crate::modification::Operator;
use crate::shapes::registry2;
use crate::world::World2;

use super::cursor::ObserverCursor;
use super::frame::{decode_frame, encode_frame};
use super::transport::{ObserverId, ReplicationTransport, TransportError};

/// Authority-side driver for a [`World2`]. Mirrors [`super::replication3::ReplicationServer3`].
#[derive(Default)]
pub struct ReplicationServer2 {
  cursors: HashMap<ObserverId, ObserverCursor>,
}

impl ReplicationServer2 {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register_observer(&mut self, observer: ObserverId) {
    self.cursors.entry(observer).or_insert_with(ObserverCursor::new);
  }

  pub fn remove_observer(&mut self, observer: ObserverId) {
    self.cursors.remove(&observer);
  }

  pub fn tick(&mut self, world: &mut World2, transport: &mut dyn ReplicationTransport, _tick: ServerTick) {
    let log_clear_count = world.modification_log().clear_count();
    let log_len = world.modification_log().len() as u32;
    for (&observer, cursor) in self.cursors.iter_mut() {
      if cursor.clear_count != log_clear_count {
        cursor.clear_count = log_clear_count;
        cursor.modification_count = 0;
      }
      if cursor.modification_count == log_len {
        continue;
      }
      let from = cursor.modification_count as usize;
      let to = (from + MAX_FRAME_MODIFICATIONS).min(log_len as usize);
      let slice = world.modification_log().slice(from, to);
      let frame = encode_frame(cursor.clear_count, cursor.modification_count, log_len, slice, registry2::encode);
      match transport.enqueue_frame(observer, &frame) {
        Ok(()) => {
          cursor.modification_count = to as u32;
          world.metrics_mut().record_frame_sent();
        }
        Err(_) => {
          warn!(?observer, "replication transport rejected frame; retrying next tick");
        }
      }
    }
  }
}

/// Decodes and applies one inbound modification frame to an observer world.
pub fn receive_frame(world: &mut World2, bytes: &[u8], main_thread: MainThread) -> Result<(), ProtocolError> {
  let frame = decode_frame(bytes, registry2::decode)?;

  let mut local_clear_count = world.modification_log().clear_count();
  if frame.clear_count < local_clear_count {
    // Stale/duplicated/reordered frame from an earlier epoch; `clear_async`
    // can only ever move `local_clear_count` forward, so this can never be
    // caught up to. Reject it rather than spinning forever.
    world.metrics_mut().record_frame_rejected();
    return Err(ProtocolError::FrameOutOfSync {
      local: local_clear_count,
      expected: frame.clear_count,
    });
  }
  while frame.clear_count > local_clear_count {
    world.clear_async(main_thread);
    local_clear_count = world.modification_log().clear_count();
  }

  let local_modification_count = world.modification_log().len() as u32;
  if frame.previous_modification_count != local_modification_count {
    world.metrics_mut().record_frame_rejected();
    return Err(ProtocolError::FrameOutOfSync {
      local: local_modification_count,
      expected: frame.previous_modification_count,
    });
  }

  world.with_receiving_modifications(|w| {
    for modification in &frame.modifications {
      match modification.operator {
        Operator::Add => w.add_async(modification.shape.clone(), modification.resource, main_thread),
        Operator::Subtract => w.subtract_async(modification.shape.clone(), modification.resource, main_thread),
      }
    }
  });
  Ok(())
}
