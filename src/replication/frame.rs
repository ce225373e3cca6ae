//! Modification-frame wire format (SPEC §6):
//!
//! ```text
//! i32 clear_count
//! i32 previous_modification_count
//! i32 frame_count          -- <= MAX_FRAME_MODIFICATIONS
//! i32 total_modification_count
//! repeat frame_count times:
//!     u8  operator          -- 0 = Add, 1 = Subtract
//!     u64 resource
//!     shape                 -- registry-encoded (registry2/registry3)
//! ```

use crate::config::ResourceId;
use crate::constants::MAX_FRAME_MODIFICATIONS;
use crate::error::ProtocolError;
use crate::modification::{Modification, Operator};
use crate::wire::{self, Reader};

/// A decoded modification frame, generic over the shape type so the same
/// encode/decode logic serves both [`crate::shapes::Shape2`] and
/// [`crate::shapes::Shape3`].
pub struct ModificationFrame<S> {
  pub clear_count: u32,
  pub previous_modification_count: u32,
  pub total_modification_count: u32,
  pub modifications: Vec<Modification<S>>,
}

pub fn encode_frame<S>(
  clear_count: u32,
  previous_modification_count: u32,
  total_modification_count: u32,
  modifications: &[Modification<S>],
  encode_shape: impl Fn(&S, &mut Vec<u8>),
) -> Vec<u8> {
  debug_assert!(modifications.len() <= MAX_FRAME_MODIFICATIONS);
  let mut buf = Vec::new();
  wire::write_i32(&mut buf, clear_count as i32);
  wire::write_i32(&mut buf, previous_modification_count as i32);
  wire::write_i32(&mut buf, modifications.len() as i32);
  wire::write_i32(&mut buf, total_modification_count as i32);
  for modification in modifications {
    let operator_byte = match modification.operator {
      Operator::Add => 0u8,
      Operator::Subtract => 1u8,
    };
    wire::write_u8(&mut buf, operator_byte);
    wire::write_u64(&mut buf, modification.resource.0);
    encode_shape(&modification.shape, &mut buf);
  }
  buf
}

pub fn decode_frame<S>(
  bytes: &[u8],
  decode_shape: impl Fn(&mut Reader) -> Result<S, ProtocolError>,
) -> Result<ModificationFrame<S>, ProtocolError> {
  let mut reader = Reader::new(bytes);
  let clear_count = reader.read_i32()?;
  let previous_modification_count = reader.read_i32()?;
  let frame_count = reader.read_i32()?;
  let total_modification_count = reader.read_i32()?;
  if frame_count < 0 || frame_count as usize > MAX_FRAME_MODIFICATIONS {
    return Err(ProtocolError::MalformedFrame {
      reason: "frame_count exceeds MAX_FRAME_MODIFICATIONS",
    });
  }
  if clear_count < 0 || previous_modification_count < 0 || total_modification_count < 0 {
    return Err(ProtocolError::MalformedFrame {
      reason: "negative count field",
    });
  }
  let mut modifications = Vec::with_capacity(frame_count as usize);
  for _ in 0..frame_count {
    let operator = match reader.read_u8()? {
      0 => Operator::Add,
      1 => Operator::Subtract,
      _ => {
        return Err(ProtocolError::MalformedFrame {
          reason: "unknown operator byte",
        })
      }
    };
    let resource = ResourceId(reader.read_u64()?);
    let shape = decode_shape(&mut reader)?;
    modifications.push(Modification { operator, shape, resource });
  }
  Ok(ModificationFrame {
    clear_count: clear_count as u32,
    previous_modification_count: previous_modification_count as u32,
    total_modification_count: total_modification_count as u32,
    modifications,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::shapes::registry3;
  use crate::shapes::Shape3;
  use glam::Vec3;

  #[test]
  fn roundtrip_empty_frame() {
    let bytes = encode_frame::<Shape3>(0, 0, 0, &[], registry3::encode);
    let frame = decode_frame(&bytes, registry3::decode).unwrap();
    assert_eq!(frame.clear_count, 0);
    assert_eq!(frame.previous_modification_count, 0);
    assert_eq!(frame.total_modification_count, 0);
    assert!(frame.modifications.is_empty());
  }

  #[test]
  fn roundtrip_frame_with_modifications() {
    let modifications = vec![
      Modification {
        operator: Operator::Add,
        shape: Shape3::Sphere { radius: 2.5 },
        resource: ResourceId(7),
      },
      Modification {
        operator: Operator::Subtract,
        shape: Shape3::Box { half_extents: Vec3::splat(1.0) },
        resource: ResourceId(9),
      },
    ];
    let bytes = encode_frame(3, 10, 12, &modifications, registry3::encode);
    let frame = decode_frame(&bytes, registry3::decode).unwrap();
    assert_eq!(frame.clear_count, 3);
    assert_eq!(frame.previous_modification_count, 10);
    assert_eq!(frame.total_modification_count, 12);
    assert_eq!(frame.modifications.len(), 2);
    assert_eq!(frame.modifications[0].operator, Operator::Add);
    assert_eq!(frame.modifications[0].resource, ResourceId(7));
    assert_eq!(frame.modifications[1].operator, Operator::Subtract);
  }

  #[test]
  fn frame_count_over_budget_is_malformed() {
    let mut buf = Vec::new();
    wire::write_i32(&mut buf, 0);
    wire::write_i32(&mut buf, 0);
    wire::write_i32(&mut buf, (MAX_FRAME_MODIFICATIONS + 1) as i32);
    wire::write_i32(&mut buf, 0);
    let result = decode_frame::<Shape3>(&buf, registry3::decode);
    assert!(matches!(result, Err(ProtocolError::MalformedFrame { .. })));
  }
}
