//! Wire registry for [`Shape2`] variants (SPEC §4.1, §6).
//!
//! Populated once from a fixed per-variant registration list and sorted by
//! canonical name, so every peer (authority and every observer) assigns the
//! same index to the same variant without negotiation.

use std::sync::OnceLock;

use glam::{Mat2, Vec2};

use super::two::Shape2;
use crate::error::ProtocolError;
use crate::wire::{self, Reader};

type Decoder = fn(&mut Reader) -> Result<Shape2, ProtocolError>;

struct Entry {
  name: &'static str,
  decode: Decoder,
}

fn entries() -> &'static [Entry] {
  static REGISTRY: OnceLock<Vec<Entry>> = OnceLock::new();
  REGISTRY.get_or_init(|| {
    let mut v = vec![
      Entry { name: "Box2", decode: decode_box },
      Entry { name: "Disc2", decode: decode_disc },
      Entry { name: "Capsule2", decode: decode_capsule },
      Entry { name: "HalfPlane2", decode: decode_half_plane },
      Entry { name: "CellularNoise2", decode: decode_cellular_noise },
      Entry { name: "Translate2", decode: decode_translate },
      Entry { name: "Transformed2", decode: decode_transformed },
      Entry { name: "Intersect2", decode: decode_intersect },
      Entry { name: "Union2", decode: decode_union },
      Entry { name: "Expand2", decode: decode_expand },
    ];
    v.sort_by_key(|e| e.name);
    v
  })
}

fn index_of(name: &str) -> u32 {
  entries()
    .iter()
    .position(|e| e.name == name)
    .unwrap_or_else(|| panic!("shape variant {name} is not registered")) as u32
}

/// Encode a shape (registry index, then payload) onto `buf`.
///
/// Failing to find the variant in the registry is a programmer error
/// (fatal): the registration list above is exhaustive over `Shape2`.
pub fn encode(shape: &Shape2, buf: &mut Vec<u8>) {
  wire::write_u32(buf, index_of(shape.canonical_name()));
  write_payload(shape, buf);
}

/// Decode a shape by reading its registry index then dispatching to that
/// variant's payload reader.
pub fn decode(reader: &mut Reader) -> Result<Shape2, ProtocolError> {
  let index = reader.read_u32()?;
  let entries = entries();
  let entry = entries
    .get(index as usize)
    .ok_or(ProtocolError::UnknownShapeIndex {
      index,
      registered: entries.len(),
    })?;
  (entry.decode)(reader)
}

fn write_vec2(buf: &mut Vec<u8>, v: Vec2) {
  wire::write_f32(buf, v.x);
  wire::write_f32(buf, v.y);
}

fn read_vec2(r: &mut Reader) -> Result<Vec2, ProtocolError> {
  Ok(Vec2::new(r.read_f32()?, r.read_f32()?))
}

fn write_payload(shape: &Shape2, buf: &mut Vec<u8>) {
  match shape {
    Shape2::Box { half_extents } => write_vec2(buf, *half_extents),
    Shape2::Disc { radius } => wire::write_f32(buf, *radius),
    Shape2::Capsule { a, b, radius } => {
      write_vec2(buf, *a);
      write_vec2(buf, *b);
      wire::write_f32(buf, *radius);
    }
    Shape2::HalfPlane { normal, offset } => {
      write_vec2(buf, *normal);
      wire::write_f32(buf, *offset);
    }
    Shape2::CellularNoise {
      seed,
      cell_size,
      distance_offset,
    } => {
      wire::write_u32(buf, *seed);
      write_vec2(buf, *cell_size);
      wire::write_f32(buf, *distance_offset);
    }
    Shape2::Translate { offset, inner } => {
      write_vec2(buf, *offset);
      encode(inner, buf);
    }
    Shape2::Transformed { matrix, inner } => {
      for col in matrix.to_cols_array() {
        wire::write_f32(buf, col);
      }
      encode(inner, buf);
    }
    Shape2::Intersect { a, b } => {
      encode(a, buf);
      encode(b, buf);
    }
    Shape2::Union { a, b } => {
      encode(a, buf);
      encode(b, buf);
    }
    Shape2::Expand { inner, amount } => {
      wire::write_f32(buf, *amount);
      encode(inner, buf);
    }
  }
}

fn decode_box(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  Ok(Shape2::Box { half_extents: read_vec2(r)? })
}

fn decode_disc(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  Ok(Shape2::Disc { radius: r.read_f32()? })
}

fn decode_capsule(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let a = read_vec2(r)?;
  let b = read_vec2(r)?;
  let radius = r.read_f32()?;
  Ok(Shape2::Capsule { a, b, radius })
}

fn decode_half_plane(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let normal = read_vec2(r)?;
  let offset = r.read_f32()?;
  Ok(Shape2::HalfPlane { normal, offset })
}

fn decode_cellular_noise(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let seed = r.read_u32()?;
  let cell_size = read_vec2(r)?;
  let distance_offset = r.read_f32()?;
  Ok(Shape2::CellularNoise {
    seed,
    cell_size,
    distance_offset,
  })
}

fn decode_translate(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let offset = read_vec2(r)?;
  let inner = decode(r)?;
  Ok(Shape2::Translate {
    offset,
    inner: Box::new(inner),
  })
}

fn decode_transformed(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let mut cols = [0.0f32; 4];
  for c in cols.iter_mut() {
    *c = r.read_f32()?;
  }
  let matrix = Mat2::from_cols_array(&cols);
  let inner = decode(r)?;
  Ok(Shape2::Transformed {
    matrix,
    inner: Box::new(inner),
  })
}

fn decode_intersect(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let a = decode(r)?;
  let b = decode(r)?;
  Ok(Shape2::Intersect {
    a: Box::new(a),
    b: Box::new(b),
  })
}

fn decode_union(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let a = decode(r)?;
  let b = decode(r)?;
  Ok(Shape2::Union {
    a: Box::new(a),
    b: Box::new(b),
  })
}

fn decode_expand(r: &mut Reader) -> Result<Shape2, ProtocolError> {
  let amount = r.read_f32()?;
  let inner = decode(r)?;
  Ok(Shape2::Expand {
    inner: Box::new(inner),
    amount,
  })
}
