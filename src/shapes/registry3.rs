//! Wire registry for [`Shape3`] variants. Mirrors [`crate::shapes::registry2`].

use std::sync::OnceLock;

use glam::{Mat3, Vec3};

use super::three::Shape3;
use crate::error::ProtocolError;
use crate::wire::{self, Reader};

type Decoder = fn(&mut Reader) -> Result<Shape3, ProtocolError>;

struct Entry {
  name: &'static str,
  decode: Decoder,
}

fn entries() -> &'static [Entry] {
  static REGISTRY: OnceLock<Vec<Entry>> = OnceLock::new();
  REGISTRY.get_or_init(|| {
    let mut v = vec![
      Entry { name: "Box3", decode: decode_box },
      Entry { name: "Sphere3", decode: decode_sphere },
      Entry { name: "Capsule3", decode: decode_capsule },
      Entry { name: "HalfSpace3", decode: decode_half_space },
      Entry { name: "CellularNoise3", decode: decode_cellular_noise },
      Entry { name: "Translate3", decode: decode_translate },
      Entry { name: "Transformed3", decode: decode_transformed },
      Entry { name: "Intersect3", decode: decode_intersect },
      Entry { name: "Union3", decode: decode_union },
      Entry { name: "Expand3", decode: decode_expand },
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

pub fn encode(shape: &Shape3, buf: &mut Vec<u8>) {
  wire::write_u32(buf, index_of(shape.canonical_name()));
  write_payload(shape, buf);
}

pub fn decode(reader: &mut Reader) -> Result<Shape3, ProtocolError> {
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

fn write_vec3(buf: &mut Vec<u8>, v: Vec3) {
  wire::write_f32(buf, v.x);
  wire::write_f32(buf, v.y);
  wire::write_f32(buf, v.z);
}

fn read_vec3(r: &mut Reader) -> Result<Vec3, ProtocolError> {
  Ok(Vec3::new(r.read_f32()?, r.read_f32()?, r.read_f32()?))
}

fn write_payload(shape: &Shape3, buf: &mut Vec<u8>) {
  match shape {
    Shape3::Box { half_extents } => write_vec3(buf, *half_extents),
    Shape3::Sphere { radius } => wire::write_f32(buf, *radius),
    Shape3::Capsule { a, b, radius } => {
      write_vec3(buf, *a);
      write_vec3(buf, *b);
      wire::write_f32(buf, *radius);
    }
    Shape3::HalfSpace { normal, offset } => {
      write_vec3(buf, *normal);
      wire::write_f32(buf, *offset);
    }
    Shape3::CellularNoise {
      seed,
      cell_size,
      distance_offset,
    } => {
      wire::write_u32(buf, *seed);
      write_vec3(buf, *cell_size);
      wire::write_f32(buf, *distance_offset);
    }
    Shape3::Translate { offset, inner } => {
      write_vec3(buf, *offset);
      encode(inner, buf);
    }
    Shape3::Transformed { matrix, inner } => {
      for col in matrix.to_cols_array() {
        wire::write_f32(buf, col);
      }
      encode(inner, buf);
    }
    Shape3::Intersect { a, b } => {
      encode(a, buf);
      encode(b, buf);
    }
    Shape3::Union { a, b } => {
      encode(a, buf);
      encode(b, buf);
    }
    Shape3::Expand { inner, amount } => {
      wire::write_f32(buf, *amount);
      encode(inner, buf);
    }
  }
}

fn decode_box(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  Ok(Shape3::Box { half_extents: read_vec3(r)? })
}

fn decode_sphere(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  Ok(Shape3::Sphere { radius: r.read_f32()? })
}

fn decode_capsule(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let a = read_vec3(r)?;
  let b = read_vec3(r)?;
  let radius = r.read_f32()?;
  Ok(Shape3::Capsule { a, b, radius })
}

fn decode_half_space(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let normal = read_vec3(r)?;
  let offset = r.read_f32()?;
  Ok(Shape3::HalfSpace { normal, offset })
}

fn decode_cellular_noise(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let seed = r.read_u32()?;
  let cell_size = read_vec3(r)?;
  let distance_offset = r.read_f32()?;
  Ok(Shape3::CellularNoise {
    seed,
    cell_size,
    distance_offset,
  })
}

fn decode_translate(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let offset = read_vec3(r)?;
  let inner = decode(r)?;
  Ok(Shape3::Translate {
    offset,
    inner: Box::new(inner),
  })
}

fn decode_transformed(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let mut cols = [0.0f32; 9];
  for c in cols.iter_mut() {
    *c = r.read_f32()?;
  }
  let matrix = Mat3::from_cols_array(&cols);
  let inner = decode(r)?;
  Ok(Shape3::Transformed {
    matrix,
    inner: Box::new(inner),
  })
}

fn decode_intersect(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let a = decode(r)?;
  let b = decode(r)?;
  Ok(Shape3::Intersect {
    a: Box::new(a),
    b: Box::new(b),
  })
}

fn decode_union(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let a = decode(r)?;
  let b = decode(r)?;
  Ok(Shape3::Union {
    a: Box::new(a),
    b: Box::new(b),
  })
}

fn decode_expand(r: &mut Reader) -> Result<Shape3, ProtocolError> {
  let amount = r.read_f32()?;
  let inner = decode(r)?;
  Ok(Shape3::Expand {
    inner: Box::new(inner),
    amount,
  })
}
