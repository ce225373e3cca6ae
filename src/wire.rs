//! Minimal little-endian byte reader/writer for the modification-frame and
//! shape wire formats (SPEC §6).
//!
//! The pack's networking-adjacent crates (e.g. `valence`'s
//! `protocol::encode`) reach for the `bytes` crate, but nothing else in this
//! crate's dependency stack needs buffer pooling or `Buf`/`BufMut` — a plain
//! slice cursor covers the fixed little-endian primitives this protocol
//! uses, so no new dependency is introduced for it.

use crate::error::ProtocolError;

/// Cursor over an incoming byte slice.
pub struct Reader<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> Reader<'a> {
  pub fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, pos: 0 }
  }

  pub fn remaining(&self) -> usize {
    self.bytes.len() - self.pos
  }

  fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
    if self.remaining() < n {
      return Err(ProtocolError::MalformedFrame {
        reason: "unexpected end of buffer",
      });
    }
    let slice = &self.bytes[self.pos..self.pos + n];
    self.pos += n;
    Ok(slice)
  }

  pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
    Ok(self.take(1)?[0])
  }

  pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
    let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
    Ok(u32::from_le_bytes(bytes))
  }

  pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
    let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
    Ok(i32::from_le_bytes(bytes))
  }

  pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
    let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
    Ok(f32::from_le_bytes(bytes))
  }

  pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
    let bytes: [u8; 8] = self.take(8)?.try_into().unwrap();
    Ok(u64::from_le_bytes(bytes))
  }
}

pub fn write_u8(buf: &mut Vec<u8>, value: u8) {
  buf.push(value);
}

pub fn write_u32(buf: &mut Vec<u8>, value: u32) {
  buf.extend_from_slice(&value.to_le_bytes());
}

pub fn write_i32(buf: &mut Vec<u8>, value: i32) {
  buf.extend_from_slice(&value.to_le_bytes());
}

pub fn write_f32(buf: &mut Vec<u8>, value: f32) {
  buf.extend_from_slice(&value.to_le_bytes());
}

pub fn write_u64(buf: &mut Vec<u8>, value: u64) {
  buf.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roundtrip_primitives() {
    let mut buf = Vec::new();
    write_u8(&mut buf, 7);
    write_u32(&mut buf, 0xdead_beef);
    write_i32(&mut buf, -12345);
    write_f32(&mut buf, 3.5);
    write_u64(&mut buf, 0xdead_beef_cafe_babe);

    let mut r = Reader::new(&buf);
    assert_eq!(r.read_u8().unwrap(), 7);
    assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
    assert_eq!(r.read_i32().unwrap(), -12345);
    assert_eq!(r.read_f32().unwrap(), 3.5);
    assert_eq!(r.read_u64().unwrap(), 0xdead_beef_cafe_babe);
  }

  #[test]
  fn truncated_buffer_is_malformed() {
    let buf = vec![1, 2, 3];
    let mut r = Reader::new(&buf);
    assert!(matches!(r.read_u32(), Err(ProtocolError::MalformedFrame { .. })));
  }
}
