//! 3D (volume) margined sample array (SPEC §4.2). Mirrors
//! [`crate::sample_array::array2::SampleArray2`] one axis up.

use glam::Vec3;

use crate::aabb::Aabb3;
use crate::constants::{MARGIN, MAX_ENCODED};
use crate::quantize;
use crate::shapes::Shape3;

pub trait GridWriter3: Send {
  fn write(&mut self, samples: &[u8], array_size: u32, base_index: [i32; 3], strides: [usize; 3]);
}

#[derive(Clone, Debug)]
pub struct SampleArray3 {
  samples: Vec<u8>,
  array_size: u32,
  unit_size: f32,
  max_distance: f32,
  modification_count: u32,
}

impl SampleArray3 {
  pub fn new(array_size: u32, unit_size: f32, max_distance: f32) -> Self {
    let len = (array_size as u64).pow(3) as usize;
    Self {
      samples: vec![quantize::empty_value(); len],
      array_size,
      unit_size,
      max_distance,
      modification_count: 0,
    }
  }

  pub fn array_size(&self) -> u32 {
    self.array_size
  }

  pub fn modification_count(&self) -> u32 {
    self.modification_count
  }

  #[inline]
  fn index(&self, ix: u32, iy: u32, iz: u32) -> usize {
    ((iz * self.array_size + iy) * self.array_size + ix) as usize
  }

  #[inline]
  fn local_position(&self, ix: i32, iy: i32, iz: i32) -> Vec3 {
    Vec3::new(
      (ix - MARGIN) as f32 * self.unit_size,
      (iy - MARGIN) as f32 * self.unit_size,
      (iz - MARGIN) as f32 * self.unit_size,
    )
  }

  fn sample_index_range(&self, bounds: Aabb3) -> Option<([i32; 3], [i32; 3])> {
    if bounds.is_empty() {
      return None;
    }
    let mut lo = [0i32; 3];
    let mut hi = [0i32; 3];
    for axis in 0..3 {
      let min_f = (bounds.min[axis] / self.unit_size + MARGIN as f32).floor();
      let max_f = (bounds.max[axis] / self.unit_size + MARGIN as f32).ceil();
      lo[axis] = (min_f as i32).clamp(0, self.array_size as i32);
      hi[axis] = (max_f as i32).clamp(0, self.array_size as i32);
    }
    if lo[0] >= hi[0] || lo[1] >= hi[1] || lo[2] >= hi[2] {
      return None;
    }
    Some((lo, hi))
  }

  pub fn add(&mut self, shape: &Shape3) -> bool {
    let Some((lo, hi)) = self.sample_index_range(shape.bounds()) else {
      return false;
    };
    let mut changed = false;
    for iz in lo[2]..hi[2] {
      for iy in lo[1]..hi[1] {
        for ix in lo[0]..hi[0] {
          let p = self.local_position(ix, iy, iz);
          let d = shape.sample(p);
          if d < self.max_distance {
            let encoded = quantize::encode(d, self.max_distance);
            let idx = self.index(ix as u32, iy as u32, iz as u32);
            if encoded < self.samples[idx] {
              self.samples[idx] = encoded;
              changed = true;
            }
          }
        }
      }
    }
    if changed {
      self.modification_count += 1;
    }
    changed
  }

  pub fn subtract(&mut self, shape: &Shape3) -> bool {
    let Some((lo, hi)) = self.sample_index_range(shape.bounds()) else {
      return false;
    };
    let mut changed = false;
    for iz in lo[2]..hi[2] {
      for iy in lo[1]..hi[1] {
        for ix in lo[0]..hi[0] {
          let p = self.local_position(ix, iy, iz);
          let d = shape.sample(p);
          let carved = MAX_ENCODED - quantize::encode(d, self.max_distance);
          let idx = self.index(ix as u32, iy as u32, iz as u32);
          if carved > self.samples[idx] {
            self.samples[idx] = carved;
            changed = true;
          }
        }
      }
    }
    if changed {
      self.modification_count += 1;
    }
    changed
  }

  pub fn clear(&mut self, solid: bool) {
    let value = if solid { quantize::solid_value() } else { quantize::empty_value() };
    self.samples.fill(value);
    self.modification_count += 1;
  }

  pub fn write_to(&self, writer: &mut dyn GridWriter3) {
    let s = self.array_size as usize;
    writer.write(&self.samples, self.array_size, [MARGIN, MARGIN, MARGIN], [1, s, s * s]);
  }

  #[cfg(test)]
  fn decoded_at(&self, ix: u32, iy: u32, iz: u32) -> f32 {
    quantize::decode(self.samples[self.index(ix, iy, iz)], self.max_distance)
  }
}
