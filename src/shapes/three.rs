//! Closed set of 3D ("volume") SDF shape variants (SPEC §4.1).
//!
//! Mirrors [`crate::shapes::two::Shape2`] one axis up; kept as an
//! independent enum rather than unified via a dimension parameter, per the
//! same reasoning as [`crate::aabb::Aabb`]'s two-implementations choice.

use glam::{Mat3, Vec3};

use super::noise;
use crate::aabb::Aabb3;

#[derive(Clone, Debug)]
pub enum Shape3 {
  Box {
    half_extents: Vec3,
  },
  Sphere {
    radius: f32,
  },
  Capsule {
    a: Vec3,
    b: Vec3,
    radius: f32,
  },
  HalfSpace {
    normal: Vec3,
    offset: f32,
  },
  CellularNoise {
    seed: u32,
    cell_size: Vec3,
    distance_offset: f32,
  },
  Translate {
    offset: Vec3,
    inner: Box<Shape3>,
  },
  Transformed {
    /// Forward transform; sampling applies its inverse to the query point.
    matrix: Mat3,
    inner: Box<Shape3>,
  },
  Intersect {
    a: Box<Shape3>,
    b: Box<Shape3>,
  },
  Union {
    a: Box<Shape3>,
    b: Box<Shape3>,
  },
  Expand {
    inner: Box<Shape3>,
    amount: f32,
  },
}

fn box_sdf(p: Vec3, half_extents: Vec3) -> f32 {
  let q = p.abs() - half_extents;
  q.max(Vec3::ZERO).length() + q.x.max(q.y).max(q.z).min(0.0)
}

fn capsule_sdf(p: Vec3, a: Vec3, b: Vec3, radius: f32) -> f32 {
  let pa = p - a;
  let ba = b - a;
  let h = (pa.dot(ba) / ba.dot(ba)).clamp(0.0, 1.0);
  (pa - ba * h).length() - radius
}

impl Shape3 {
  pub fn canonical_name(&self) -> &'static str {
    match self {
      Shape3::Box { .. } => "Box3",
      Shape3::Sphere { .. } => "Sphere3",
      Shape3::Capsule { .. } => "Capsule3",
      Shape3::HalfSpace { .. } => "HalfSpace3",
      Shape3::CellularNoise { .. } => "CellularNoise3",
      Shape3::Translate { .. } => "Translate3",
      Shape3::Transformed { .. } => "Transformed3",
      Shape3::Intersect { .. } => "Intersect3",
      Shape3::Union { .. } => "Union3",
      Shape3::Expand { .. } => "Expand3",
    }
  }

  pub fn sample(&self, p: Vec3) -> f32 {
    match self {
      Shape3::Box { half_extents } => box_sdf(p, *half_extents),
      Shape3::Sphere { radius } => p.length() - radius,
      Shape3::Capsule { a, b, radius } => capsule_sdf(p, *a, *b, *radius),
      Shape3::HalfSpace { normal, offset } => normal.dot(p) - offset,
      Shape3::CellularNoise {
        seed,
        cell_size,
        distance_offset,
      } => noise::nearest_feature_distance_3d(*seed, p.into(), (*cell_size).into()) - distance_offset,
      Shape3::Translate { offset, inner } => inner.sample(p - *offset),
      Shape3::Transformed { matrix, inner } => inner.sample(matrix.inverse() * p),
      Shape3::Intersect { a, b } => a.sample(p).max(b.sample(p)),
      Shape3::Union { a, b } => a.sample(p).min(b.sample(p)),
      Shape3::Expand { inner, amount } => inner.sample(p) - amount,
    }
  }

  pub fn bounds(&self) -> Aabb3 {
    match self {
      Shape3::Box { half_extents } => Aabb3::from_center_half_extents([0.0, 0.0, 0.0], (*half_extents).into()),
      Shape3::Sphere { radius } => Aabb3::from_center_half_extents([0.0, 0.0, 0.0], [*radius, *radius, *radius]),
      Shape3::Capsule { a, b, radius } => {
        let min = a.min(*b) - Vec3::splat(*radius);
        let max = a.max(*b) + Vec3::splat(*radius);
        Aabb3::new(min.into(), max.into())
      }
      Shape3::HalfSpace { .. } => Aabb3::empty(),
      Shape3::CellularNoise { .. } => Aabb3::empty(),
      Shape3::Translate { offset, inner } => inner.bounds().translated((*offset).into()),
      Shape3::Transformed { matrix, inner } => {
        let b = inner.bounds();
        if b.is_empty() {
          return b;
        }
        let mut out = Aabb3::empty();
        for &x in &[b.min[0], b.max[0]] {
          for &y in &[b.min[1], b.max[1]] {
            for &z in &[b.min[2], b.max[2]] {
              let t = *matrix * Vec3::new(x, y, z);
              out = out.union(&Aabb3::new(t.into(), t.into()));
            }
          }
        }
        out
      }
      Shape3::Intersect { a, b } => {
        let (ab, bb) = (a.bounds(), b.bounds());
        match (ab.is_empty(), bb.is_empty()) {
          (true, true) => Aabb3::empty(),
          (true, false) => bb,
          (false, true) => ab,
          (false, false) => ab.intersection(&bb),
        }
      }
      Shape3::Union { a, b } => a.bounds().union(&b.bounds()),
      Shape3::Expand { inner, amount } => inner.bounds().expanded(*amount),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sphere_bounds_are_symmetric() {
    let s = Shape3::Sphere { radius: 5.0 };
    let b = s.bounds();
    assert_eq!(b.min, [-5.0, -5.0, -5.0]);
    assert_eq!(b.max, [5.0, 5.0, 5.0]);
  }

  #[test]
  fn box_sample_matches_inside_outside() {
    let s = Shape3::Box {
      half_extents: Vec3::splat(8.0),
    };
    assert!(s.sample(Vec3::ZERO) < 0.0);
    assert!(s.sample(Vec3::splat(100.0)) > 0.0);
  }

  #[test]
  fn add_then_subtract_same_sphere_is_symmetric_in_sample_sign() {
    let sphere = Shape3::Sphere { radius: 5.0 };
    let d = sphere.sample(Vec3::ZERO);
    assert!(d < 0.0);
  }

  #[test]
  fn intersect_with_noise_yields_finite_bounds() {
    let noise = Shape3::CellularNoise {
      seed: 7,
      cell_size: Vec3::splat(4.0),
      distance_offset: 0.5,
    };
    let bx = Shape3::Box {
      half_extents: Vec3::splat(8.0),
    };
    let clipped = Shape3::Intersect {
      a: Box::new(noise),
      b: Box::new(bx),
    };
    assert!(!clipped.bounds().is_empty());
  }
}
