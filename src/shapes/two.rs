//! Closed set of 2D ("layer") SDF shape variants (SPEC §4.1).
//!
//! A concrete enum rather than a boxed-trait-object hierarchy — this crate
//! chooses, per `SPEC_FULL.md` §3, two dimension-specific implementations
//! over a single heavily-generic one. Composition variants (`Translate`,
//! `Transformed`, `Intersect`, `Union`, `Expand`) hold their inner shape
//! behind a `Box` since `Shape2` is itself recursive.

use glam::{Mat2, Vec2};

use super::noise;
use crate::aabb::Aabb2;

#[derive(Clone, Debug)]
pub enum Shape2 {
  Box {
    half_extents: Vec2,
  },
  Disc {
    radius: f32,
  },
  Capsule {
    a: Vec2,
    b: Vec2,
    radius: f32,
  },
  HalfPlane {
    normal: Vec2,
    offset: f32,
  },
  CellularNoise {
    seed: u32,
    cell_size: Vec2,
    distance_offset: f32,
  },
  Translate {
    offset: Vec2,
    inner: Box<Shape2>,
  },
  Transformed {
    /// Forward transform; sampling applies its inverse to the query point.
    matrix: Mat2,
    inner: Box<Shape2>,
  },
  Intersect {
    a: Box<Shape2>,
    b: Box<Shape2>,
  },
  Union {
    a: Box<Shape2>,
    b: Box<Shape2>,
  },
  Expand {
    inner: Box<Shape2>,
    amount: f32,
  },
}

fn box_sdf(p: Vec2, half_extents: Vec2) -> f32 {
  let q = p.abs() - half_extents;
  q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0)
}

fn capsule_sdf(p: Vec2, a: Vec2, b: Vec2, radius: f32) -> f32 {
  let pa = p - a;
  let ba = b - a;
  let h = (pa.dot(ba) / ba.dot(ba)).clamp(0.0, 1.0);
  (pa - ba * h).length() - radius
}

impl Shape2 {
  /// Canonical registry name. Stable across releases; never rename an
  /// existing variant without also updating wire compatibility notes.
  pub fn canonical_name(&self) -> &'static str {
    match self {
      Shape2::Box { .. } => "Box2",
      Shape2::Disc { .. } => "Disc2",
      Shape2::Capsule { .. } => "Capsule2",
      Shape2::HalfPlane { .. } => "HalfPlane2",
      Shape2::CellularNoise { .. } => "CellularNoise2",
      Shape2::Translate { .. } => "Translate2",
      Shape2::Transformed { .. } => "Transformed2",
      Shape2::Intersect { .. } => "Intersect2",
      Shape2::Union { .. } => "Union2",
      Shape2::Expand { .. } => "Expand2",
    }
  }

  /// Signed distance at `p` in world space. Negative is inside.
  pub fn sample(&self, p: Vec2) -> f32 {
    match self {
      Shape2::Box { half_extents } => box_sdf(p, *half_extents),
      Shape2::Disc { radius } => p.length() - radius,
      Shape2::Capsule { a, b, radius } => capsule_sdf(p, *a, *b, *radius),
      Shape2::HalfPlane { normal, offset } => normal.dot(p) - offset,
      Shape2::CellularNoise {
        seed,
        cell_size,
        distance_offset,
      } => noise::nearest_feature_distance_2d(*seed, p.into(), (*cell_size).into()) - distance_offset,
      Shape2::Translate { offset, inner } => inner.sample(p - *offset),
      Shape2::Transformed { matrix, inner } => inner.sample(matrix.inverse() * p),
      Shape2::Intersect { a, b } => a.sample(p).max(b.sample(p)),
      Shape2::Union { a, b } => a.sample(p).min(b.sample(p)),
      Shape2::Expand { inner, amount } => inner.sample(p) - amount,
    }
  }

  /// Conservative world-space bounds. An empty AABB means "sample
  /// everywhere" and affected-chunk enumeration falls back to a
  /// caller-supplied clip (see `Intersect`).
  pub fn bounds(&self) -> Aabb2 {
    match self {
      Shape2::Box { half_extents } => Aabb2::from_center_half_extents([0.0, 0.0], (*half_extents).into()),
      Shape2::Disc { radius } => Aabb2::from_center_half_extents([0.0, 0.0], [*radius, *radius]),
      Shape2::Capsule { a, b, radius } => {
        let min = a.min(*b) - Vec2::splat(*radius);
        let max = a.max(*b) + Vec2::splat(*radius);
        Aabb2::new(min.into(), max.into())
      }
      Shape2::HalfPlane { .. } => Aabb2::empty(),
      Shape2::CellularNoise { .. } => Aabb2::empty(),
      Shape2::Translate { offset, inner } => inner.bounds().translated((*offset).into()),
      Shape2::Transformed { matrix, inner } => {
        let b = inner.bounds();
        if b.is_empty() {
          return b;
        }
        let corners = [
          Vec2::new(b.min[0], b.min[1]),
          Vec2::new(b.max[0], b.min[1]),
          Vec2::new(b.min[0], b.max[1]),
          Vec2::new(b.max[0], b.max[1]),
        ];
        let mut out = Aabb2::empty();
        for c in corners {
          let t = *matrix * c;
          out = out.union(&Aabb2::new(t.into(), t.into()));
        }
        out
      }
      Shape2::Intersect { a, b } => {
        // An operand's empty bounds means "unbounded" (e.g. raw cellular
        // noise), not "no area" — only a genuine finite/finite intersection
        // narrows the result; an unbounded operand defers entirely to the
        // other side, which is what lets `Intersect(noise, box)` clip noise
        // to the box rather than vanishing.
        let (ab, bb) = (a.bounds(), b.bounds());
        match (ab.is_empty(), bb.is_empty()) {
          (true, true) => Aabb2::empty(),
          (true, false) => bb,
          (false, true) => ab,
          (false, false) => ab.intersection(&bb),
        }
      }
      Shape2::Union { a, b } => a.bounds().union(&b.bounds()),
      Shape2::Expand { inner, amount } => inner.bounds().expanded(*amount),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn box_sdf_negative_at_center() {
    let s = Shape2::Box {
      half_extents: Vec2::new(2.0, 2.0),
    };
    assert!(s.sample(Vec2::ZERO) < 0.0);
    assert!(s.sample(Vec2::new(10.0, 0.0)) > 0.0);
  }

  #[test]
  fn disc_bounds_are_symmetric() {
    let s = Shape2::Disc { radius: 3.0 };
    let b = s.bounds();
    assert_eq!(b.min, [-3.0, -3.0]);
    assert_eq!(b.max, [3.0, 3.0]);
  }

  #[test]
  fn translate_shifts_bounds_and_sample() {
    let inner = Shape2::Disc { radius: 1.0 };
    let s = Shape2::Translate {
      offset: Vec2::new(5.0, 0.0),
      inner: Box::new(inner),
    };
    assert!(s.sample(Vec2::new(5.0, 0.0)) < 0.0);
    assert!(s.sample(Vec2::ZERO) > 0.0);
    assert_eq!(s.bounds().min, [4.0, -1.0]);
  }

  #[test]
  fn union_takes_minimum_distance() {
    let a = Shape2::Disc { radius: 1.0 };
    let b = Shape2::Translate {
      offset: Vec2::new(10.0, 0.0),
      inner: Box::new(Shape2::Disc { radius: 1.0 }),
    };
    let u = Shape2::Union {
      a: Box::new(a),
      b: Box::new(b),
    };
    assert!(u.sample(Vec2::ZERO) < 0.0);
    assert!(u.sample(Vec2::new(10.0, 0.0)) < 0.0);
  }

  #[test]
  fn cellular_noise_has_empty_bounds() {
    let n = Shape2::CellularNoise {
      seed: 1,
      cell_size: Vec2::new(4.0, 4.0),
      distance_offset: 0.5,
    };
    assert!(n.bounds().is_empty());
  }

  #[test]
  fn intersect_clips_noise_to_box_bounds() {
    let n = Shape2::CellularNoise {
      seed: 1,
      cell_size: Vec2::new(4.0, 4.0),
      distance_offset: 0.5,
    };
    let b = Shape2::Box {
      half_extents: Vec2::new(8.0, 8.0),
    };
    let clipped = Shape2::Intersect {
      a: Box::new(n),
      b: Box::new(b),
    };
    assert_eq!(clipped.bounds(), Shape2::Box { half_extents: Vec2::new(8.0, 8.0) }.bounds());
  }
}
