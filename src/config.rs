//! Per-resource configuration the host constructs and hands to a `World`.
//!
//! These are plain data structs, not a loader: the core is a library (SPEC
//! §6 says so explicitly) — no CLI flags, no environment variables, no file
//! format. The host owns wiring these up from whatever its own config system
//! looks like.

use std::fmt;

/// Opaque resource handle. The host maps this to its own asset reference;
/// this crate only ever uses it as a hashable/`Copy` key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

impl fmt::Debug for ResourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ResourceId({})", self.0)
  }
}

/// Quality settings for one layer/volume, immutable once a chunk is bound
/// to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualitySettings {
  /// World units per chunk edge.
  pub chunk_size: f32,
  /// Samples per chunk edge, excluding margin.
  pub chunk_resolution: u32,
  /// Distance clamp; samples farther than this are not written.
  pub max_distance: f32,
}

impl QualitySettings {
  pub fn new(chunk_size: f32, chunk_resolution: u32, max_distance: f32) -> Self {
    debug_assert!(chunk_size > 0.0);
    debug_assert!(chunk_resolution > 0);
    debug_assert!(max_distance > 0.0);
    Self {
      chunk_size,
      chunk_resolution,
      max_distance,
    }
  }

  /// World units spanned by a single sample.
  #[inline]
  pub fn unit_size(&self) -> f32 {
    self.chunk_size / self.chunk_resolution as f32
  }

  /// Samples per axis including the margin on both sides: `chunk_resolution
  /// + 2*MARGIN + 1`.
  #[inline]
  pub fn array_size(&self) -> u32 {
    self.chunk_resolution + 2 * crate::constants::MARGIN as u32 + 1
  }
}

impl Default for QualitySettings {
  fn default() -> Self {
    Self::new(16.0, 16, 4.0)
  }
}

/// Reference from one resource's shader attribute to another resource's
/// chunk texture, used for cross-layer texture propagation (SPEC §4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureReference {
  pub source_resource: ResourceId,
  pub target_attribute: &'static str,
}

/// Per-resource options recognised by the world (SPEC §6).
#[derive(Clone, Debug, Default)]
pub struct ResourceOptions {
  /// Opaque material handle; `None` disables rendering for this resource.
  pub material: Option<u64>,
  pub has_collision: bool,
  /// Suppresses mesh generation (this resource only feeds textures).
  pub is_texture_source_only: bool,
  pub split_collision_tags: Vec<String>,
  pub referenced_textures: Vec<TextureReference>,
}
