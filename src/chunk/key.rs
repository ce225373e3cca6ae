//! Integer lattice keys identifying a chunk within a layer/volume (SPEC §3).

/// 2D layer chunk key. World-space origin is `(x, y) * chunk_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey2 {
  pub x: i32,
  pub y: i32,
}

impl ChunkKey2 {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  pub fn world_origin(self, chunk_size: f32) -> glam::Vec2 {
    glam::Vec2::new(self.x as f32 * chunk_size, self.y as f32 * chunk_size)
  }
}

/// 3D volume chunk key. World-space origin is `(x, y, z) * chunk_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey3 {
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl ChunkKey3 {
  pub const fn new(x: i32, y: i32, z: i32) -> Self {
    Self { x, y, z }
  }

  pub fn world_origin(self, chunk_size: f32) -> glam::Vec3 {
    glam::Vec3::new(self.x as f32 * chunk_size, self.y as f32 * chunk_size, self.z as f32 * chunk_size)
  }
}
