//! Host-engine interfaces consumed by the core (SPEC §6).
//!
//! Nothing in this crate knows how to render a mesh, step physics, or run a
//! scene graph — those stay external, supplied by the integrator. This
//! mirrors `voxel_plugin`'s own refusal to depend on a specific renderer or
//! physics engine inside `sdf_samplers.rs`/`world.rs`: the sampler and world
//! types are generic over a trait, never over a concrete engine crate.

use glam::{Vec3, Vec3A};

/// Accessor for the host's background worker pool.
///
/// The actual work submission goes through [`crate::task::SerialQueue`],
/// which only needs `rayon`'s global pool; this trait exists for the host to
/// report its own sizing back to diagnostics/metrics, not to gate dispatch.
pub trait TaskPool: Send + Sync {
  /// Number of worker threads backing background chunk/world tasks.
  fn num_threads(&self) -> usize;
}

/// Zero-sized marker distinguishing which clock drove a `tick_*` call.
///
/// The type system documents intent; none of these types carry state.
pub trait TickSource: Send {}

/// Marks a call driven by the authoritative server simulation tick.
pub struct ServerTick;
impl TickSource for ServerTick {}

/// Marks a call driven by a client's local simulation tick.
pub struct ClientTick;
impl TickSource for ClientTick {}

/// Marks a call driven by the frame's pre-render tick (after simulation,
/// before the renderer reads scene state) — used for main-thread task drain.
pub struct PreRenderTick;
impl TickSource for PreRenderTick {}

/// Zero-sized proof that the caller is on the host's main thread.
///
/// The host constructs this once per call from wherever it already knows
/// it holds the main thread; this crate never performs its own thread-id
/// check, it only requires one of these tokens to call main-thread-only
/// methods such as `World::drain_main_thread_tasks`.
#[derive(Clone, Copy)]
pub struct MainThread {
  _private: (),
}

impl MainThread {
  /// # Safety-adjacent contract
  /// Caller must actually be on the host's main thread; this is a
  /// debug-assert-shaped marker, not an enforced guarantee.
  pub fn assert_current() -> Self {
    Self { _private: () }
  }
}

/// Destination for extracted mesh geometry, owned and rented by the host.
///
/// Not called by anything in this crate directly: the chunk mesh path hands
/// the host a `mesh_handle` through [`SceneObject::replace_model`] instead,
/// leaving surface extraction (surface nets, dual contouring, whatever the
/// host uses) and render-mesh upload entirely up to the host's own
/// `mesh_extractor` closure. This trait is here for a host that wants to
/// receive raw vertex/index data directly rather than round-tripping through
/// its own handle table.
pub trait MeshWriter: Send {
  fn write_to(&mut self, resource: crate::config::ResourceId, vertices: &[Vec3], indices: &[u32]);
}

/// Host-owned physics collision body for one chunk/resource pair.
pub trait PhysicsBody: Send {
  fn add_mesh_shape(&mut self, vertices: &[Vec3A], indices: &[u32], tags: &[String]);
  fn update_mesh(&mut self, vertices: &[Vec3A], indices: &[u32]);
  fn remove(&mut self);
}

/// Host-owned scene node representing one rendered chunk.
pub trait SceneObject: Send {
  fn set_attribute(&mut self, name: &'static str, value: f32);
  fn replace_model(&mut self, mesh_handle: u64);
}

/// Host-owned factory for baking raw 8-bit sample data into a renderer
/// texture (used both for direct chunk textures and cross-layer
/// `referenced_textures` propagation).
pub trait TextureFactory: Send {
  fn create_texture_2d(&mut self, width: u32, height: u32, data: &[u8]) -> u64;
  fn create_texture_3d(&mut self, width: u32, height: u32, depth: u32, data: &[u8]) -> u64;
}
