//! One 2D layer chunk: sample array plus derived render mesh, collision
//! shape, and texture (SPEC §4.3).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::chunk::key::ChunkKey2;
use crate::chunk::mesh_task::{MeshTaskKind, MeshTaskPromise, PendingMainThreadTasks};
use crate::config::ResourceId;
use crate::host::{PhysicsBody, SceneObject, TextureFactory};
use crate::sample_array::SampleArray2;
use crate::shapes::Shape2;
use crate::task::{SerialQueue, TaskHandle, TickBudget};

/// Raw geometry/texture data a background mesh-extraction step hands back
/// to the chunk. Extraction itself (out of scope for this crate) is
/// supplied by the host through the closure passed to
/// [`Chunk2::set_mesh_extractor`].
#[derive(Clone)]
pub struct RawMeshData2 {
  /// Host-assigned handle for the freshly extracted render mesh.
  pub mesh_handle: u64,
  /// Collision geometry, already offset into world space.
  pub collision_vertices: Vec<glam::Vec3A>,
  pub collision_indices: Vec<u32>,
  pub texture: Option<(u32, u32, Vec<u8>)>,
}

type Extractor = dyn Fn(&SampleArray2) -> RawMeshData2 + Send + Sync;

struct PendingMeshUpdate {
  handle: TaskHandle<RawMeshData2>,
  cancel: Arc<AtomicBool>,
}

pub struct Chunk2 {
  key: ChunkKey2,
  resource: ResourceId,
  array: Arc<Mutex<SampleArray2>>,
  mutation_queue: SerialQueue,
  mesh_queue: SerialQueue,
  mesh_extractor: Option<Arc<Extractor>>,
  last_mesh_modification_count: u32,
  pending_update: Option<PendingMeshUpdate>,
  pending_main_thread_tasks: PendingMainThreadTasks,
  scene_object: Option<Arc<Mutex<Box<dyn SceneObject>>>>,
  physics_body: Option<Arc<Mutex<Box<dyn PhysicsBody>>>>,
  texture_factory: Option<Arc<Mutex<Box<dyn TextureFactory>>>>,
  has_collision: bool,
  split_collision_tags: Vec<String>,
}

impl Chunk2 {
  pub fn new(key: ChunkKey2, resource: ResourceId, array_size: u32, unit_size: f32, max_distance: f32) -> Self {
    Self {
      key,
      resource,
      array: Arc::new(Mutex::new(SampleArray2::new(array_size, unit_size, max_distance))),
      mutation_queue: SerialQueue::new(),
      mesh_queue: SerialQueue::new(),
      mesh_extractor: None,
      last_mesh_modification_count: 0,
      pending_update: None,
      pending_main_thread_tasks: PendingMainThreadTasks::new(),
      scene_object: None,
      physics_body: None,
      texture_factory: None,
      has_collision: false,
      split_collision_tags: Vec::new(),
    }
  }

  pub fn key(&self) -> ChunkKey2 {
    self.key
  }

  pub fn resource(&self) -> ResourceId {
    self.resource
  }

  pub fn modification_count(&self) -> u32 {
    self.array.lock().unwrap().modification_count()
  }

  pub fn set_mesh_extractor<F>(&mut self, extractor: F)
  where
    F: Fn(&SampleArray2) -> RawMeshData2 + Send + Sync + 'static,
  {
    self.mesh_extractor = Some(Arc::new(extractor));
  }

  pub fn bind_scene_object(&mut self, scene_object: Box<dyn SceneObject>) {
    self.scene_object = Some(Arc::new(Mutex::new(scene_object)));
  }

  pub fn bind_physics_body(&mut self, physics_body: Box<dyn PhysicsBody>, split_collision_tags: Vec<String>) {
    self.physics_body = Some(Arc::new(Mutex::new(physics_body)));
    self.has_collision = true;
    self.split_collision_tags = split_collision_tags;
  }

  pub fn bind_texture_factory(&mut self, texture_factory: Box<dyn TextureFactory>) {
    self.texture_factory = Some(Arc::new(Mutex::new(texture_factory)));
  }

  /// World-space shape translated so `self.array` can operate in the
  /// chunk's local frame (SPEC §4.3 "world-to-local translation").
  fn to_local(&self, shape: Shape2, chunk_size: f32) -> Shape2 {
    Shape2::Translate {
      offset: -self.key.world_origin(chunk_size),
      inner: Box::new(shape),
    }
  }

  pub fn add_async(&self, shape: Shape2, chunk_size: f32) -> TaskHandle<bool> {
    let local = self.to_local(shape, chunk_size);
    let array = self.array.clone();
    self.mutation_queue.submit(move || array.lock().unwrap().add(&local))
  }

  pub fn subtract_async(&self, shape: Shape2, chunk_size: f32) -> TaskHandle<bool> {
    let local = self.to_local(shape, chunk_size);
    let array = self.array.clone();
    self.mutation_queue.submit(move || array.lock().unwrap().subtract(&local))
  }

  pub fn clear_async(&self, solid: bool) -> TaskHandle<()> {
    let array = self.array.clone();
    self.mutation_queue.submit(move || array.lock().unwrap().clear(solid))
  }

  /// Start a fresh background extraction if the sample array changed since
  /// the last mesh update; supersedes (cancels) any extraction already in
  /// flight.
  pub fn tick_mesh_state(&mut self) {
    let count = self.modification_count();
    if count == self.last_mesh_modification_count {
      return;
    }
    let Some(extractor) = self.mesh_extractor.clone() else {
      return;
    };
    self.last_mesh_modification_count = count;
    if let Some(prev) = &self.pending_update {
      prev.cancel.store(true, Ordering::SeqCst);
    }
    let cancel = Arc::new(AtomicBool::new(false));
    let array = self.array.clone();
    let handle = self.mesh_queue.submit(move || {
      let snapshot = array.lock().unwrap();
      extractor(&snapshot)
    });
    self.pending_update = Some(PendingMeshUpdate { handle, cancel });
  }

  /// Poll the in-flight extraction (if any) and, once it resolves
  /// un-superseded, enqueue the render/collision/texture main-thread
  /// follow-ups.
  pub fn poll_mesh_update(&mut self) -> MeshPollOutcome {
    let Some(pending) = self.pending_update.as_mut() else {
      return MeshPollOutcome::Pending;
    };
    let Some(result) = pending.handle.poll() else {
      return MeshPollOutcome::Pending;
    };
    let cancel = pending.cancel.clone();
    self.pending_update = None;
    if cancel.load(Ordering::SeqCst) {
      return MeshPollOutcome::Cancelled;
    }
    match result {
      Ok(data) => {
        let texture = data.texture.clone();
        self.enqueue_follow_ups(data);
        MeshPollOutcome::Resolved { texture }
      }
      Err(_) => MeshPollOutcome::Cancelled,
    }
  }

  fn enqueue_follow_ups(&mut self, data: RawMeshData2) {
    if let Some(scene) = self.scene_object.clone() {
      let mesh_handle = data.mesh_handle;
      self.pending_main_thread_tasks.enqueue(MeshTaskKind::UpdateRenderMeshes, move || {
        scene.lock().unwrap().replace_model(mesh_handle);
      });
    }
    if self.has_collision {
      if let Some(body) = self.physics_body.clone() {
        let vertices = data.collision_vertices.clone();
        let indices = data.collision_indices.clone();
        self.pending_main_thread_tasks.enqueue(MeshTaskKind::UpdateCollisionMesh, move || {
          body.lock().unwrap().update_mesh(&vertices, &indices);
        });
      }
    }
    if let (Some((w, h, bytes)), Some(tex)) = (data.texture, self.texture_factory.clone()) {
      self.pending_main_thread_tasks.enqueue(MeshTaskKind::UpdateLayerTexture, move || {
        tex.lock().unwrap().create_texture_2d(w, h, &bytes);
      });
    }
  }

  /// Enqueue an `UpdateLayerTexture` follow-up fed by *another* resource's
  /// chunk texture (SPEC §4.4 cross-layer texture references).
  pub fn enqueue_referenced_texture(&mut self, width: u32, height: u32, data: Vec<u8>) -> Option<MeshTaskPromise> {
    let tex = self.texture_factory.clone()?;
    Some(self.pending_main_thread_tasks.enqueue(MeshTaskKind::UpdateLayerTexture, move || {
      tex.lock().unwrap().create_texture_2d(width, height, &data);
    }))
  }

  pub fn drain_main_thread_tasks(&mut self, budget: &mut TickBudget, _main_thread: crate::host::MainThread) {
    self.pending_main_thread_tasks.drain_with_budget(budget);
  }

  pub fn has_pending_main_thread_tasks(&self) -> bool {
    !self.pending_main_thread_tasks.is_empty()
  }

  pub fn mesh_update_pending(&self) -> bool {
    self.pending_update.is_some()
  }
}

/// Outcome of polling a chunk's in-flight mesh extraction (SPEC §4.3/§4.4).
#[derive(Clone, Debug, PartialEq)]
pub enum MeshPollOutcome {
  Pending,
  Cancelled,
  Resolved { texture: Option<(u32, u32, Vec<u8>)> },
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::MARGIN;
  use std::thread;
  use std::time::Duration as StdDuration;

  fn array_size(resolution: u32) -> u32 {
    resolution + 2 * MARGIN as u32 + 1
  }

  fn poll_until<T: Send + 'static>(handle: &mut TaskHandle<T>) -> T {
    loop {
      if let Some(result) = handle.poll() {
        return result.unwrap();
      }
      thread::sleep(StdDuration::from_millis(1));
    }
  }

  #[test]
  fn add_async_translates_into_local_frame() {
    let chunk = Chunk2::new(ChunkKey2::new(1, 0), ResourceId(0), array_size(16), 1.0, 4.0);
    let shape = Shape2::Disc { radius: 2.0 };
    // chunk_size = 16: the chunk's world origin is (16, 0), so a disc
    // centred at world (16, 0) should land on the chunk's own origin.
    let mut handle = chunk.add_async(
      Shape2::Translate {
        offset: glam::Vec2::new(16.0, 0.0),
        inner: Box::new(shape),
      },
      16.0,
    );
    assert!(poll_until(&mut handle));
  }

  #[test]
  fn mesh_state_is_idle_until_dirtied() {
    let mut chunk = Chunk2::new(ChunkKey2::new(0, 0), ResourceId(0), array_size(8), 1.0, 4.0);
    chunk.set_mesh_extractor(|_array| RawMeshData2 {
      mesh_handle: 1,
      collision_vertices: vec![],
      collision_indices: vec![],
      texture: None,
    });
    chunk.tick_mesh_state();
    assert!(chunk.pending_update.is_none());
  }

  #[test]
  fn dirtying_starts_and_resolves_a_mesh_update() {
    let mut chunk = Chunk2::new(ChunkKey2::new(0, 0), ResourceId(0), array_size(8), 1.0, 4.0);
    chunk.set_mesh_extractor(|_array| RawMeshData2 {
      mesh_handle: 42,
      collision_vertices: vec![],
      collision_indices: vec![],
      texture: None,
    });

    let mut handle = chunk.add_async(Shape2::Disc { radius: 1.0 }, 8.0);
    assert!(poll_until(&mut handle));

    chunk.tick_mesh_state();
    assert!(chunk.pending_update.is_some());

    loop {
      chunk.poll_mesh_update();
      if chunk.pending_update.is_none() {
        break;
      }
      thread::sleep(StdDuration::from_millis(1));
    }
  }
}
