//! One 3D volume chunk. Mirrors [`crate::chunk::chunk2::Chunk2`] one axis up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::chunk::key::ChunkKey3;
use crate::chunk::mesh_task::{MeshTaskKind, MeshTaskPromise, PendingMainThreadTasks};
use crate::config::ResourceId;
use crate::host::{PhysicsBody, SceneObject, TextureFactory};
use crate::sample_array::SampleArray3;
use crate::shapes::Shape3;
use crate::task::{SerialQueue, TaskHandle, TickBudget};

#[derive(Clone)]
pub struct RawMeshData3 {
  pub mesh_handle: u64,
  pub collision_vertices: Vec<glam::Vec3A>,
  pub collision_indices: Vec<u32>,
  pub texture: Option<(u32, u32, u32, Vec<u8>)>,
}

type Extractor = dyn Fn(&SampleArray3) -> RawMeshData3 + Send + Sync;

struct PendingMeshUpdate {
  handle: TaskHandle<RawMeshData3>,
  cancel: Arc<AtomicBool>,
}

pub struct Chunk3 {
  key: ChunkKey3,
  resource: ResourceId,
  array: Arc<Mutex<SampleArray3>>,
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

impl Chunk3 {
  pub fn new(key: ChunkKey3, resource: ResourceId, array_size: u32, unit_size: f32, max_distance: f32) -> Self {
    Self {
      key,
      resource,
      array: Arc::new(Mutex::new(SampleArray3::new(array_size, unit_size, max_distance))),
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

  pub fn key(&self) -> ChunkKey3 {
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
    F: Fn(&SampleArray3) -> RawMeshData3 + Send + Sync + 'static,
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

  fn to_local(&self, shape: Shape3, chunk_size: f32) -> Shape3 {
    Shape3::Translate {
      offset: -self.key.world_origin(chunk_size),
      inner: Box::new(shape),
    }
  }

  pub fn add_async(&self, shape: Shape3, chunk_size: f32) -> TaskHandle<bool> {
    let local = self.to_local(shape, chunk_size);
    let array = self.array.clone();
    self.mutation_queue.submit(move || array.lock().unwrap().add(&local))
  }

  pub fn subtract_async(&self, shape: Shape3, chunk_size: f32) -> TaskHandle<bool> {
    let local = self.to_local(shape, chunk_size);
    let array = self.array.clone();
    self.mutation_queue.submit(move || array.lock().unwrap().subtract(&local))
  }

  pub fn clear_async(&self, solid: bool) -> TaskHandle<()> {
    let array = self.array.clone();
    self.mutation_queue.submit(move || array.lock().unwrap().clear(solid))
  }

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

  /// Poll the in-flight extraction (if any). Returns [`MeshPollOutcome::Resolved`]
  /// carrying this chunk's own texture payload (if any) the tick it lands
  /// un-cancelled, so `World` can fan it out to any layer whose
  /// `referenced_textures` names this chunk's resource (SPEC §4.4).
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

  fn enqueue_follow_ups(&mut self, data: RawMeshData3) {
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
    if let (Some((w, h, d, bytes)), Some(tex)) = (data.texture, self.texture_factory.clone()) {
      self.pending_main_thread_tasks.enqueue(MeshTaskKind::UpdateLayerTexture, move || {
        tex.lock().unwrap().create_texture_3d(w, h, d, &bytes);
      });
    }
  }

  pub fn enqueue_referenced_texture(&mut self, width: u32, height: u32, depth: u32, data: Vec<u8>) -> Option<MeshTaskPromise> {
    let tex = self.texture_factory.clone()?;
    Some(self.pending_main_thread_tasks.enqueue(MeshTaskKind::UpdateLayerTexture, move || {
      tex.lock().unwrap().create_texture_3d(width, height, depth, &data);
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
  /// No extraction resolved this poll (either none running, or still running).
  Pending,
  /// The in-flight extraction was superseded before it completed.
  Cancelled,
  /// The extraction landed; `texture` is this chunk's own texture payload,
  /// if any, for cross-layer `referenced_textures` propagation.
  Resolved { texture: Option<(u32, u32, u32, Vec<u8>)> },
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
  fn add_async_carries_a_box_into_a_neighbour_chunk() {
    // Mirrors the concrete single-box-union scenario: a box centred at the
    // world origin with half-extents 8 touches the corner chunk (-1,-1,-1)
    // at chunk_size=16.
    let chunk = Chunk3::new(ChunkKey3::new(-1, -1, -1), ResourceId(0), array_size(16), 1.0, 4.0);
    let mut handle = chunk.add_async(
      Shape3::Box {
        half_extents: glam::Vec3::splat(8.0),
      },
      16.0,
    );
    assert!(poll_until(&mut handle));
  }

  #[test]
  fn clear_async_resets_modification_count_upward() {
    let chunk = Chunk3::new(ChunkKey3::new(0, 0, 0), ResourceId(0), array_size(4), 1.0, 4.0);
    let before = chunk.modification_count();
    let mut handle = chunk.clear_async(false);
    poll_until(&mut handle);
    assert!(chunk.modification_count() > before);
  }
}
