//! Owner of every 2D layer's chunks. Mirrors [`crate::world::world3::World3`]
//! one axis down (SPEC §4.4).

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, error, warn};

use crate::aabb::touching_chunk_keys;
use crate::chunk::chunk2::MeshPollOutcome;
use crate::chunk::{Chunk2, ChunkKey2};
use crate::config::{QualitySettings, ResourceId, ResourceOptions};
use crate::host::MainThread;
use crate::metrics::WorldMetrics;
use crate::modification::{Modification, ModificationLog, Operator};
use crate::shapes::Shape2;
use crate::task::{TaskHandle, TickBudget};
use crate::world::role::WorldRole;

struct LayerState2 {
  quality: QualitySettings,
  options: ResourceOptions,
  chunks: HashMap<ChunkKey2, Chunk2>,
  needs_mesh_update: HashSet<ChunkKey2>,
  mesh_update_in_flight: Option<HashSet<ChunkKey2>>,
}

impl LayerState2 {
  fn new(quality: QualitySettings, options: ResourceOptions) -> Self {
    Self {
      quality,
      options,
      chunks: HashMap::new(),
      needs_mesh_update: HashSet::new(),
      mesh_update_in_flight: None,
    }
  }
}

struct PendingSlot2 {
  key: ChunkKey2,
  handle: Option<TaskHandle<bool>>,
  result: Option<bool>,
}

struct PendingAggregate2 {
  resource: ResourceId,
  slots: Vec<PendingSlot2>,
}

/// Owner of all layers/chunks for one 2D world (SPEC §4.4).
pub struct World2 {
  role: WorldRole,
  receiving_modifications: bool,
  log: ModificationLog<Shape2>,
  layers: HashMap<ResourceId, LayerState2>,
  pending_aggregates: Vec<PendingAggregate2>,
  metrics: WorldMetrics,
}

impl World2 {
  pub fn new(role: WorldRole) -> Self {
    Self {
      role,
      receiving_modifications: false,
      log: ModificationLog::new(),
      layers: HashMap::new(),
      pending_aggregates: Vec::new(),
      metrics: WorldMetrics::new(),
    }
  }

  pub fn role(&self) -> WorldRole {
    self.role
  }

  pub fn metrics(&self) -> &WorldMetrics {
    &self.metrics
  }

  pub fn metrics_mut(&mut self) -> &mut WorldMetrics {
    &mut self.metrics
  }

  pub fn modification_log(&self) -> &ModificationLog<Shape2> {
    &self.log
  }

  pub fn configure_resource(&mut self, resource: ResourceId, quality: QualitySettings, options: ResourceOptions) {
    match self.layers.entry(resource) {
      Entry::Occupied(mut e) => {
        debug_assert!(
          e.get().chunks.is_empty(),
          "cannot change quality/options for resource {resource:?} after chunks exist"
        );
        e.get_mut().quality = quality;
        e.get_mut().options = options;
      }
      Entry::Vacant(e) => {
        e.insert(LayerState2::new(quality, options));
      }
    }
  }

  fn assert_can_modify(&self) {
    let permitted = matches!(self.role, WorldRole::Authority | WorldRole::LocalOnly) || self.receiving_modifications;
    assert!(
      permitted,
      "World2 mutated outside authority/local-only/replication-receive scope (role={:?})",
      self.role
    );
  }

  pub fn with_receiving_modifications<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
    debug_assert!(
      matches!(self.role, WorldRole::Observer),
      "receiving-modifications scope only makes sense on an Observer world"
    );
    self.receiving_modifications = true;
    let result = f(self);
    self.receiving_modifications = false;
    result
  }

  pub fn add_async(&mut self, shape: Shape2, resource: ResourceId, _main_thread: MainThread) {
    self.assert_can_modify();
    self.log.push(Modification {
      operator: Operator::Add,
      shape: shape.clone(),
      resource,
    });
    self.dispatch(Operator::Add, shape, resource);
  }

  pub fn subtract_async(&mut self, shape: Shape2, resource: ResourceId, _main_thread: MainThread) {
    self.assert_can_modify();
    self.log.push(Modification {
      operator: Operator::Subtract,
      shape: shape.clone(),
      resource,
    });
    self.dispatch(Operator::Subtract, shape, resource);
  }

  fn dispatch(&mut self, operator: Operator, shape: Shape2, resource: ResourceId) {
    let Some(layer) = self.layers.get_mut(&resource) else {
      warn!(?resource, "modification for unconfigured resource; call configure_resource first");
      return;
    };
    let bounds = shape.bounds();
    let keys = touching_chunk_keys(bounds, layer.quality.chunk_size)
      .into_iter()
      .map(|[x, y]| ChunkKey2::new(x, y));

    let mut slots = Vec::new();
    for key in keys {
      let exists = layer.chunks.contains_key(&key);
      if operator == Operator::Subtract && !exists {
        continue;
      }
      let chunk = layer.chunks.entry(key).or_insert_with(|| {
        Chunk2::new(key, resource, layer.quality.array_size(), layer.quality.unit_size(), layer.quality.max_distance)
      });
      let handle = match operator {
        Operator::Add => chunk.add_async(shape.clone(), layer.quality.chunk_size),
        Operator::Subtract => chunk.subtract_async(shape.clone(), layer.quality.chunk_size),
      };
      slots.push(PendingSlot2 { key, handle: Some(handle), result: None });
    }

    if slots.is_empty() {
      debug!(?resource, "modification touched no chunks");
      self.metrics.record_modification(false);
      return;
    }
    self.pending_aggregates.push(PendingAggregate2 { resource, slots });
  }

  pub fn poll_pending_modifications(&mut self, _main_thread: MainThread) {
    let mut finished_resources = Vec::new();
    let mut i = 0;
    while i < self.pending_aggregates.len() {
      let aggregate = &mut self.pending_aggregates[i];
      for slot in aggregate.slots.iter_mut() {
        if let Some(handle) = slot.handle.as_mut() {
          if let Some(result) = handle.poll() {
            slot.result = Some(result.unwrap_or_else(|err| {
              error!(?err, "chunk mutation task failed");
              false
            }));
            slot.handle = None;
          }
        }
      }
      if aggregate.slots.iter().all(|s| s.result.is_some()) {
        let aggregate = self.pending_aggregates.remove(i);
        let changed_keys: Vec<ChunkKey2> = aggregate
          .slots
          .iter()
          .filter(|s| s.result == Some(true))
          .map(|s| s.key)
          .collect();
        let any_changed = !changed_keys.is_empty();
        self.metrics.record_modification(any_changed);
        if let Some(layer) = self.layers.get_mut(&aggregate.resource) {
          layer.needs_mesh_update.extend(changed_keys);
        }
        finished_resources.push(aggregate.resource);
      } else {
        i += 1;
      }
    }
    for resource in finished_resources {
      self.dispatch_mesh_update(resource);
    }
  }

  fn dispatch_mesh_update(&mut self, resource: ResourceId) {
    let Some(layer) = self.layers.get_mut(&resource) else {
      return;
    };
    if layer.mesh_update_in_flight.is_some() || layer.needs_mesh_update.is_empty() {
      return;
    }
    let snapshot: HashSet<ChunkKey2> = std::mem::take(&mut layer.needs_mesh_update);
    for key in &snapshot {
      if let Some(chunk) = layer.chunks.get_mut(key) {
        chunk.tick_mesh_state();
      }
    }
    layer.mesh_update_in_flight = Some(snapshot);
  }

  pub fn tick_mesh_pipeline(&mut self, main_thread: MainThread, budget: &mut TickBudget) {
    let resources: Vec<ResourceId> = self.layers.keys().copied().collect();
    let mut texture_events: Vec<(ResourceId, f32, ChunkKey2, (u32, u32, Vec<u8>))> = Vec::new();

    for &resource in &resources {
      let chunk_size = self.layers[&resource].quality.chunk_size;
      let layer = self.layers.get_mut(&resource).unwrap();
      for (&key, chunk) in layer.chunks.iter_mut() {
        if let MeshPollOutcome::Resolved { texture: Some(tex) } = chunk.poll_mesh_update() {
          texture_events.push((resource, chunk_size, key, tex));
        }
        chunk.drain_main_thread_tasks(budget, main_thread);
      }
      if let Some(in_flight) = &layer.mesh_update_in_flight {
        let all_settled = in_flight.iter().all(|k| layer.chunks.get(k).map_or(true, |c| !c.mesh_update_pending()));
        if all_settled {
          layer.mesh_update_in_flight = None;
        }
      }
    }

    for (source_resource, source_chunk_size, key, (w, h, bytes)) in texture_events {
      for (&target_resource, layer) in self.layers.iter_mut() {
        if target_resource == source_resource {
          continue;
        }
        let references_source = layer
          .options
          .referenced_textures
          .iter()
          .any(|r| r.source_resource == source_resource);
        if !references_source {
          continue;
        }
        if (layer.quality.chunk_size - source_chunk_size).abs() > f32::EPSILON {
          warn!(
            ?source_resource,
            ?target_resource,
            "referenced_textures chunk_size mismatch; skipping cross-layer texture update"
          );
          continue;
        }
        if let Some(chunk) = layer.chunks.get_mut(&key) {
          chunk.enqueue_referenced_texture(w, h, bytes.clone());
        }
      }
    }

    for resource in resources {
      self.dispatch_mesh_update(resource);
    }
  }

  pub fn clear_async(&mut self, _main_thread: MainThread) {
    self.log.clear();
    self.layers.clear();
    self.pending_aggregates.clear();
  }

  pub fn clear_resource_async(&mut self, resource: ResourceId, _main_thread: MainThread) {
    self.log.retain_other_resources(resource);
    self.layers.remove(&resource);
    self.pending_aggregates.retain(|agg| agg.resource != resource);
  }

  pub fn get_chunk(&self, resource: ResourceId, key: ChunkKey2) -> Option<&Chunk2> {
    self.layers.get(&resource)?.chunks.get(&key)
  }

  pub fn chunk_mut(&mut self, resource: ResourceId, key: ChunkKey2) -> Option<&mut Chunk2> {
    self.layers.get_mut(&resource)?.chunks.get_mut(&key)
  }

  pub fn chunk_count(&self, resource: ResourceId) -> usize {
    self.layers.get(&resource).map_or(0, |l| l.chunks.len())
  }

  pub fn remove_client_chunk(&mut self, resource: ResourceId, key: ChunkKey2) {
    if let Some(layer) = self.layers.get_mut(&resource) {
      layer.chunks.remove(&key);
      layer.needs_mesh_update.remove(&key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use glam::Vec2;
  use std::thread;
  use std::time::Duration;

  fn settle(world: &mut World2) {
    for _ in 0..200 {
      world.poll_pending_modifications(MainThread::assert_current());
      if world.pending_aggregates.is_empty() {
        return;
      }
      thread::sleep(Duration::from_millis(1));
    }
    panic!("pending modifications never settled");
  }

  fn resource() -> ResourceId {
    ResourceId(0)
  }

  fn setup() -> World2 {
    let mut world = World2::new(WorldRole::LocalOnly);
    world.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());
    world
  }

  #[test]
  fn single_box_union_touches_four_corner_chunks() {
    let mut world = setup();
    let main = MainThread::assert_current();
    world.add_async(
      Shape2::Box {
        half_extents: Vec2::splat(8.0),
      },
      resource(),
      main,
    );
    settle(&mut world);
    assert_eq!(world.chunk_count(resource()), 4);
    for x in [-1, 0] {
      for y in [-1, 0] {
        assert!(world.get_chunk(resource(), ChunkKey2::new(x, y)).is_some());
      }
    }
  }

  #[test]
  fn subtract_on_nonexistent_chunk_is_skipped() {
    let mut world = setup();
    let main = MainThread::assert_current();
    world.subtract_async(Shape2::Disc { radius: 2.0 }, resource(), main);
    settle(&mut world);
    assert_eq!(world.chunk_count(resource()), 0);
    assert_eq!(world.metrics().total_modifications_no_op, 1);
  }

  #[test]
  fn cellular_noise_clipped_by_intersect_only_touches_box_chunks() {
    let mut world = setup();
    let main = MainThread::assert_current();
    let noise = Shape2::CellularNoise {
      seed: 1,
      cell_size: Vec2::new(4.0, 4.0),
      distance_offset: 0.5,
    };
    let clipped = Shape2::Intersect {
      a: Box::new(noise),
      b: Box::new(Shape2::Box {
        half_extents: Vec2::splat(8.0),
      }),
    };
    world.add_async(clipped, resource(), main);
    settle(&mut world);
    assert_eq!(world.chunk_count(resource()), 4);
  }

  #[test]
  #[should_panic(expected = "outside authority/local-only/replication-receive")]
  fn authority_only_world_rejects_mutation_from_an_observer_role() {
    let mut world = World2::new(WorldRole::Observer);
    world.configure_resource(resource(), QualitySettings::default(), ResourceOptions::default());
    world.add_async(Shape2::Disc { radius: 1.0 }, resource(), MainThread::assert_current());
  }
}
