//! Owner of every 3D volume's chunks: modification acceptance, per-chunk
//! fan-out, mesh-update dispatch, and cross-layer texture propagation
//! (SPEC §4.4). Mirrors [`crate::world::world2::World2`] one axis up.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, error, warn};

use crate::aabb::touching_chunk_keys;
use crate::chunk::chunk3::MeshPollOutcome;
use crate::chunk::{Chunk3, ChunkKey3};
use crate::config::{QualitySettings, ResourceId, ResourceOptions};
use crate::host::MainThread;
use crate::metrics::WorldMetrics;
use crate::modification::{Modification, ModificationLog, Operator};
use crate::shapes::Shape3;
use crate::task::{TaskHandle, TickBudget};
use crate::world::role::WorldRole;

struct LayerState3 {
  quality: QualitySettings,
  options: ResourceOptions,
  chunks: HashMap<ChunkKey3, Chunk3>,
  needs_mesh_update: HashSet<ChunkKey3>,
  mesh_update_in_flight: Option<HashSet<ChunkKey3>>,
}

impl LayerState3 {
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

struct PendingSlot3 {
  key: ChunkKey3,
  handle: Option<TaskHandle<bool>>,
  result: Option<bool>,
}

struct PendingAggregate3 {
  resource: ResourceId,
  slots: Vec<PendingSlot3>,
}

/// Owner of all volumes/chunks for one 3D world (SPEC §4.4).
pub struct World3 {
  role: WorldRole,
  receiving_modifications: bool,
  log: ModificationLog<Shape3>,
  layers: HashMap<ResourceId, LayerState3>,
  pending_aggregates: Vec<PendingAggregate3>,
  metrics: WorldMetrics,
}

impl World3 {
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

  pub fn modification_log(&self) -> &ModificationLog<Shape3> {
    &self.log
  }

  /// Bind quality/options to a resource before any modification touches it
  /// (SPEC §3: quality is immutable once a chunk is bound to it).
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
        e.insert(LayerState3::new(quality, options));
      }
    }
  }

  fn assert_can_modify(&self) {
    let permitted = matches!(self.role, WorldRole::Authority | WorldRole::LocalOnly) || self.receiving_modifications;
    assert!(
      permitted,
      "World3 mutated outside authority/local-only/replication-receive scope (role={:?})",
      self.role
    );
  }

  /// Runs `f` with the replication-receive scope active, so `assert_can_modify`
  /// passes for an `Observer` world replaying a received frame (SPEC §4.5).
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

  pub fn add_async(&mut self, shape: Shape3, resource: ResourceId, _main_thread: MainThread) {
    self.assert_can_modify();
    self.log.push(Modification {
      operator: Operator::Add,
      shape: shape.clone(),
      resource,
    });
    self.dispatch(Operator::Add, shape, resource);
  }

  pub fn subtract_async(&mut self, shape: Shape3, resource: ResourceId, _main_thread: MainThread) {
    self.assert_can_modify();
    self.log.push(Modification {
      operator: Operator::Subtract,
      shape: shape.clone(),
      resource,
    });
    self.dispatch(Operator::Subtract, shape, resource);
  }

  fn dispatch(&mut self, operator: Operator, shape: Shape3, resource: ResourceId) {
    let Some(layer) = self.layers.get_mut(&resource) else {
      warn!(?resource, "modification for unconfigured resource; call configure_resource first");
      return;
    };
    let bounds = shape.bounds();
    let keys = touching_chunk_keys(bounds, layer.quality.chunk_size)
      .into_iter()
      .map(|[x, y, z]| ChunkKey3::new(x, y, z));

    let mut slots = Vec::new();
    for key in keys {
      let exists = layer.chunks.contains_key(&key);
      if operator == Operator::Subtract && !exists {
        continue;
      }
      let chunk = layer.chunks.entry(key).or_insert_with(|| {
        Chunk3::new(key, resource, layer.quality.array_size(), layer.quality.unit_size(), layer.quality.max_distance)
      });
      let handle = match operator {
        Operator::Add => chunk.add_async(shape.clone(), layer.quality.chunk_size),
        Operator::Subtract => chunk.subtract_async(shape.clone(), layer.quality.chunk_size),
      };
      slots.push(PendingSlot3 { key, handle: Some(handle), result: None });
    }

    if slots.is_empty() {
      debug!(?resource, "modification touched no chunks");
      self.metrics.record_modification(false);
      return;
    }
    self.pending_aggregates.push(PendingAggregate3 { resource, slots });
  }

  /// Poll outstanding per-chunk mutation tasks; once every slot in an
  /// aggregate resolves, union the changed keys into that layer's
  /// `needs_mesh_update` and dispatch a mesh-update batch (SPEC §4.4 step
  /// e). Call once per tick from the main thread.
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
        let changed_keys: Vec<ChunkKey3> = aggregate
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

  /// Starts a fresh mesh-rebuild batch for `resource` if none is running and
  /// some chunk is dirty (SPEC §4.4 `dispatch_mesh_update`).
  fn dispatch_mesh_update(&mut self, resource: ResourceId) {
    let Some(layer) = self.layers.get_mut(&resource) else {
      return;
    };
    if layer.mesh_update_in_flight.is_some() || layer.needs_mesh_update.is_empty() {
      return;
    }
    let snapshot: HashSet<ChunkKey3> = std::mem::take(&mut layer.needs_mesh_update);
    for key in &snapshot {
      if let Some(chunk) = layer.chunks.get_mut(key) {
        chunk.tick_mesh_state();
      }
    }
    layer.mesh_update_in_flight = Some(snapshot);
  }

  /// Drains every chunk's mesh pipeline: polls in-flight extractions,
  /// drains main-thread follow-ups under `budget`, propagates cross-layer
  /// textures, and starts the next mesh-update batch for any layer whose
  /// dirty set grew. Call once per tick/pre-render from the main thread.
  pub fn tick_mesh_pipeline(&mut self, main_thread: MainThread, budget: &mut TickBudget) {
    let resources: Vec<ResourceId> = self.layers.keys().copied().collect();
    let mut texture_events: Vec<(ResourceId, f32, ChunkKey3, (u32, u32, u32, Vec<u8>))> = Vec::new();

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

    for (source_resource, source_chunk_size, key, (w, h, d, bytes)) in texture_events {
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
          chunk.enqueue_referenced_texture(w, h, d, bytes.clone());
        }
      }
    }

    for resource in resources {
      self.dispatch_mesh_update(resource);
    }
  }

  /// World-wide clear (SPEC §4.4 `clear_async`): bumps `clear_count`,
  /// empties the log, and drops every chunk in every layer.
  pub fn clear_async(&mut self, _main_thread: MainThread) {
    self.log.clear();
    self.layers.clear();
    self.pending_aggregates.clear();
  }

  /// Per-resource clear (SPEC §9 Open Question, resolved): drops the named
  /// layer's chunks and filters the log, without touching `clear_count`.
  pub fn clear_resource_async(&mut self, resource: ResourceId, _main_thread: MainThread) {
    self.log.retain_other_resources(resource);
    self.layers.remove(&resource);
    self.pending_aggregates.retain(|agg| agg.resource != resource);
  }

  pub fn get_chunk(&self, resource: ResourceId, key: ChunkKey3) -> Option<&Chunk3> {
    self.layers.get(&resource)?.chunks.get(&key)
  }

  pub fn chunk_mut(&mut self, resource: ResourceId, key: ChunkKey3) -> Option<&mut Chunk3> {
    self.layers.get_mut(&resource)?.chunks.get_mut(&key)
  }

  pub fn chunk_count(&self, resource: ResourceId) -> usize {
    self.layers.get(&resource).map_or(0, |l| l.chunks.len())
  }

  /// Disposal hook for the observer side (SPEC §4.4 "removal only happens
  /// ... via `remove_client_chunk`").
  pub fn remove_client_chunk(&mut self, resource: ResourceId, key: ChunkKey3) {
    if let Some(layer) = self.layers.get_mut(&resource) {
      layer.chunks.remove(&key);
      layer.needs_mesh_update.remove(&key);
    }
  }
}
