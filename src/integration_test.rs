//! End-to-end scenarios exercising the sample store, world/chunk scheduler,
//! shape registry, and replication protocol together (SPEC §8, scenarios
//! 1-6).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use glam::{Vec2, Vec3};

use crate::chunk::chunk3::RawMeshData3;
use crate::chunk::{Chunk3, ChunkKey2, ChunkKey3};
use crate::config::{QualitySettings, ResourceId, ResourceOptions};
use crate::constants::MARGIN;
use crate::host::{MainThread, ServerTick};
use crate::quantize;
use crate::replication::{receive_frame3, ObserverId, ReplicationServer3, ReplicationTransport, TransportError};
use crate::sample_array::{GridWriter3, SampleArray3};
use crate::shapes::{Shape2, Shape3};
use crate::task::TickBudget;
use crate::world::{World2, World3, WorldRole};

fn resource() -> ResourceId {
  ResourceId(0)
}

fn settle3(world: &mut World3) {
  let main = MainThread::assert_current();
  for _ in 0..200 {
    world.poll_pending_modifications(main);
    thread::sleep(Duration::from_millis(1));
  }
}

fn settle2(world: &mut World2) {
  let main = MainThread::assert_current();
  for _ in 0..200 {
    world.poll_pending_modifications(main);
    thread::sleep(Duration::from_millis(1));
  }
}

/// Captures the raw bytes handed to [`GridWriter3`] and decodes whichever
/// local sample a test asks for.
#[derive(Default)]
struct CapturingWriter3 {
  samples: Vec<u8>,
  strides: [usize; 3],
  base_index: [i32; 3],
}

impl GridWriter3 for CapturingWriter3 {
  fn write(&mut self, samples: &[u8], _array_size: u32, base_index: [i32; 3], strides: [usize; 3]) {
    self.samples = samples.to_vec();
    self.base_index = base_index;
    self.strides = strides;
  }
}

impl CapturingWriter3 {
  fn decoded_local(&self, ix: i32, iy: i32, iz: i32, max_distance: f32) -> f32 {
    let index = (self.base_index[0] + ix) as usize * self.strides[0]
      + (self.base_index[1] + iy) as usize * self.strides[1]
      + (self.base_index[2] + iz) as usize * self.strides[2];
    quantize::decode(self.samples[index], max_distance)
  }
}

/// Scenario 1: a centred box union touches exactly the eight corner chunks
/// and the sample nearest the world origin in each is inside the surface.
#[test]
fn single_box_union_touches_eight_chunks_with_negative_corner_samples() {
  let quality = QualitySettings::new(16.0, 16, 4.0);
  let mut world = World3::new(WorldRole::LocalOnly);
  world.configure_resource(resource(), quality, ResourceOptions::default());
  let main = MainThread::assert_current();

  world.add_async(
    Shape3::Box {
      half_extents: Vec3::splat(8.0),
    },
    resource(),
    main,
  );
  settle3(&mut world);

  assert_eq!(world.chunk_count(resource()), 8);

  let captured: Arc<Mutex<Option<f32>>> = Arc::new(Mutex::new(None));
  let corner_key = ChunkKey3::new(-1, -1, -1);
  let chunk = world.chunk_mut(resource(), corner_key).expect("corner chunk exists");
  let sink = captured.clone();
  let max_distance = quality.max_distance;
  let local_corner = quality.chunk_resolution as i32 + MARGIN;
  chunk.set_mesh_extractor(move |array: &SampleArray3| {
    let mut writer = CapturingWriter3::default();
    array.write_to(&mut writer);
    *sink.lock().unwrap() = Some(writer.decoded_local(local_corner, local_corner, local_corner, max_distance));
    RawMeshData3 {
      mesh_handle: 0,
      collision_vertices: Vec::new(),
      collision_indices: Vec::new(),
      texture: None,
    }
  });
  chunk.tick_mesh_state();

  let mut budget = TickBudget::default();
  for _ in 0..200 {
    world.tick_mesh_pipeline(main, &mut budget);
    if captured.lock().unwrap().is_some() {
      break;
    }
    thread::sleep(Duration::from_millis(1));
  }
  let decoded = captured.lock().unwrap().expect("mesh extractor ran");
  assert!(decoded <= 0.0, "sample at the box centre should read inside the surface, got {decoded}");
}

/// Scenario 2: adding then subtracting the same sphere returns every touched
/// chunk to empty, and re-adding it afterwards registers as a change again.
#[test]
fn add_then_subtract_same_sphere_returns_to_empty_and_readd_changes_again() {
  let mut world = World3::new(WorldRole::LocalOnly);
  world.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());
  let main = MainThread::assert_current();
  let sphere = Shape3::Sphere { radius: 5.0 };

  world.add_async(sphere.clone(), resource(), main);
  settle3(&mut world);
  let accepted_after_add = world.metrics().total_modifications_accepted;

  world.subtract_async(sphere.clone(), resource(), main);
  settle3(&mut world);
  let accepted_after_subtract = world.metrics().total_modifications_accepted;
  assert!(accepted_after_subtract > accepted_after_add, "subtract should have changed samples back towards empty");

  world.add_async(sphere, resource(), main);
  settle3(&mut world);
  assert!(
    world.metrics().total_modifications_accepted > accepted_after_subtract,
    "re-adding the same sphere must report changed=true again"
  );
}

/// Scenario 3: cellular noise clipped by `Intersect` with a box only creates
/// chunks the box itself would have created.
#[test]
fn cellular_noise_clipped_by_box_only_touches_box_chunks() {
  let mut world = World2::new(WorldRole::LocalOnly);
  world.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());
  let main = MainThread::assert_current();

  let noise = Shape2::CellularNoise {
    seed: 7,
    cell_size: Vec2::new(4.0, 4.0),
    distance_offset: 0.5,
  };
  let boxed = Shape2::Box {
    half_extents: Vec2::splat(8.0),
  };
  let clipped = Shape2::Intersect {
    a: Box::new(noise),
    b: Box::new(boxed.clone()),
  };

  world.add_async(clipped, resource(), main);
  settle2(&mut world);

  let mut reference_world = World2::new(WorldRole::LocalOnly);
  reference_world.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());
  reference_world.add_async(boxed, resource(), main);
  settle2(&mut reference_world);

  assert_eq!(world.chunk_count(resource()), reference_world.chunk_count(resource()));
  for x in [-1, 0] {
    for y in [-1, 0] {
      let key = ChunkKey2::new(x, y);
      assert_eq!(world.get_chunk(resource(), key).is_some(), reference_world.get_chunk(resource(), key).is_some());
    }
  }
}

struct SingleObserverTransport {
  observer: ObserverId,
  inbound: VecDeque<Vec<u8>>,
}

impl ReplicationTransport for SingleObserverTransport {
  fn enqueue_frame(&mut self, observer: ObserverId, frame: &[u8]) -> Result<(), TransportError> {
    assert_eq!(observer, self.observer);
    self.inbound.push_back(frame.to_vec());
    Ok(())
  }

  fn poll_inbound(&mut self) -> Option<Vec<u8>> {
    self.inbound.pop_front()
  }
}

/// Scenario 4: an observer starting from empty catches up on 200
/// authority-side modifications in exactly `ceil(200/64) = 4` frames.
#[test]
fn replication_catches_up_two_hundred_modifications_in_four_frames() {
  let mut authority = World3::new(WorldRole::LocalOnly);
  authority.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());
  let main = MainThread::assert_current();
  for _ in 0..200 {
    authority.add_async(Shape3::Sphere { radius: 1.0 }, resource(), main);
  }
  assert_eq!(authority.modification_log().len(), 200);

  let mut server = ReplicationServer3::new();
  let observer_id = ObserverId(1);
  server.register_observer(observer_id);
  let mut transport = SingleObserverTransport {
    observer: observer_id,
    inbound: VecDeque::new(),
  };

  let mut observer = World3::new(WorldRole::Observer);
  observer.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());

  let mut ticks = 0;
  loop {
    server.tick(&mut authority, &mut transport, ServerTick);
    let Some(frame) = transport.poll_inbound() else {
      break;
    };
    receive_frame3(&mut observer, &frame, main).unwrap();
    ticks += 1;
  }

  assert_eq!(ticks, 4, "200 modifications at 64 per frame should take exactly 4 frames");
  assert_eq!(authority.metrics().frames_sent, 4);
  assert_eq!(observer.modification_log().len(), 200);
  assert_eq!(observer.metrics().frames_rejected, 0);
}

/// Scenario 5: clearing the world while a mesh update is in flight for some
/// chunk leaves no chunks and no scheduled tasks behind; the background
/// extraction either never lands or lands into nothing.
#[test]
fn clear_during_in_flight_mesh_update_leaves_nothing_behind() {
  let mut world = World3::new(WorldRole::LocalOnly);
  world.configure_resource(resource(), QualitySettings::new(16.0, 16, 4.0), ResourceOptions::default());
  let main = MainThread::assert_current();

  world.add_async(Shape3::Sphere { radius: 1.0 }, resource(), main);
  let chunk = world.chunk_mut(resource(), ChunkKey3::new(0, 0, 0)).expect("origin chunk exists");
  chunk.set_mesh_extractor(|_array: &SampleArray3| {
    thread::sleep(Duration::from_millis(50));
    RawMeshData3 {
      mesh_handle: 1,
      collision_vertices: Vec::new(),
      collision_indices: Vec::new(),
      texture: None,
    }
  });
  settle3(&mut world);

  world.clear_async(main);
  assert_eq!(world.chunk_count(resource()), 0);
  assert_eq!(world.modification_log().clear_count(), 1);

  let mut budget = TickBudget::default();
  world.tick_mesh_pipeline(main, &mut budget);
  assert_eq!(world.chunk_count(resource()), 0);
}

/// Scenario 6: enqueuing two render-mesh updates before the main-thread
/// drain runs only lets the second one execute; the first is cancelled.
#[test]
fn second_mesh_update_supersedes_first_pending_render_task() {
  let key = ChunkKey3::new(0, 0, 0);
  let mut chunk = Chunk3::new(key, resource(), 19, 1.0, 4.0);

  let applied: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
  struct RecordingScene {
    applied: Arc<Mutex<Vec<u64>>>,
  }
  impl crate::host::SceneObject for RecordingScene {
    fn set_attribute(&mut self, _name: &'static str, _value: f32) {}
    fn replace_model(&mut self, mesh_handle: u64) {
      self.applied.lock().unwrap().push(mesh_handle);
    }
  }
  chunk.bind_scene_object(Box::new(RecordingScene { applied: applied.clone() }));

  // Two independent mesh extractions, each resolved (enqueuing its own
  // `UpdateRenderMeshes` follow-up) before the main-thread drain runs once
  // at the very end.
  for (radius, mesh_handle) in [(1.0f32, 1u64), (2.0f32, 2u64)] {
    let mut mutation = chunk.add_async(Shape3::Sphere { radius }, 16.0);
    loop {
      if mutation.poll().is_some() {
        break;
      }
      thread::sleep(Duration::from_millis(1));
    }
    chunk.set_mesh_extractor(move |_array: &SampleArray3| RawMeshData3 {
      mesh_handle,
      collision_vertices: Vec::new(),
      collision_indices: Vec::new(),
      texture: None,
    });
    chunk.tick_mesh_state();
    loop {
      match chunk.poll_mesh_update() {
        crate::chunk::chunk3::MeshPollOutcome::Pending => thread::sleep(Duration::from_millis(1)),
        _ => break,
      }
    }
  }

  let mut budget = TickBudget::default();
  chunk.drain_main_thread_tasks(&mut budget, MainThread::assert_current());

  assert_eq!(*applied.lock().unwrap(), vec![2u64], "only the final mesh update's render task should have run");
}
