//! Engine-agnostic metrics collection.
//!
//! Feature-gated and runtime-toggled so there is zero overhead when
//! disabled, mirroring `voxel_plugin::metrics`. The shape of what gets
//! counted is different (chunks, modifications, replication frames instead
//! of LOD/mesh statistics) but the collection machinery is ported as-is.

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

/// Runtime toggle for metrics collection, independent of the `metrics`
/// compile-time feature.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// `true` iff metrics are both compiled in and enabled at runtime.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window for storing recent values (e.g. task timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a new value, evicting the oldest if at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
  pub fn sum(&self) -> T {
    self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
  }
}

impl RollingWindow<u64> {
  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    if self.buffer.is_empty() {
      None
    } else {
      let min = *self.buffer.iter().min().unwrap();
      let max = *self.buffer.iter().max().unwrap();
      Some((min, max))
    }
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Per-world statistics, updated as modifications are accepted and tasks
/// drain.
#[derive(Debug, Clone, Default)]
pub struct WorldMetrics {
  /// Chunks currently resident, across every layer/volume.
  pub resident_chunks: u32,
  /// Total modifications accepted since the world was created (not reset by
  /// `clear_async`; tracks `clear_count` separately).
  pub total_modifications_accepted: u64,
  /// Modifications rejected because no chunk's bounds intersected the shape.
  pub total_modifications_no_op: u64,
  /// Background sample-array task wall time, microseconds.
  pub sample_task_timing_us: RollingWindow<u64>,
  /// Replication frames sent by the authority.
  pub frames_sent: u64,
  /// Replication frames dropped by an observer due to a [`crate::error::ProtocolError`].
  pub frames_rejected: u64,
}

impl WorldMetrics {
  pub fn new() -> Self {
    Self {
      sample_task_timing_us: RollingWindow::new(128),
      ..Default::default()
    }
  }

  pub fn record_modification(&mut self, changed: bool) {
    if !is_enabled() {
      return;
    }
    if changed {
      self.total_modifications_accepted += 1;
    } else {
      self.total_modifications_no_op += 1;
    }
  }

  pub fn record_sample_task_timing(&mut self, micros: u64) {
    if !is_enabled() {
      return;
    }
    self.sample_task_timing_us.push(micros);
  }

  pub fn record_frame_sent(&mut self) {
    if !is_enabled() {
      return;
    }
    self.frames_sent += 1;
  }

  pub fn record_frame_rejected(&mut self) {
    if !is_enabled() {
      return;
    }
    self.frames_rejected += 1;
  }
}
