//! Bounded, supersede-on-enqueue slots for a chunk's three main-thread
//! follow-up tasks (SPEC §4.3: "replacement semantics for main-thread
//! tasks").

use std::sync::{Arc, Mutex};

use web_time::Instant;

use crate::task::TickBudget;

/// The three kinds of work a chunk ever needs the host's main thread for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshTaskKind {
  UpdateRenderMeshes,
  UpdateCollisionMesh,
  UpdateLayerTexture,
}

impl MeshTaskKind {
  const ALL: [MeshTaskKind; 3] = [
    MeshTaskKind::UpdateRenderMeshes,
    MeshTaskKind::UpdateCollisionMesh,
    MeshTaskKind::UpdateLayerTexture,
  ];

  fn slot(self) -> usize {
    match self {
      MeshTaskKind::UpdateRenderMeshes => 0,
      MeshTaskKind::UpdateCollisionMesh => 1,
      MeshTaskKind::UpdateLayerTexture => 2,
    }
  }
}

/// Outcome observed through the handle returned by [`PendingMainThreadTasks::enqueue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshTaskOutcome {
  Completed,
  Cancelled,
}

/// Shared cell the caller can poll to learn whether its enqueued task ran or
/// was superseded. Not a [`crate::task::TaskHandle`]: main-thread tasks
/// resolve synchronously during drain, not on a background thread.
pub type MeshTaskPromise = Arc<Mutex<Option<MeshTaskOutcome>>>;

struct Slot {
  run: Box<dyn FnOnce() + Send>,
  promise: MeshTaskPromise,
}

/// At most one pending closure per [`MeshTaskKind`]; enqueuing a new one for
/// a kind that already has a pending entry cancels the earlier one.
pub struct PendingMainThreadTasks {
  slots: [Option<Slot>; 3],
}

impl PendingMainThreadTasks {
  pub fn new() -> Self {
    Self { slots: [None, None, None] }
  }

  pub fn enqueue<F>(&mut self, kind: MeshTaskKind, run: F) -> MeshTaskPromise
  where
    F: FnOnce() + Send + 'static,
  {
    let idx = kind.slot();
    if let Some(old) = self.slots[idx].take() {
      *old.promise.lock().unwrap() = Some(MeshTaskOutcome::Cancelled);
    }
    let promise: MeshTaskPromise = Arc::new(Mutex::new(None));
    self.slots[idx] = Some(Slot {
      run: Box::new(run),
      promise: promise.clone(),
    });
    promise
  }

  pub fn is_empty(&self) -> bool {
    self.slots.iter().all(|s| s.is_none())
  }

  /// Drain every pending task regardless of budget; used by hosts with no
  /// tick-budget concept and by tests.
  pub fn drain_all(&mut self) {
    for kind in MeshTaskKind::ALL {
      if let Some(entry) = self.slots[kind.slot()].take() {
        (entry.run)();
        *entry.promise.lock().unwrap() = Some(MeshTaskOutcome::Completed);
      }
    }
  }

  /// Drain pending tasks cooperatively, charging each task's wall time
  /// against `budget` and stopping once it is exhausted (SPEC §4.4).
  pub fn drain_with_budget(&mut self, budget: &mut TickBudget) {
    for kind in MeshTaskKind::ALL {
      if !budget.has_budget() {
        break;
      }
      if let Some(entry) = self.slots[kind.slot()].take() {
        let start = Instant::now();
        (entry.run)();
        *entry.promise.lock().unwrap() = Some(MeshTaskOutcome::Completed);
        budget.record(start.elapsed());
      }
    }
  }
}

impl Default for PendingMainThreadTasks {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[test]
  fn enqueueing_same_kind_cancels_the_earlier_one() {
    let mut tasks = PendingMainThreadTasks::new();
    let ran = Arc::new(AtomicU32::new(0));

    let first_promise = tasks.enqueue(MeshTaskKind::UpdateRenderMeshes, {
      let ran = ran.clone();
      move || {
        ran.fetch_add(1, Ordering::SeqCst);
      }
    });
    let second_promise = tasks.enqueue(MeshTaskKind::UpdateRenderMeshes, {
      let ran = ran.clone();
      move || {
        ran.fetch_add(10, Ordering::SeqCst);
      }
    });

    tasks.drain_all();

    assert_eq!(ran.load(Ordering::SeqCst), 10, "only the second closure should run");
    assert_eq!(*first_promise.lock().unwrap(), Some(MeshTaskOutcome::Cancelled));
    assert_eq!(*second_promise.lock().unwrap(), Some(MeshTaskOutcome::Completed));
  }

  #[test]
  fn different_kinds_do_not_interfere() {
    let mut tasks = PendingMainThreadTasks::new();
    let render = tasks.enqueue(MeshTaskKind::UpdateRenderMeshes, || {});
    let collision = tasks.enqueue(MeshTaskKind::UpdateCollisionMesh, || {});
    tasks.drain_all();
    assert_eq!(*render.lock().unwrap(), Some(MeshTaskOutcome::Completed));
    assert_eq!(*collision.lock().unwrap(), Some(MeshTaskOutcome::Completed));
  }

  #[test]
  fn budget_drain_stops_when_exhausted() {
    let mut tasks = PendingMainThreadTasks::new();
    let render = tasks.enqueue(MeshTaskKind::UpdateRenderMeshes, || {});
    let collision = tasks.enqueue(MeshTaskKind::UpdateCollisionMesh, || {});

    let mut budget = TickBudget::with_cap(web_time::Duration::from_micros(0));
    tasks.drain_with_budget(&mut budget);

    assert!(render.lock().unwrap().is_none());
    assert!(collision.lock().unwrap().is_none());
    assert!(!tasks.is_empty());
  }
}
