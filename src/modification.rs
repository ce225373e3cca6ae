//! Append-only modification log, generic over the shape payload type (SPEC
//! §3 "the modification log's `clear_count` is monotonic"; §4.5).
//!
//! `Modification<S>`/`ModificationLog<S>` are the one piece of machinery
//! this crate does share between the 2D and 3D worlds unparameterised by
//! anything else (per `SPEC_FULL.md` §3) — `S` is instantiated as
//! [`crate::shapes::Shape2`] or [`crate::shapes::Shape3`], `R` as
//! [`crate::config::ResourceId`].

use crate::config::ResourceId;

/// Constructive set operator applied to a shape (SPEC §6 wire format: `0 =
/// Add, 1 = Subtract`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
  Add,
  Subtract,
}

/// One accepted `(operator, shape, resource)` triple.
#[derive(Clone, Debug)]
pub struct Modification<S> {
  pub operator: Operator,
  pub shape: S,
  pub resource: ResourceId,
}

/// Ordered, append-only log of accepted modifications plus the `clear_count`
/// epoch counter.
///
/// `clear_count` increments and the log is truncated to empty every time
/// `clear()` is called — this is the authority's own bookkeeping, not a
/// per-observer cursor (those live in [`crate::replication`]).
#[derive(Debug)]
pub struct ModificationLog<S> {
  entries: Vec<Modification<S>>,
  clear_count: u32,
}

impl<S> ModificationLog<S> {
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
      clear_count: 0,
    }
  }

  pub fn push(&mut self, modification: Modification<S>) {
    self.entries.push(modification);
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear_count(&self) -> u32 {
    self.clear_count
  }

  /// World-wide clear: increments `clear_count` and truncates the log to
  /// empty (SPEC §3 invariant).
  pub fn clear(&mut self) {
    self.clear_count += 1;
    self.entries.clear();
  }

  /// Drop every entry touching `resource`, without touching `clear_count`
  /// (SPEC §9 Open Question: per-resource clear is not a world-wide epoch
  /// change — see `World::clear_resource_async`).
  pub fn retain_other_resources(&mut self, resource: ResourceId) {
    self.entries.retain(|m| m.resource != resource);
  }

  pub fn slice(&self, from: usize, to: usize) -> &[Modification<S>] {
    &self.entries[from..to.min(self.entries.len())]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Modification<S>> {
    self.entries.iter()
  }
}

impl<S> Default for ModificationLog<S> {
  fn default() -> Self {
    Self::new()
  }
}
