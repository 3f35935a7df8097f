//! Leaf payloads and the occupancy capability they share.
//!
//! The tree is generic over its leaf payload. Any payload exposing a
//! log-odds value through [`OccupancyCell`] gets the full update machinery
//! (hit/miss integration, clamping, maximum-likelihood reduction); concrete
//! tree flavors compose a specific payload. [`LogOddsCell`] is the plain
//! flavor used by [`VoxelMap`](crate::VoxelMap).

use crate::sensor::SensorModel;

/// Log-odds of a probability: `log(p / (1 - p))`.
#[inline]
pub fn log_odds(probability: f64) -> f32 {
  (probability / (1.0 - probability)).ln() as f32
}

/// Probability of a log-odds value: `1 / (1 + exp(-l))`.
#[inline]
pub fn probability(log_odds: f32) -> f64 {
  1.0 / (1.0 + (-log_odds as f64).exp())
}

/// Capability set a leaf payload must provide.
///
/// Equality (`PartialEq`) must be bit-exact on the log-odds value: pruning
/// collapses eight children only when their payloads compare equal, and that
/// collapse must be lossless.
pub trait OccupancyCell: Clone + Default + PartialEq {
  /// Identifies the tree flavor in the binary stream header.
  const TREE_ID: &'static str;

  /// Current log-odds occupancy estimate.
  fn log_odds(&self) -> f32;

  /// Overwrite the log-odds occupancy estimate.
  fn set_log_odds(&mut self, value: f32);

  /// Integrate a hit: add `prob_hit_log` and clamp.
  #[inline]
  fn integrate_hit(&mut self, model: &SensorModel) {
    self.set_log_odds(model.clamp(self.log_odds() + model.prob_hit_log()));
  }

  /// Integrate a miss: add `prob_miss_log` and clamp.
  #[inline]
  fn integrate_miss(&mut self, model: &SensorModel) {
    self.set_log_odds(model.clamp(self.log_odds() + model.prob_miss_log()));
  }

  /// Add an arbitrary log-odds increment and clamp.
  #[inline]
  fn update_log_odds(&mut self, delta: f32, model: &SensorModel) {
    self.set_log_odds(model.clamp(self.log_odds() + delta));
  }

  /// Reduce to the maximum-likelihood estimate: the upper clamping bound if
  /// classified occupied, the lower bound otherwise.
  #[inline]
  fn to_max_likelihood(&mut self, model: &SensorModel) {
    if self.log_odds() >= model.occupancy_thres_log() {
      self.set_log_odds(model.clamping_thres_max());
    } else {
      self.set_log_odds(model.clamping_thres_min());
    }
  }

  /// Occupancy probability of this payload.
  #[inline]
  fn occupancy(&self) -> f64 {
    probability(self.log_odds())
  }
}

/// Plain log-odds payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOddsCell {
  log_odds: f32,
}

impl LogOddsCell {
  /// Create a cell with the given log-odds value.
  #[inline]
  pub fn new(log_odds: f32) -> Self {
    Self { log_odds }
  }
}

impl PartialEq for LogOddsCell {
  #[inline]
  fn eq(&self, other: &Self) -> bool {
    // Bit comparison: pruning equality must be exact, and NaN payloads must
    // never compare unequal to themselves and block collapse detection.
    self.log_odds.to_bits() == other.log_odds.to_bits()
  }
}

impl Eq for LogOddsCell {}

impl OccupancyCell for LogOddsCell {
  const TREE_ID: &'static str = "voxel_mapping::VoxelMap";

  #[inline]
  fn log_odds(&self) -> f32 {
    self.log_odds
  }

  #[inline]
  fn set_log_odds(&mut self, value: f32) {
    self.log_odds = value;
  }
}

#[cfg(test)]
#[path = "cell_test.rs"]
mod cell_test;
