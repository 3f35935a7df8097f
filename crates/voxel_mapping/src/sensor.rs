//! Sensor model: hit/miss strengths, classification threshold, clamping.
//!
//! All parameters are stored in log-odds space. Probabilities are only seen
//! at the API boundary and converted on the way in.

use crate::cell::log_odds;
use crate::error::{MapError, Result};

/// Occupancy sensor model in log-odds space.
///
/// Invariants enforced by the setters: `prob_hit_log > 0`,
/// `prob_miss_log < 0`, `clamping_thres_min < clamping_thres_max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorModel {
  prob_hit_log: f32,
  prob_miss_log: f32,
  occupancy_thres_log: f32,
  clamping_thres_min: f32,
  clamping_thres_max: f32,
}

impl Default for SensorModel {
  fn default() -> Self {
    Self {
      prob_hit_log: log_odds(0.7),
      prob_miss_log: log_odds(0.4),
      occupancy_thres_log: log_odds(0.5),
      clamping_thres_min: log_odds(0.1192),
      clamping_thres_max: log_odds(0.971),
    }
  }
}

impl SensorModel {
  /// Sensor model with the default parameters (hit 0.7, miss 0.4,
  /// threshold 0.5, clamping 0.1192 / 0.971).
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder: set the hit probability.
  ///
  /// # Panics
  /// Panics on an out-of-domain probability; use [`set_prob_hit`] for a
  /// fallible setter.
  ///
  /// [`set_prob_hit`]: SensorModel::set_prob_hit
  pub fn with_prob_hit(mut self, prob: f64) -> Self {
    self.set_prob_hit(prob).expect("prob_hit must be > 0.5");
    self
  }

  /// Builder: set the miss probability. Panics on an out-of-domain value.
  pub fn with_prob_miss(mut self, prob: f64) -> Self {
    self.set_prob_miss(prob).expect("prob_miss must be < 0.5");
    self
  }

  /// Builder: set the occupancy classification threshold.
  pub fn with_occupancy_thres(mut self, prob: f64) -> Self {
    self.set_occupancy_thres(prob);
    self
  }

  /// Builder: set both clamping bounds. Panics when `min >= max`.
  pub fn with_clamping_thres(mut self, min: f64, max: f64) -> Self {
    let min_log = log_odds(min);
    let max_log = log_odds(max);
    assert!(min_log < max_log, "clamping min must be below max");
    self.clamping_thres_min = min_log;
    self.clamping_thres_max = max_log;
    self
  }

  /// Set `P(occupied | hit)`; must be above 0.5 so the log-odds delta is
  /// positive.
  pub fn set_prob_hit(&mut self, prob: f64) -> Result<()> {
    if !(prob > 0.5 && prob < 1.0) {
      return Err(MapError::InvalidParameter(format!(
        "prob_hit must be in (0.5, 1.0), got {prob}"
      )));
    }
    self.prob_hit_log = log_odds(prob);
    Ok(())
  }

  /// Set `P(occupied | miss)`; must be below 0.5 so the log-odds delta is
  /// negative.
  pub fn set_prob_miss(&mut self, prob: f64) -> Result<()> {
    if !(prob > 0.0 && prob < 0.5) {
      return Err(MapError::InvalidParameter(format!(
        "prob_miss must be in (0.0, 0.5), got {prob}"
      )));
    }
    self.prob_miss_log = log_odds(prob);
    Ok(())
  }

  /// Set the occupancy classification threshold probability.
  pub fn set_occupancy_thres(&mut self, prob: f64) {
    self.occupancy_thres_log = log_odds(prob);
  }

  /// Set the lower clamping bound probability.
  pub fn set_clamping_thres_min(&mut self, prob: f64) -> Result<()> {
    let value = log_odds(prob);
    if value >= self.clamping_thres_max {
      return Err(MapError::InvalidParameter(format!(
        "clamping min {value} must stay below max {}",
        self.clamping_thres_max
      )));
    }
    self.clamping_thres_min = value;
    Ok(())
  }

  /// Set the upper clamping bound probability.
  pub fn set_clamping_thres_max(&mut self, prob: f64) -> Result<()> {
    let value = log_odds(prob);
    if value <= self.clamping_thres_min {
      return Err(MapError::InvalidParameter(format!(
        "clamping max {value} must stay above min {}",
        self.clamping_thres_min
      )));
    }
    self.clamping_thres_max = value;
    Ok(())
  }

  /// Log-odds delta of a hit (positive).
  #[inline]
  pub fn prob_hit_log(&self) -> f32 {
    self.prob_hit_log
  }

  /// Log-odds delta of a miss (negative).
  #[inline]
  pub fn prob_miss_log(&self) -> f32 {
    self.prob_miss_log
  }

  /// Log-odds occupancy classification threshold.
  #[inline]
  pub fn occupancy_thres_log(&self) -> f32 {
    self.occupancy_thres_log
  }

  /// Lower saturation bound in log-odds.
  #[inline]
  pub fn clamping_thres_min(&self) -> f32 {
    self.clamping_thres_min
  }

  /// Upper saturation bound in log-odds.
  #[inline]
  pub fn clamping_thres_max(&self) -> f32 {
    self.clamping_thres_max
  }

  /// Saturate a log-odds value into the clamping interval.
  #[inline]
  pub fn clamp(&self, log_odds: f32) -> f32 {
    log_odds.clamp(self.clamping_thres_min, self.clamping_thres_max)
  }
}

#[cfg(test)]
#[path = "sensor_test.rs"]
mod sensor_test;
