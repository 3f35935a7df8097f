//! 3D voxel traversal on the finest-depth grid.
//!
//! Amanatides-Woo style stepping: per-axis `t_max` / `t_delta` in f64,
//! ties resolved in x, y, z order. Both the scan integration and the
//! `cast_ray` query run on the same stepper.

use glam::{DVec3, Vec3};

use crate::cell::OccupancyCell;
use crate::codec::CoordCodec;
use crate::key::{KeyRay, VoxelKey};
use crate::map::OccupancyMap;

/// Directions below this magnitude do not advance an axis.
const DIR_EPSILON: f64 = 1e-10;

/// Incremental voxel stepper along a ray.
struct RayStepper {
  key: VoxelKey,
  step: [i32; 3],
  t_max: [f64; 3],
  t_delta: [f64; 3],
}

impl RayStepper {
  /// Set up stepping from the voxel containing `origin` along `direction`
  /// (unit length).
  fn new(codec: &CoordCodec, origin: DVec3, direction: DVec3, start: VoxelKey) -> Self {
    let resolution = codec.resolution();
    let mut step = [0i32; 3];
    let mut t_max = [f64::INFINITY; 3];
    let mut t_delta = [f64::INFINITY; 3];
    for axis in 0..3 {
      let dir = direction[axis];
      if dir.abs() > DIR_EPSILON {
        step[axis] = if dir > 0.0 { 1 } else { -1 };
        // Distance to the first voxel border crossed on this axis.
        let border =
          codec.key_to_coord_axis(start[axis]) + step[axis] as f64 * 0.5 * resolution;
        t_max[axis] = (border - origin[axis]) / dir;
        t_delta[axis] = resolution / dir.abs();
      }
    }
    Self {
      key: start,
      step,
      t_max,
      t_delta,
    }
  }

  /// Advance to the next voxel. Returns `false` when the ray leaves the
  /// representable key range (or cannot advance at all).
  fn advance(&mut self) -> bool {
    // Smallest t_max wins; ties go to the earlier axis (x, y, z order).
    let axis = if self.t_max[0] <= self.t_max[1] {
      if self.t_max[0] <= self.t_max[2] {
        0
      } else {
        2
      }
    } else if self.t_max[1] <= self.t_max[2] {
      1
    } else {
      2
    };
    if self.step[axis] == 0 {
      return false;
    }
    let next = self.key[axis] as i32 + self.step[axis];
    if !(0..=u16::MAX as i32).contains(&next) {
      return false;
    }
    self.key[axis] = next as u16;
    self.t_max[axis] += self.t_delta[axis];
    true
  }

  /// Distance traveled to the nearest pending border crossing.
  #[inline]
  fn traveled(&self) -> f64 {
    self.t_max[0].min(self.t_max[1]).min(self.t_max[2])
  }
}

impl<C: OccupancyCell> OccupancyMap<C> {
  /// Collect the keys of all voxels a ray from `origin` to `end` traverses,
  /// starting with the voxel containing `origin` and excluding the voxel
  /// containing `end`.
  ///
  /// The output buffer is cleared first and can be reused across calls.
  /// Returns `false` (with an empty buffer) when either endpoint is outside
  /// the representable key range.
  pub fn compute_ray_keys(&self, origin: Vec3, end: Vec3, ray: &mut KeyRay) -> bool {
    ray.clear();
    let codec = self.tree().codec();
    let (Some(key_origin), Some(key_end)) = (codec.coord_to_key(origin), codec.coord_to_key(end))
    else {
      return false;
    };
    if key_origin == key_end {
      return true;
    }
    ray.push(key_origin);

    let origin = origin.as_dvec3();
    let span = end.as_dvec3() - origin;
    let length = span.length();
    if length < DIR_EPSILON {
      return true;
    }
    let mut stepper = RayStepper::new(codec, origin, span / length, key_origin);
    loop {
      if !stepper.advance() {
        break;
      }
      if stepper.key == key_end {
        break;
      }
      // Numeric safety net: stop once the traversal has covered the segment
      // even if the end voxel was never hit exactly.
      if stepper.traveled() > length {
        break;
      }
      ray.push(stepper.key);
    }
    true
  }

  /// Cast a ray from `origin` along `direction` (any length) and return the
  /// center of the first occupied voxel, or `None` if the ray ends without
  /// a hit.
  ///
  /// The voxel containing `origin` is part of the query: an occupied origin
  /// voxel is an immediate hit. Traversal stops without a hit when it
  /// leaves the key range, exceeds `max_range` (`<= 0` means unlimited), or
  /// reaches an unknown voxel while `ignore_unknown` is false.
  pub fn cast_ray(
    &self,
    origin: Vec3,
    direction: Vec3,
    ignore_unknown: bool,
    max_range: f64,
  ) -> Option<Vec3> {
    let codec = self.tree().codec();
    let mut key = codec.coord_to_key(origin)?;

    match self.search(key) {
      Some(node) if self.is_node_occupied(node) => {
        return Some(codec.key_to_coord(key));
      }
      Some(_) => {}
      None if !ignore_unknown => return None,
      None => {}
    }

    let direction = direction.as_dvec3();
    let length = direction.length();
    if length < DIR_EPSILON {
      return None;
    }
    let origin_d = origin.as_dvec3();
    let max_range_sq = max_range * max_range;
    let mut stepper = RayStepper::new(codec, origin_d, direction / length, key);
    loop {
      if !stepper.advance() {
        return None;
      }
      key = stepper.key;
      let center = codec.key_to_coord(key);
      if max_range > 0.0 && (center.as_dvec3() - origin_d).length_squared() > max_range_sq {
        return None;
      }
      match self.search(key) {
        Some(node) if self.is_node_occupied(node) => return Some(center),
        Some(_) => {}
        None if !ignore_unknown => return None,
        None => {}
      }
    }
  }

  /// Insert one measurement ray: every voxel between `origin` and `end` is
  /// integrated as a miss and the voxel containing `end` as a hit.
  ///
  /// With `max_range > 0`, a longer beam is truncated and only cleared up
  /// to the truncation point; no endpoint is marked occupied. Returns
  /// `false` when the ray could not be keyed (out of range).
  pub fn insert_ray(&mut self, origin: Vec3, end: Vec3, max_range: f64, lazy_eval: bool) -> bool {
    let span = end - origin;
    if max_range > 0.0 && span.length() as f64 > max_range {
      let truncated = origin + span.normalize() * max_range as f32;
      return self.integrate_miss_on_ray(origin, truncated, lazy_eval);
    }
    if !self.integrate_miss_on_ray(origin, end, lazy_eval) {
      return false;
    }
    self.update_node_coord(end, true, lazy_eval);
    true
  }

  /// Integrate a miss into every voxel on the ray, excluding the voxel
  /// containing `end`.
  fn integrate_miss_on_ray(&mut self, origin: Vec3, end: Vec3, lazy_eval: bool) -> bool {
    let mut ray = KeyRay::new();
    if !self.compute_ray_keys(origin, end, &mut ray) {
      return false;
    }
    for key in ray {
      self.update_node(key, false, lazy_eval);
    }
    true
  }
}

#[cfg(test)]
#[path = "raycast_test.rs"]
mod raycast_test;
