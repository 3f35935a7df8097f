//! Scan integration: from a point cloud to batched occupancy updates.
//!
//! One scan becomes two deduplicated key sets (free along the beams,
//! occupied at the endpoints) via ray traversal, with occupied winning any
//! conflict, and the sets are applied through the recursive update.

use glam::{Quat, Vec3};
use tracing::debug_span;

use crate::cell::OccupancyCell;
use crate::key::{KeyRay, KeySet};
use crate::map::OccupancyMap;

/// A finite set of measurement endpoints in one frame.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
  points: Vec<Vec3>,
}

impl PointCloud {
  /// Empty cloud.
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of points.
  #[inline]
  pub fn len(&self) -> usize {
    self.points.len()
  }

  /// True iff the cloud holds no points.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Append one point.
  #[inline]
  pub fn push(&mut self, point: Vec3) {
    self.points.push(point);
  }

  /// Iterate over the points.
  pub fn iter(&self) -> impl Iterator<Item = &Vec3> {
    self.points.iter()
  }

  /// Apply a rigid-body transform to every point.
  pub fn transform(&mut self, pose: &Pose) {
    for point in &mut self.points {
      *point = pose.transform_point(*point);
    }
  }
}

impl From<Vec<Vec3>> for PointCloud {
  fn from(points: Vec<Vec3>) -> Self {
    Self { points }
  }
}

impl FromIterator<Vec3> for PointCloud {
  fn from_iter<I: IntoIterator<Item = Vec3>>(iter: I) -> Self {
    Self {
      points: iter.into_iter().collect(),
    }
  }
}

/// Rigid-body transform (rotation then translation).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
  /// Rotation component.
  pub rotation: Quat,
  /// Translation component.
  pub translation: Vec3,
}

impl Pose {
  /// The identity transform.
  pub const IDENTITY: Self = Self {
    rotation: Quat::IDENTITY,
    translation: Vec3::ZERO,
  };

  /// Create a pose from rotation and translation.
  pub fn new(rotation: Quat, translation: Vec3) -> Self {
    Self {
      rotation,
      translation,
    }
  }

  /// Transform a point: rotate, then translate.
  #[inline]
  pub fn transform_point(&self, point: Vec3) -> Vec3 {
    self.rotation * point + self.translation
  }
}

impl Default for Pose {
  fn default() -> Self {
    Self::IDENTITY
  }
}

/// A scan bundled with its sensor origin and frame pose.
///
/// Both the cloud and the sensor origin are expressed in the scan's local
/// frame; `frame_pose` maps that frame into the map frame.
#[derive(Clone, Debug)]
pub struct ScanNode {
  /// Measurement endpoints in the local frame.
  pub cloud: PointCloud,
  /// Sensor origin in the local frame.
  pub sensor_origin: Vec3,
  /// Pose of the local frame in the map frame.
  pub frame_pose: Pose,
}

/// Options for scan insertion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanOptions {
  /// Maximum beam length in meters; `<= 0` integrates complete beams.
  pub max_range: f64,
  /// Losslessly prune the tree after the batch (ignored under lazy eval).
  pub prune: bool,
  /// Skip inner-node re-aggregation; the caller must run
  /// [`update_inner_occupancy`](OccupancyMap::update_inner_occupancy)
  /// before coarse queries.
  pub lazy_eval: bool,
}

impl Default for ScanOptions {
  fn default() -> Self {
    Self {
      max_range: -1.0,
      prune: true,
      lazy_eval: false,
    }
  }
}

impl ScanOptions {
  /// Default options: unlimited range, prune, no lazy eval.
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the maximum beam length.
  pub fn with_max_range(mut self, max_range: f64) -> Self {
    self.max_range = max_range;
    self
  }

  /// Enable or disable the post-batch prune.
  pub fn with_prune(mut self, prune: bool) -> Self {
    self.prune = prune;
    self
  }

  /// Enable or disable lazy evaluation.
  pub fn with_lazy_eval(mut self, lazy_eval: bool) -> Self {
    self.lazy_eval = lazy_eval;
    self
  }
}

impl<C: OccupancyCell> OccupancyMap<C> {
  /// Compute the batched update for one scan: which voxels to clear and
  /// which to mark occupied.
  ///
  /// Endpoints within range contribute their own voxel to the occupied set
  /// and every voxel between sensor and endpoint (endpoint excluded) to the
  /// free set. Endpoints beyond `max_range` only clear along the truncated
  /// beam, including its terminal voxel. Voxels claimed occupied by any
  /// beam are removed from the free set: a measured surface must not be
  /// cleared by a beam passing nearby.
  pub fn compute_update(
    &self,
    scan: &PointCloud,
    origin: Vec3,
    max_range: f64,
  ) -> (KeySet, KeySet) {
    let mut free_cells = KeySet::default();
    let mut occupied_cells = KeySet::default();
    let mut ray = KeyRay::new();

    for &point in scan.iter() {
      let beam = point - origin;
      if max_range <= 0.0 || beam.length() as f64 <= max_range {
        if let Some(key) = self.tree().codec().coord_to_key(point) {
          occupied_cells.insert(key);
        }
        if self.compute_ray_keys(origin, point, &mut ray) {
          free_cells.extend(ray.iter().copied());
        }
      } else {
        let end = origin + beam.normalize() * max_range as f32;
        if self.compute_ray_keys(origin, end, &mut ray) {
          free_cells.extend(ray.iter().copied());
          if let Some(key) = self.tree().codec().coord_to_key(end) {
            free_cells.insert(key);
          }
        }
      }
    }

    // Occupied wins.
    free_cells.retain(|key| !occupied_cells.contains(key));
    (free_cells, occupied_cells)
  }

  /// Integrate a point cloud measured from `sensor_origin`, both already in
  /// the map frame.
  pub fn insert_scan(&mut self, scan: &PointCloud, sensor_origin: Vec3, options: ScanOptions) {
    let _span = debug_span!("insert_scan", points = scan.len()).entered();
    let (free_cells, occupied_cells) = self.compute_update(scan, sensor_origin, options.max_range);

    for key in &free_cells {
      self.update_node(*key, false, options.lazy_eval);
    }
    for key in &occupied_cells {
      self.update_node(*key, true, options.lazy_eval);
    }

    if options.prune && !options.lazy_eval {
      self.prune();
    }
  }

  /// Integrate a scan expressed in a local frame: the cloud and the sensor
  /// origin are transformed by `frame_pose` first.
  pub fn insert_scan_transformed(
    &mut self,
    scan: &PointCloud,
    sensor_origin: Vec3,
    frame_pose: &Pose,
    options: ScanOptions,
  ) {
    let mut transformed = scan.clone();
    transformed.transform(frame_pose);
    let origin = frame_pose.transform_point(sensor_origin);
    self.insert_scan(&transformed, origin, options);
  }

  /// Integrate a [`ScanNode`], applying its bundled frame pose.
  pub fn insert_scan_node(&mut self, scan: &ScanNode, options: ScanOptions) {
    self.insert_scan_transformed(&scan.cloud, scan.sensor_origin, &scan.frame_pose, options);
  }

  /// Integrate a scan whose sensor sits at the pose origin.
  #[deprecated(note = "use insert_scan_transformed with separate sensor and frame origins")]
  pub fn insert_scan_posed(&mut self, scan: &PointCloud, pose: &Pose, options: ScanOptions) {
    self.insert_scan_transformed(scan, Vec3::ZERO, pose, options);
  }

  /// Per-beam reference integration: one [`insert_ray`] per endpoint, with
  /// no cross-beam deduplication and no occupied-over-free resolution. For
  /// testing against the batched path.
  ///
  /// [`insert_ray`]: OccupancyMap::insert_ray
  pub fn insert_scan_naive(&mut self, scan: &PointCloud, origin: Vec3, options: ScanOptions) {
    for &point in scan.iter() {
      self.insert_ray(origin, point, options.max_range, options.lazy_eval);
    }
    if options.prune && !options.lazy_eval {
      self.prune();
    }
  }
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod scan_test;
