//! Occupancy map: sensor fusion over the octree.
//!
//! [`OccupancyMap`] owns the tree plus the mapping state around it: the
//! sensor model, the optional update bounding box, and the optional change
//! set. The recursive update is the core algorithm; everything else
//! (raycasting, scan integration, I/O, traversals) builds on it from the
//! sibling modules.
//!
//! # Lazy evaluation
//!
//! Updates with `lazy_eval = true` skip inner-node re-aggregation. Until
//! [`update_inner_occupancy`](OccupancyMap::update_inner_occupancy) runs,
//! the tree is consistent only for finest-depth queries; coarse-depth
//! queries may observe stale aggregates, and pruning is deferred.

use glam::Vec3;

use crate::cell::{LogOddsCell, OccupancyCell};
use crate::error::{MapError, Result};
use crate::key::{KeySet, VoxelKey, TREE_DEPTH};
use crate::node::Node;
use crate::sensor::SensorModel;
use crate::tree::{LeafIter, OcTree};

/// Probabilistic occupancy map over an octree of `C` payloads.
#[derive(Clone, Debug)]
pub struct OccupancyMap<C: OccupancyCell> {
  tree: OcTree<C>,
  sensor: SensorModel,

  use_bbx_limit: bool,
  bbx_min: Vec3,
  bbx_max: Vec3,
  bbx_min_key: VoxelKey,
  bbx_max_key: VoxelKey,

  use_change_detection: bool,
  changed_keys: KeySet,
}

/// Occupancy map with the plain log-odds payload.
pub type VoxelMap = OccupancyMap<LogOddsCell>;

impl<C: OccupancyCell> OccupancyMap<C> {
  /// Create an empty map with the given finest voxel size in meters and the
  /// default sensor model.
  ///
  /// # Panics
  /// Panics if `resolution` is not strictly positive.
  pub fn new(resolution: f64) -> Self {
    Self::with_sensor_model(resolution, SensorModel::default())
  }

  /// Create an empty map with an explicit sensor model.
  pub fn with_sensor_model(resolution: f64, sensor: SensorModel) -> Self {
    Self {
      tree: OcTree::new(resolution),
      sensor,
      use_bbx_limit: false,
      bbx_min: Vec3::ZERO,
      bbx_max: Vec3::ZERO,
      bbx_min_key: VoxelKey::origin(),
      bbx_max_key: VoxelKey::origin(),
      use_change_detection: false,
      changed_keys: KeySet::default(),
    }
  }

  /// The underlying octree.
  #[inline]
  pub fn tree(&self) -> &OcTree<C> {
    &self.tree
  }

  #[inline]
  pub(crate) fn tree_mut(&mut self) -> &mut OcTree<C> {
    &mut self.tree
  }

  /// Sensor model parameters.
  #[inline]
  pub fn sensor(&self) -> &SensorModel {
    &self.sensor
  }

  /// Mutable sensor model parameters.
  #[inline]
  pub fn sensor_mut(&mut self) -> &mut SensorModel {
    &mut self.sensor
  }

  /// Finest voxel edge length in meters.
  #[inline]
  pub fn resolution(&self) -> f64 {
    self.tree.resolution()
  }

  /// True iff the map holds no data.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.tree.is_empty()
  }

  /// Drop all nodes and the change set. Parameters are kept.
  pub fn clear(&mut self) {
    self.tree.clear();
    self.changed_keys.clear();
  }

  /// See [`OcTree::search`].
  #[inline]
  pub fn search(&self, key: VoxelKey) -> Option<&Node<C>> {
    self.tree.search(key)
  }

  /// See [`OcTree::search_at_depth`].
  #[inline]
  pub fn search_at_depth(&self, key: VoxelKey, depth: usize) -> Option<&Node<C>> {
    self.tree.search_at_depth(key, depth)
  }

  /// See [`OcTree::search_coord`].
  #[inline]
  pub fn search_coord(&self, coord: Vec3) -> Option<&Node<C>> {
    self.tree.search_coord(coord)
  }

  /// See [`OcTree::search_mut`].
  #[inline]
  pub fn search_mut(&mut self, key: VoxelKey) -> Option<&mut Node<C>> {
    self.tree.search_mut(key)
  }

  /// See [`OcTree::delete_node`].
  #[inline]
  pub fn delete_node(&mut self, key: VoxelKey, depth: usize) -> bool {
    self.tree.delete_node(key, depth)
  }

  /// See [`OcTree::prune`].
  #[inline]
  pub fn prune(&mut self) {
    self.tree.prune();
  }

  /// See [`OcTree::iter_leaves`].
  #[inline]
  pub fn iter_leaves(&self) -> LeafIter<'_, C> {
    self.tree.iter_leaves()
  }

  // -- classification --------------------------------------------------

  /// A node is occupied iff its log-odds reaches the occupancy threshold.
  #[inline]
  pub fn is_node_occupied(&self, node: &Node<C>) -> bool {
    node.log_odds() >= self.sensor.occupancy_thres_log()
  }

  /// A node is at threshold iff its log-odds sits at either clamping bound.
  #[inline]
  pub fn is_node_at_threshold(&self, node: &Node<C>) -> bool {
    node.log_odds() <= self.sensor.clamping_thres_min()
      || node.log_odds() >= self.sensor.clamping_thres_max()
  }

  // -- update ----------------------------------------------------------

  /// Integrate one occupancy measurement at `key`.
  ///
  /// Adds `prob_hit_log` (occupied) or `prob_miss_log` (free) with
  /// clamping. Returns the node covering `key` afterwards, or `None` when
  /// the bounding-box filter dropped the update.
  pub fn update_node(&mut self, key: VoxelKey, occupied: bool, lazy_eval: bool) -> Option<&Node<C>> {
    let delta = if occupied {
      self.sensor.prob_hit_log()
    } else {
      self.sensor.prob_miss_log()
    };
    self.update_node_log_odds(key, delta, lazy_eval)
  }

  /// Coordinate-taking form of [`update_node`](OccupancyMap::update_node).
  ///
  /// Returns `None` for out-of-range coordinates; the tree is untouched.
  pub fn update_node_coord(
    &mut self,
    coord: Vec3,
    occupied: bool,
    lazy_eval: bool,
  ) -> Option<&Node<C>> {
    let key = self.tree.codec().coord_to_key(coord)?;
    self.update_node(key, occupied, lazy_eval)
  }

  /// Add an arbitrary log-odds increment at `key`, with clamping.
  pub fn update_node_log_odds(
    &mut self,
    key: VoxelKey,
    delta: f32,
    lazy_eval: bool,
  ) -> Option<&Node<C>> {
    if self.use_bbx_limit && !self.in_bbx_key(key) {
      return None;
    }
    let sensor = self.sensor;
    let record_changes = self.use_change_detection;
    let mut changes = std::mem::take(&mut self.changed_keys);
    let root_fresh = self.tree.is_empty();
    Self::update_recurs(
      self.tree.root_mut(),
      root_fresh,
      key,
      0,
      delta,
      &sensor,
      lazy_eval,
      record_changes,
      &mut changes,
    );
    self.changed_keys = changes;
    self.tree.search(key)
  }

  /// Coordinate-taking form of
  /// [`update_node_log_odds`](OccupancyMap::update_node_log_odds).
  pub fn update_node_log_odds_coord(
    &mut self,
    coord: Vec3,
    delta: f32,
    lazy_eval: bool,
  ) -> Option<&Node<C>> {
    let key = self.tree.codec().coord_to_key(coord)?;
    self.update_node_log_odds(key, delta, lazy_eval)
  }

  /// Recursive descent of the update.
  ///
  /// `just_created` distinguishes a node materialized by this call from a
  /// pre-existing pruned leaf: only the latter carries a region value that
  /// must be pushed down before descending, and only the latter may satisfy
  /// the saturation fast path.
  #[allow(clippy::too_many_arguments)]
  fn update_recurs(
    node: &mut Node<C>,
    just_created: bool,
    key: VoxelKey,
    depth: usize,
    delta: f32,
    sensor: &SensorModel,
    lazy_eval: bool,
    record_changes: bool,
    changes: &mut KeySet,
  ) {
    if depth == TREE_DEPTH {
      node.cell_mut().update_log_odds(delta, sensor);
      if record_changes {
        changes.insert(key);
      }
      return;
    }

    if !just_created && !node.has_children() {
      // Saturated region, update pushes in the same direction: the value
      // cannot move, so the subtree stays collapsed.
      let current = node.log_odds();
      if (delta >= 0.0 && current >= sensor.clamping_thres_max())
        || (delta <= 0.0 && current <= sensor.clamping_thres_min())
      {
        return;
      }
    }

    let octant = key.child_index(depth);
    let mut created = false;
    if node.child(octant).is_none() {
      if !node.has_children() && !just_created {
        // Pruned leaf: push its value down before descending.
        node.expand();
      } else {
        node.create_child(octant);
        created = true;
      }
    }

    Self::update_recurs(
      node.child_mut(octant).expect("ensured above"),
      created,
      key,
      depth + 1,
      delta,
      sensor,
      lazy_eval,
      record_changes,
      changes,
    );

    if !lazy_eval {
      // Collapse if the subtree became uniform, otherwise refresh the
      // aggregate. The root is never collapsed.
      if depth == 0 || !node.prune() {
        node.update_from_children();
      }
    }
  }

  /// Refresh every inner node's log-odds to the maximum over its children.
  ///
  /// Required after batch updates with `lazy_eval = true` before any
  /// coarse-depth query or prune.
  pub fn update_inner_occupancy(&mut self) {
    Self::update_inner_recurs(self.tree.root_mut());
  }

  fn update_inner_recurs(node: &mut Node<C>) {
    if !node.has_children() {
      return;
    }
    for octant in 0..8 {
      if let Some(child) = node.child_mut(octant) {
        Self::update_inner_recurs(child);
      }
    }
    node.update_from_children();
  }

  /// Reduce every node to its maximum-likelihood estimate (post-order, so
  /// inner aggregates are reduced after their children). Idempotent.
  pub fn to_max_likelihood(&mut self) {
    if self.tree.is_empty() {
      return;
    }
    let sensor = self.sensor;
    Self::max_likelihood_recurs(self.tree.root_mut(), &sensor);
  }

  fn max_likelihood_recurs(node: &mut Node<C>, sensor: &SensorModel) {
    for octant in 0..8 {
      if let Some(child) = node.child_mut(octant) {
        Self::max_likelihood_recurs(child, sensor);
      }
    }
    node.cell_mut().to_max_likelihood(sensor);
  }

  // -- bounding-box filter ----------------------------------------------

  /// Restrict updates to the configured bounding box (off by default).
  pub fn use_bbx_limit(&mut self, enable: bool) {
    self.use_bbx_limit = enable;
  }

  /// True iff the bounding-box filter is active.
  #[inline]
  pub fn bbx_set(&self) -> bool {
    self.use_bbx_limit
  }

  /// Set the minimum corner of the update bounding box.
  pub fn set_bbx_min(&mut self, min: Vec3) -> Result<()> {
    self.bbx_min_key = self
      .tree
      .codec()
      .coord_to_key(min)
      .ok_or(MapError::OutOfRange(min.x, min.y, min.z))?;
    self.bbx_min = min;
    Ok(())
  }

  /// Set the maximum corner of the update bounding box.
  pub fn set_bbx_max(&mut self, max: Vec3) -> Result<()> {
    self.bbx_max_key = self
      .tree
      .codec()
      .coord_to_key(max)
      .ok_or(MapError::OutOfRange(max.x, max.y, max.z))?;
    self.bbx_max = max;
    Ok(())
  }

  /// Minimum corner of the update bounding box.
  #[inline]
  pub fn bbx_min(&self) -> Vec3 {
    self.bbx_min
  }

  /// Maximum corner of the update bounding box.
  #[inline]
  pub fn bbx_max(&self) -> Vec3 {
    self.bbx_max
  }

  /// Extent of the bounding box (`max - min`).
  #[inline]
  pub fn bbx_bounds(&self) -> Vec3 {
    self.bbx_max - self.bbx_min
  }

  /// Center of the bounding box.
  #[inline]
  pub fn bbx_center(&self) -> Vec3 {
    self.bbx_min + (self.bbx_max - self.bbx_min) * 0.5
  }

  /// True iff `point` lies inside the configured bounding box.
  pub fn in_bbx(&self, point: Vec3) -> bool {
    point.x >= self.bbx_min.x
      && point.x <= self.bbx_max.x
      && point.y >= self.bbx_min.y
      && point.y <= self.bbx_max.y
      && point.z >= self.bbx_min.z
      && point.z <= self.bbx_max.z
  }

  /// True iff `key` lies inside the cached bounding-box keys.
  pub fn in_bbx_key(&self, key: VoxelKey) -> bool {
    (0..3).all(|axis| key[axis] >= self.bbx_min_key[axis] && key[axis] <= self.bbx_max_key[axis])
  }

  // -- change detection --------------------------------------------------

  /// Track the finest-depth keys touched by updates (off by default).
  pub fn enable_change_detection(&mut self, enable: bool) {
    self.use_change_detection = enable;
  }

  /// True iff touched keys are being recorded.
  #[inline]
  pub fn change_detection_enabled(&self) -> bool {
    self.use_change_detection
  }

  /// Forget all recorded keys. Call after consuming
  /// [`changed_keys`](OccupancyMap::changed_keys).
  pub fn reset_change_set(&mut self) {
    self.changed_keys.clear();
  }

  /// Keys touched since the last reset, at finest-depth resolution.
  pub fn changed_keys(&self) -> impl Iterator<Item = &VoxelKey> {
    self.changed_keys.iter()
  }

  /// Number of keys touched since the last reset.
  #[inline]
  pub fn num_changed_keys(&self) -> usize {
    self.changed_keys.len()
  }
}

#[cfg(test)]
#[path = "map_test.rs"]
mod map_test;
