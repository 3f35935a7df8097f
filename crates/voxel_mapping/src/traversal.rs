//! Depth- and box-bounded collectors over the tree.
//!
//! All collectors walk pre-order and treat a node as terminal when it is a
//! leaf or when the depth limit is reached; a terminal node is classified
//! through the map's occupancy threshold, so a coarse node covering any
//! occupied sub-voxel reports occupied (maximum aggregation).

use glam::Vec3;

use crate::cell::OccupancyCell;
use crate::key::{VoxelKey, TREE_DEPTH};
use crate::map::OccupancyMap;
use crate::node::Node;

/// A cubic region reported by a traversal: center and edge length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OcTreeVolume {
  /// World center of the region.
  pub center: Vec3,
  /// Edge length in meters.
  pub size: f64,
}

/// Volumes split by whether the node sits at a clamping threshold
/// ("binary") or carries an intermediate value ("delta").
#[derive(Clone, Debug, Default)]
pub struct VolumeSplit {
  /// Nodes at a clamping threshold.
  pub binary: Vec<OcTreeVolume>,
  /// Nodes between the clamping thresholds.
  pub delta: Vec<OcTreeVolume>,
}

impl<C: OccupancyCell> OccupancyMap<C> {
  /// Collect all occupied regions, reported no deeper than `max_depth`
  /// (0 means no limit).
  pub fn get_occupied(&self, max_depth: usize) -> Vec<OcTreeVolume> {
    let split = self.get_occupied_split(max_depth);
    let mut volumes = split.binary;
    volumes.extend(split.delta);
    volumes
  }

  /// Collect occupied regions, separated into threshold ("binary") and
  /// intermediate ("delta") nodes.
  pub fn get_occupied_split(&self, max_depth: usize) -> VolumeSplit {
    let mut split = VolumeSplit::default();
    if !self.is_empty() {
      self.collect_recurs(self.tree().root(), VoxelKey::new(0, 0, 0), 0, max_depth, true, &mut split);
    }
    split
  }

  /// Centers of all occupied regions at `max_depth` granularity.
  pub fn get_occupied_centers(&self, max_depth: usize) -> Vec<Vec3> {
    self.get_occupied(max_depth).into_iter().map(|v| v.center).collect()
  }

  /// Collect all free regions, reported no deeper than `max_depth`.
  pub fn get_freespace(&self, max_depth: usize) -> Vec<OcTreeVolume> {
    let split = self.get_freespace_split(max_depth);
    let mut volumes = split.binary;
    volumes.extend(split.delta);
    volumes
  }

  /// Collect free regions, separated into threshold and intermediate nodes.
  pub fn get_freespace_split(&self, max_depth: usize) -> VolumeSplit {
    let mut split = VolumeSplit::default();
    if !self.is_empty() {
      self.collect_recurs(self.tree().root(), VoxelKey::new(0, 0, 0), 0, max_depth, false, &mut split);
    }
    split
  }

  fn collect_recurs(
    &self,
    node: &Node<C>,
    key: VoxelKey,
    depth: usize,
    max_depth: usize,
    want_occupied: bool,
    out: &mut VolumeSplit,
  ) {
    let terminal = !node.has_children() || (max_depth != 0 && depth == max_depth);
    if terminal {
      if self.is_node_occupied(node) != want_occupied {
        return;
      }
      let volume = OcTreeVolume {
        center: self.tree().codec().key_to_coord_at_depth(key, depth),
        size: self.tree().codec().node_size(depth),
      };
      if self.is_node_at_threshold(node) {
        out.binary.push(volume);
      } else {
        out.delta.push(volume);
      }
      return;
    }
    for octant in 0..8 {
      if let Some(child) = node.child(octant) {
        self.collect_recurs(child, key.child_key(depth, octant), depth + 1, max_depth, want_occupied, out);
      }
    }
  }

  /// Centers of all occupied leaves whose cells overlap the box
  /// `[min, max]`. Subtrees outside the box are never descended; the
  /// overlap test runs on key-space extents.
  ///
  /// Coordinates outside the key range are clamped to it, so a box larger
  /// than the mapped space degenerates to an unbounded query.
  pub fn get_occupied_leafs_bbx(&self, min: Vec3, max: Vec3) -> Vec<Vec3> {
    if self.is_empty() {
      return Vec::new();
    }
    let codec = self.tree().codec();
    let clamp_key = |coord: f32| {
      let cell = (coord as f64 / codec.resolution()).round() as i64 + (1i64 << 15);
      cell.clamp(0, u16::MAX as i64) as u16
    };
    let min_key = VoxelKey::new(clamp_key(min.x), clamp_key(min.y), clamp_key(min.z));
    let max_key = VoxelKey::new(clamp_key(max.x), clamp_key(max.y), clamp_key(max.z));

    let mut centers = Vec::new();
    self.occupied_bbx_recurs(
      self.tree().root(),
      VoxelKey::new(0, 0, 0),
      0,
      min_key,
      max_key,
      &mut centers,
    );
    centers
  }

  fn occupied_bbx_recurs(
    &self,
    node: &Node<C>,
    key: VoxelKey,
    depth: usize,
    min_key: VoxelKey,
    max_key: VoxelKey,
    out: &mut Vec<Vec3>,
  ) {
    // Key-space extent of this subtree: [key, key + span - 1] per axis.
    let span = 1u32 << (TREE_DEPTH - depth);
    for axis in 0..3 {
      let lo = key[axis] as u32;
      let hi = lo + span - 1;
      if lo > max_key[axis] as u32 || hi < min_key[axis] as u32 {
        return;
      }
    }
    if !node.has_children() {
      if self.is_node_occupied(node) {
        out.push(self.tree().codec().key_to_coord_at_depth(key, depth));
      }
      return;
    }
    for octant in 0..8 {
      if let Some(child) = node.child(octant) {
        self.occupied_bbx_recurs(child, key.child_key(depth, octant), depth + 1, min_key, max_key, out);
      }
    }
  }

  /// Count nodes at a clamping threshold versus nodes carrying intermediate
  /// values, over the whole tree (the root is not counted).
  pub fn num_thresholded_nodes(&self) -> (usize, usize) {
    let mut thresholded = 0;
    let mut other = 0;
    if !self.is_empty() {
      self.count_thresholded_recurs(self.tree().root(), &mut thresholded, &mut other);
    }
    (thresholded, other)
  }

  fn count_thresholded_recurs(&self, node: &Node<C>, thresholded: &mut usize, other: &mut usize) {
    for octant in 0..8 {
      if let Some(child) = node.child(octant) {
        if self.is_node_at_threshold(child) {
          *thresholded += 1;
        } else {
          *other += 1;
        }
        self.count_thresholded_recurs(child, thresholded, other);
      }
    }
  }
}

#[cfg(test)]
#[path = "traversal_test.rs"]
mod traversal_test;
