//! Pointer-backed octree over a generic occupancy payload.
//!
//! The tree owns its root, the root transitively owns every descendant, and
//! the codec fixes the key space at construction. The root node is never
//! collapsed by pruning, so a childless root always means "no data": search
//! can report *unknown* without a sentinel.

use glam::Vec3;
use smallvec::SmallVec;

use crate::cell::OccupancyCell;
use crate::codec::CoordCodec;
use crate::key::{VoxelKey, TREE_DEPTH};
use crate::node::Node;

/// Octree with a fixed maximum depth of 16 and a resolution set at
/// construction.
#[derive(Clone, Debug)]
pub struct OcTree<C: OccupancyCell> {
  root: Node<C>,
  codec: CoordCodec,
}

impl<C: OccupancyCell> OcTree<C> {
  /// Create an empty tree with the given finest voxel size in meters.
  ///
  /// # Panics
  /// Panics if `resolution` is not strictly positive.
  pub fn new(resolution: f64) -> Self {
    Self {
      root: Node::default(),
      codec: CoordCodec::new(resolution),
    }
  }

  /// Finest voxel edge length in meters.
  #[inline]
  pub fn resolution(&self) -> f64 {
    self.codec.resolution()
  }

  /// Coordinate codec of this tree.
  #[inline]
  pub fn codec(&self) -> &CoordCodec {
    &self.codec
  }

  /// Root node (depth 0).
  #[inline]
  pub fn root(&self) -> &Node<C> {
    &self.root
  }

  #[inline]
  pub(crate) fn root_mut(&mut self) -> &mut Node<C> {
    &mut self.root
  }

  /// Replace the codec on a wholesale reload. Only binary deserialization
  /// may do this; live trees never change resolution.
  pub(crate) fn reset_codec(&mut self, resolution: f64) {
    self.codec = CoordCodec::new(resolution);
  }

  /// True iff the tree holds no data.
  #[inline]
  pub fn is_empty(&self) -> bool {
    !self.root.has_children()
  }

  /// Drop all nodes. Parameters and resolution are kept.
  pub fn clear(&mut self) {
    self.root = Node::default();
  }

  /// Find the node covering `key` at `depth` (0 means the finest depth).
  ///
  /// Descends slot by slot. Ending on an empty slot of an inner node means
  /// the voxel is unknown (`None`); ending on a leaf above the target depth
  /// returns that leaf, which carries the value of the whole pruned region.
  pub fn search_at_depth(&self, key: VoxelKey, depth: usize) -> Option<&Node<C>> {
    let depth = if depth == 0 { TREE_DEPTH } else { depth.min(TREE_DEPTH) };
    if self.is_empty() {
      return None;
    }
    let key = key.at_depth(depth);
    let mut node = &self.root;
    for level in 0..depth {
      match node.child(key.child_index(level)) {
        Some(child) => node = child,
        None if node.has_children() => return None,
        None => return Some(node),
      }
    }
    Some(node)
  }

  /// Find the finest-depth node covering `key`.
  #[inline]
  pub fn search(&self, key: VoxelKey) -> Option<&Node<C>> {
    self.search_at_depth(key, TREE_DEPTH)
  }

  /// Mutable variant of [`search_at_depth`](OcTree::search_at_depth).
  ///
  /// Structure edits through the returned node are the caller's
  /// responsibility; payload edits (e.g. `set_log_odds`) leave ancestor
  /// aggregates stale until
  /// [`update_inner_occupancy`](crate::OccupancyMap::update_inner_occupancy)
  /// runs.
  pub fn search_mut_at_depth(&mut self, key: VoxelKey, depth: usize) -> Option<&mut Node<C>> {
    let depth = if depth == 0 { TREE_DEPTH } else { depth.min(TREE_DEPTH) };
    if self.is_empty() {
      return None;
    }
    let key = key.at_depth(depth);
    let mut node = &mut self.root;
    for level in 0..depth {
      let octant = key.child_index(level);
      if node.child(octant).is_none() {
        return if node.has_children() { None } else { Some(node) };
      }
      node = node.child_mut(octant).expect("checked above");
    }
    Some(node)
  }

  /// Find the finest-depth node covering `key`, mutably.
  #[inline]
  pub fn search_mut(&mut self, key: VoxelKey) -> Option<&mut Node<C>> {
    self.search_mut_at_depth(key, TREE_DEPTH)
  }

  /// Find the finest-depth node covering a world coordinate.
  ///
  /// Out-of-range coordinates report *unknown*.
  #[inline]
  pub fn search_coord(&self, coord: Vec3) -> Option<&Node<C>> {
    self.search(self.codec.coord_to_key(coord)?)
  }

  /// Delete the subtree covering `key` at `depth` (0 means the finest
  /// depth). Pruned ancestors are expanded first so only the addressed
  /// region disappears; inner aggregates are refreshed on the way back up.
  ///
  /// Returns true when something was deleted.
  pub fn delete_node(&mut self, key: VoxelKey, depth: usize) -> bool {
    let depth = if depth == 0 { TREE_DEPTH } else { depth.min(TREE_DEPTH) };
    if self.is_empty() {
      return false;
    }
    let key = key.at_depth(depth);
    let (deleted, delete_root) = Self::delete_recurs(&mut self.root, key, 0, depth);
    if delete_root {
      // The last populated branch under the root is gone.
      self.clear();
    }
    deleted
  }

  /// Delete the subtree covering a world coordinate. No-op out of range.
  pub fn delete_node_coord(&mut self, coord: Vec3, depth: usize) -> bool {
    match self.codec.coord_to_key(coord) {
      Some(key) => self.delete_node(key, depth),
      None => false,
    }
  }

  /// Returns `(something_deleted, caller_should_delete_node)`.
  fn delete_recurs(node: &mut Node<C>, key: VoxelKey, depth: usize, target: usize) -> (bool, bool) {
    if depth == target {
      return (true, true);
    }
    let octant = key.child_index(depth);
    if node.child(octant).is_none() {
      if node.has_children() {
        // Sibling branches exist but the addressed region does not.
        return (false, false);
      }
      // Pruned leaf: materialize the children so deletion stays exact.
      node.expand();
    }
    let (deleted, delete_child) =
      Self::delete_recurs(node.child_mut(octant).expect("ensured above"), key, depth + 1, target);
    if delete_child {
      node.delete_child(octant);
      if !node.has_children() {
        return (deleted, true);
      }
      node.update_from_children();
    }
    (deleted, false)
  }

  /// Collapse every uniform subtree (post-order, lossless, idempotent).
  ///
  /// The root itself is left uncollapsed.
  pub fn prune(&mut self) {
    Self::prune_recurs(&mut self.root, 0);
  }

  fn prune_recurs(node: &mut Node<C>, depth: usize) {
    if !node.has_children() {
      return;
    }
    for octant in 0..8 {
      if let Some(child) = node.child_mut(octant) {
        Self::prune_recurs(child, depth + 1);
      }
    }
    if depth > 0 {
      node.prune();
    }
  }

  /// Pre-order iterator over leaves, yielding the masked key and depth of
  /// each.
  pub fn iter_leaves(&self) -> LeafIter<'_, C> {
    let mut stack = SmallVec::new();
    if !self.is_empty() {
      stack.push((&self.root, VoxelKey::new(0, 0, 0), 0usize));
    }
    LeafIter { stack }
  }

  /// Total node count, including the root and inner nodes.
  pub fn size(&self) -> usize {
    fn count<C: OccupancyCell>(node: &Node<C>) -> usize {
      let mut n = 1;
      for octant in 0..8 {
        if let Some(child) = node.child(octant) {
          n += count(child);
        }
      }
      n
    }
    count(&self.root)
  }

  /// Number of leaves.
  pub fn num_leaf_nodes(&self) -> usize {
    self.iter_leaves().count()
  }

  /// Rough heap footprint of all nodes in bytes.
  pub fn memory_usage(&self) -> usize {
    let node_size = std::mem::size_of::<Node<C>>();
    let slots_size = std::mem::size_of::<[Option<Box<Node<C>>>; 8]>();
    fn inner_count<C: OccupancyCell>(node: &Node<C>) -> usize {
      if !node.has_children() {
        return 0;
      }
      let mut n = 1;
      for octant in 0..8 {
        if let Some(child) = node.child(octant) {
          n += inner_count(child);
        }
      }
      n
    }
    self.size() * node_size + inner_count(&self.root) * slots_size
  }

  /// Minimum corner of the axis-aligned extent of all mapped leaves, or
  /// `None` for an empty tree.
  pub fn metric_min(&self) -> Option<Vec3> {
    self.metric_bounds().map(|(min, _)| min)
  }

  /// Maximum corner of the axis-aligned extent of all mapped leaves.
  pub fn metric_max(&self) -> Option<Vec3> {
    self.metric_bounds().map(|(_, max)| max)
  }

  /// Extent of all mapped leaves (`max - min`).
  pub fn metric_size(&self) -> Option<Vec3> {
    self.metric_bounds().map(|(min, max)| max - min)
  }

  /// Volume of the mapped extent in cubic meters (zero when empty).
  pub fn volume(&self) -> f64 {
    match self.metric_size() {
      Some(size) => size.x as f64 * size.y as f64 * size.z as f64,
      None => 0.0,
    }
  }

  /// Min/max corners over all mapped leaves, including each leaf's own
  /// extent.
  pub fn metric_bounds(&self) -> Option<(Vec3, Vec3)> {
    let mut bounds: Option<(Vec3, Vec3)> = None;
    for leaf in self.iter_leaves() {
      let half = (self.codec.node_size(leaf.depth) * 0.5) as f32;
      let center = self.codec.key_to_coord_at_depth(leaf.key, leaf.depth);
      let lo = center - Vec3::splat(half);
      let hi = center + Vec3::splat(half);
      bounds = Some(match bounds {
        Some((min, max)) => (min.min(lo), max.max(hi)),
        None => (lo, hi),
      });
    }
    bounds
  }
}

/// Leaf yielded by [`OcTree::iter_leaves`].
pub struct LeafEntry<'a, C> {
  /// Masked key of the leaf at its depth.
  pub key: VoxelKey,
  /// Depth of the leaf (16 for finest-resolution voxels).
  pub depth: usize,
  /// The leaf node.
  pub node: &'a Node<C>,
}

/// Pre-order leaf iterator with an explicit stack.
pub struct LeafIter<'a, C: OccupancyCell> {
  stack: SmallVec<[(&'a Node<C>, VoxelKey, usize); 32]>,
}

impl<'a, C: OccupancyCell> Iterator for LeafIter<'a, C> {
  type Item = LeafEntry<'a, C>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some((node, key, depth)) = self.stack.pop() {
      if !node.has_children() {
        return Some(LeafEntry { key, depth, node });
      }
      // Reverse slot order so octant 0 is visited first.
      for octant in (0..8).rev() {
        if let Some(child) = node.child(octant) {
          self.stack.push((child, key.child_key(depth, octant), depth + 1));
        }
      }
    }
    None
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
