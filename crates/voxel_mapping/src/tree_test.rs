use glam::Vec3;

use super::*;
use crate::cell::LogOddsCell;

type Tree = OcTree<LogOddsCell>;

/// Insert a value at the finest depth by walking the key path down,
/// bypassing the occupancy update machinery.
fn insert_raw(tree: &mut Tree, key: VoxelKey, value: f32) {
  let mut node = tree.root_mut();
  for depth in 0..TREE_DEPTH {
    let octant = key.child_index(depth);
    if node.child(octant).is_none() {
      node.create_child(octant);
    }
    node = node.child_mut(octant).unwrap();
  }
  node.set_log_odds(value);
}

/// A fresh tree is empty, searches report unknown.
#[test]
fn test_empty_tree() {
  let tree = Tree::new(0.1);

  assert!(tree.is_empty());
  assert!(tree.search(VoxelKey::origin()).is_none());
  assert!(tree.search_coord(Vec3::ZERO).is_none());
  assert_eq!(tree.num_leaf_nodes(), 0);
  assert_eq!(tree.size(), 1, "the root always exists");
  assert!(tree.metric_bounds().is_none());
}

/// Search finds exactly the inserted voxel, neighbors stay unknown.
#[test]
fn test_search_finds_inserted_leaf() {
  let mut tree = Tree::new(0.1);
  let key = VoxelKey::origin();
  insert_raw(&mut tree, key, 0.9);

  let node = tree.search(key).expect("inserted voxel");
  assert_eq!(node.log_odds(), 0.9);

  assert!(tree.search(VoxelKey::new(32769, 32768, 32768)).is_none());
}

/// Out-of-range coordinates report unknown instead of corrupting anything.
#[test]
fn test_search_coord_out_of_range() {
  let mut tree = Tree::new(0.1);
  insert_raw(&mut tree, VoxelKey::origin(), 0.5);

  assert!(tree.search_coord(Vec3::new(1e9, 0.0, 0.0)).is_none());
  assert_eq!(tree.num_leaf_nodes(), 1);
}

/// Searching below a pruned region returns the pruned leaf.
#[test]
fn test_search_returns_pruned_region_leaf() {
  let mut tree = Tree::new(0.1);
  let base = VoxelKey::origin();

  // Build eight identical siblings, collapse them.
  for octant in 0..8 {
    let key = base.at_depth(TREE_DEPTH - 1).child_key(TREE_DEPTH - 1, octant);
    insert_raw(&mut tree, key, 1.25);
  }
  tree.prune();

  // Any of the eight finest keys resolves to the collapsed parent.
  let node = tree.search(base).expect("covered by pruned region");
  assert_eq!(node.log_odds(), 1.25);
  assert!(!node.has_children());
}

/// Pruning is lossless: every key resolves to the same value before and
/// after, and it is idempotent.
#[test]
fn test_prune_lossless() {
  let mut tree = Tree::new(0.1);
  let base = VoxelKey::origin().at_depth(TREE_DEPTH - 1);

  for octant in 0..8 {
    insert_raw(&mut tree, base.child_key(TREE_DEPTH - 1, octant), 0.75);
  }
  // A second, non-uniform sibling group.
  let other = VoxelKey::new(32770, 32768, 32768).at_depth(TREE_DEPTH - 1);
  for octant in 0..8 {
    insert_raw(&mut tree, other.child_key(TREE_DEPTH - 1, octant), octant as f32);
  }

  let keys: Vec<VoxelKey> = (0..8)
    .map(|octant| base.child_key(TREE_DEPTH - 1, octant))
    .chain((0..8).map(|octant| other.child_key(TREE_DEPTH - 1, octant)))
    .collect();
  let before: Vec<f32> = keys.iter().map(|k| tree.search(*k).unwrap().log_odds()).collect();

  let leaves_before = tree.num_leaf_nodes();
  tree.prune();
  let leaves_after = tree.num_leaf_nodes();
  assert_eq!(leaves_before, 16);
  assert_eq!(leaves_after, 9, "only the uniform group collapses");

  let after: Vec<f32> = keys.iter().map(|k| tree.search(*k).unwrap().log_odds()).collect();
  assert_eq!(before, after);

  // Idempotent.
  tree.prune();
  assert_eq!(tree.num_leaf_nodes(), 9);
}

/// Deleting a voxel in a pruned region keeps the siblings' value.
#[test]
fn test_delete_node_expands_pruned_region() {
  let mut tree = Tree::new(0.1);
  let base = VoxelKey::origin().at_depth(TREE_DEPTH - 1);
  for octant in 0..8 {
    insert_raw(&mut tree, base.child_key(TREE_DEPTH - 1, octant), 0.6);
  }
  tree.prune();
  assert_eq!(tree.num_leaf_nodes(), 1);

  let victim = base.child_key(TREE_DEPTH - 1, 3);
  assert!(tree.delete_node(victim, 0));

  assert!(tree.search(victim).is_none(), "deleted voxel is unknown");
  for octant in [0, 1, 2, 4, 5, 6, 7] {
    let sibling = base.child_key(TREE_DEPTH - 1, octant);
    assert_eq!(
      tree.search(sibling).unwrap().log_odds(),
      0.6,
      "sibling {} must keep its value",
      octant
    );
  }
}

/// Deleting the only branch leaves an empty tree.
#[test]
fn test_delete_last_branch_clears() {
  let mut tree = Tree::new(0.1);
  insert_raw(&mut tree, VoxelKey::origin(), 0.5);

  assert!(tree.delete_node(VoxelKey::origin(), 0));
  assert!(tree.is_empty());
}

/// Deleting an unknown region reports nothing deleted.
#[test]
fn test_delete_unknown_region() {
  let mut tree = Tree::new(0.1);
  insert_raw(&mut tree, VoxelKey::origin(), 0.5);

  assert!(!tree.delete_node(VoxelKey::new(100, 100, 100), 0));
  assert_eq!(tree.num_leaf_nodes(), 1);
}

/// The leaf iterator visits every leaf exactly once, pre-order, with the
/// right depths.
#[test]
fn test_leaf_iterator() {
  let mut tree = Tree::new(0.1);
  let keys = [
    VoxelKey::origin(),
    VoxelKey::new(32769, 32768, 32768),
    VoxelKey::new(40000, 20000, 60000),
  ];
  for (i, key) in keys.iter().enumerate() {
    insert_raw(&mut tree, *key, i as f32);
  }

  let leaves: Vec<_> = tree.iter_leaves().collect();
  assert_eq!(leaves.len(), 3);
  for leaf in &leaves {
    assert_eq!(leaf.depth, TREE_DEPTH);
    assert!(keys.contains(&leaf.key), "unexpected leaf key {:?}", leaf.key);
  }
}

/// After pruning, the iterator reports the collapsed leaf at its coarser
/// depth with the masked key.
#[test]
fn test_leaf_iterator_after_prune() {
  let mut tree = Tree::new(0.1);
  let base = VoxelKey::origin().at_depth(TREE_DEPTH - 1);
  for octant in 0..8 {
    insert_raw(&mut tree, base.child_key(TREE_DEPTH - 1, octant), 0.3);
  }
  tree.prune();

  let leaves: Vec<_> = tree.iter_leaves().collect();
  assert_eq!(leaves.len(), 1);
  assert_eq!(leaves[0].depth, TREE_DEPTH - 1);
  assert_eq!(leaves[0].key, base);
}

/// Node counts track structure.
#[test]
fn test_size_counts() {
  let mut tree = Tree::new(0.1);
  assert_eq!(tree.size(), 1);

  insert_raw(&mut tree, VoxelKey::origin(), 0.5);
  // Root + one node per level.
  assert_eq!(tree.size(), 1 + TREE_DEPTH);
  assert_eq!(tree.num_leaf_nodes(), 1);
  assert!(tree.memory_usage() > 0);
}

/// Metric bounds cover the leaf extents.
#[test]
fn test_metric_bounds() {
  let mut tree = Tree::new(0.1);
  insert_raw(&mut tree, VoxelKey::origin(), 0.5);

  let (min, max) = tree.metric_bounds().expect("one leaf mapped");
  // A single voxel centered at the origin with 0.1 edge length.
  assert!(min.x <= -0.049 && min.x >= -0.051);
  assert!(max.x >= 0.049 && max.x <= 0.051);
  assert_eq!(tree.metric_size().unwrap(), max - min);
}

/// search_mut reaches the same nodes as search.
#[test]
fn test_search_mut() {
  let mut tree = Tree::new(0.1);
  insert_raw(&mut tree, VoxelKey::origin(), 0.5);

  tree.search_mut(VoxelKey::origin()).unwrap().set_log_odds(0.9);
  assert_eq!(tree.search(VoxelKey::origin()).unwrap().log_odds(), 0.9);
  assert!(tree.search_mut(VoxelKey::new(0, 0, 0)).is_none());
}
