use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::*;

/// Two keys with the same components should be equal, any differing
/// component breaks equality.
#[test]
fn test_key_equality() {
  let a = VoxelKey::new(1, 2, 3);
  let b = VoxelKey::new(1, 2, 3);
  let c = VoxelKey::new(1, 2, 4);

  assert_eq!(a, b);
  assert_ne!(a, c);
}

/// Equal keys must produce equal hashes (hash set invariant).
#[test]
fn test_key_hash_consistency() {
  let a = VoxelKey::new(100, 200, 300);
  let b = VoxelKey::new(100, 200, 300);

  let hash = |key: &VoxelKey| {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
  };

  assert_eq!(hash(&a), hash(&b), "Equal keys must have equal hashes");
}

/// Keys sharing a low 16-bit pattern across axes must not collide: the hash
/// input packs the axes into disjoint bit ranges.
#[test]
fn test_key_hash_axis_separation() {
  let mut set = KeySet::default();
  set.insert(VoxelKey::new(1, 0, 0));
  set.insert(VoxelKey::new(0, 1, 0));
  set.insert(VoxelKey::new(0, 0, 1));
  assert_eq!(set.len(), 3);
}

/// Masking at the finest depth is the identity.
#[test]
fn test_at_depth_finest_is_identity() {
  let key = VoxelKey::new(0xabcd, 0x1234, 0xffff);
  assert_eq!(key.at_depth(TREE_DEPTH), key);
}

/// Masking zeroes exactly the low `TREE_DEPTH - depth` bits.
#[test]
fn test_at_depth_masks_low_bits() {
  let key = VoxelKey::new(0xffff, 0xffff, 0xffff);

  assert_eq!(key.at_depth(15), VoxelKey::new(0xfffe, 0xfffe, 0xfffe));
  assert_eq!(key.at_depth(8), VoxelKey::new(0xff00, 0xff00, 0xff00));
  assert_eq!(key.at_depth(0), VoxelKey::new(0, 0, 0));
}

/// child_index(child_key(k, d, i), d) == i for every octant and depth.
#[test]
fn test_child_key_child_index_roundtrip() {
  for depth in 0..TREE_DEPTH {
    let parent = VoxelKey::new(0x8000, 0x8000, 0x8000).at_depth(depth);
    for octant in 0..8 {
      let child = parent.child_key(depth, octant);
      assert_eq!(
        child.child_index(depth),
        octant,
        "Roundtrip failed at depth {} octant {}",
        depth,
        octant
      );
    }
  }
}

/// The child key keeps the parent's high bits.
#[test]
fn test_child_key_preserves_parent_bits() {
  let parent = VoxelKey::new(0x8000, 0x4000, 0xc000);
  for octant in 0..8 {
    let child = parent.child_key(0, octant);
    assert_eq!(child.at_depth(0), VoxelKey::new(0, 0, 0).at_depth(0));
    for axis in 0..3 {
      // Only bit 15 may differ at depth 0.
      assert_eq!(child[axis] & 0x7fff, parent[axis] & 0x7fff);
    }
  }
}

/// Octant bits map to axes as x = bit 0, y = bit 1, z = bit 2.
#[test]
fn test_child_index_axis_bits() {
  let depth = TREE_DEPTH - 1;
  let base = VoxelKey::new(0, 0, 0);

  assert_eq!(base.child_key(depth, 0b001), VoxelKey::new(1, 0, 0));
  assert_eq!(base.child_key(depth, 0b010), VoxelKey::new(0, 1, 0));
  assert_eq!(base.child_key(depth, 0b100), VoxelKey::new(0, 0, 1));

  assert_eq!(VoxelKey::new(1, 0, 0).child_index(depth), 0b001);
  assert_eq!(VoxelKey::new(0, 1, 0).child_index(depth), 0b010);
  assert_eq!(VoxelKey::new(0, 0, 1).child_index(depth), 0b100);
}

/// The origin key sits at 2^15 on every axis.
#[test]
fn test_origin_key() {
  assert_eq!(VoxelKey::origin(), VoxelKey::new(32768, 32768, 32768));
}
