use super::*;
use crate::cell::{LogOddsCell, OccupancyCell};

fn leaf(value: f32) -> Node<LogOddsCell> {
  Node::new(LogOddsCell::new(value))
}

/// A fresh node is a leaf with no child slots.
#[test]
fn test_new_node_is_leaf() {
  let node = leaf(0.5);
  assert!(!node.has_children());
  for octant in 0..8 {
    assert!(node.child(octant).is_none());
  }
}

/// Created children are reachable and independent per slot.
#[test]
fn test_create_and_delete_child() {
  let mut node = leaf(0.0);
  node.create_child(3).set_log_odds(1.0);

  assert!(node.has_children());
  assert_eq!(node.child(3).unwrap().log_odds(), 1.0);
  assert!(node.child(2).is_none());

  node.delete_child(3);
  assert!(!node.has_children());
}

/// Creating into an occupied slot is a programming error.
#[test]
#[should_panic(expected = "already exists")]
fn test_create_child_twice_panics() {
  let mut node = leaf(0.0);
  node.create_child(0);
  node.create_child(0);
}

/// Expanding copies the parent payload into all eight children.
#[test]
fn test_expand_inherits_value() {
  let mut node = leaf(2.5);
  node.expand();

  assert!(node.has_children());
  for octant in 0..8 {
    let child = node.child(octant).expect("expand creates all children");
    assert_eq!(child.log_odds(), 2.5);
    assert!(!child.has_children());
  }
}

/// children_identical holds only for eight equal leaf children.
#[test]
fn test_children_identical() {
  let mut node = leaf(0.0);
  assert!(!node.children_identical(), "leaf has no children");

  node.expand();
  assert!(node.children_identical());

  // A differing value breaks it.
  node.child_mut(5).unwrap().set_log_odds(-1.0);
  assert!(!node.children_identical());
  node.child_mut(5).unwrap().set_log_odds(0.0);
  assert!(node.children_identical());

  // A grandchild breaks it.
  node.child_mut(2).unwrap().create_child(0);
  assert!(!node.children_identical());
}

/// A missing child breaks children_identical.
#[test]
fn test_children_identical_requires_all_slots() {
  let mut node = leaf(0.0);
  for octant in 0..7 {
    node.create_child(octant);
  }
  assert!(!node.children_identical());
}

/// Pruning collapses eight identical leaves into the parent.
#[test]
fn test_prune_collapses() {
  let mut node = leaf(0.0);
  node.expand();
  for octant in 0..8 {
    node.child_mut(octant).unwrap().set_log_odds(1.5);
  }

  assert!(node.prune());
  assert!(!node.has_children());
  assert_eq!(node.log_odds(), 1.5);

  // Pruning a leaf is a no-op.
  assert!(!node.prune());
}

/// Pruning refuses a non-uniform set of children.
#[test]
fn test_prune_rejects_nonuniform() {
  let mut node = leaf(0.0);
  node.expand();
  node.child_mut(0).unwrap().set_log_odds(1.0);

  assert!(!node.prune());
  assert!(node.has_children());
}

/// The aggregate is the maximum over existing children.
#[test]
fn test_max_child_aggregation() {
  let mut node = leaf(0.0);
  node.create_child(0).set_log_odds(-2.0);
  node.create_child(4).set_log_odds(0.7);
  node.create_child(7).set_log_odds(-0.1);

  assert_eq!(node.max_child_log_odds(), 0.7);

  node.update_from_children();
  assert_eq!(node.log_odds(), 0.7);
}

/// update_from_children leaves a leaf untouched.
#[test]
fn test_update_from_children_on_leaf() {
  let mut node = leaf(0.42);
  node.update_from_children();
  assert_eq!(node.log_odds(), 0.42);
}
