//! Tree nodes: one payload plus eight owned child slots.
//!
//! A node is a leaf iff all eight slots are empty; the slot array itself is
//! allocated lazily on the first child. Child slots are indexed by the
//! octant bit pattern x = bit 0, y = bit 1, z = bit 2 of the key bit at the
//! node's depth.

use crate::cell::OccupancyCell;

/// Child slot array, allocated on first use.
type ChildSlots<C> = Box<[Option<Box<Node<C>>>; 8]>;

/// One octree node.
#[derive(Clone, Debug)]
pub struct Node<C> {
  cell: C,
  children: Option<ChildSlots<C>>,
}

impl<C: OccupancyCell> Default for Node<C> {
  fn default() -> Self {
    Self {
      cell: C::default(),
      children: None,
    }
  }
}

impl<C: OccupancyCell> Node<C> {
  /// Create a leaf node holding `cell`.
  pub fn new(cell: C) -> Self {
    Self {
      cell,
      children: None,
    }
  }

  /// Payload of this node.
  #[inline]
  pub fn cell(&self) -> &C {
    &self.cell
  }

  /// Mutable payload of this node.
  #[inline]
  pub fn cell_mut(&mut self) -> &mut C {
    &mut self.cell
  }

  /// Log-odds value of the payload.
  #[inline]
  pub fn log_odds(&self) -> f32 {
    self.cell.log_odds()
  }

  /// Overwrite the payload's log-odds value.
  #[inline]
  pub fn set_log_odds(&mut self, value: f32) {
    self.cell.set_log_odds(value);
  }

  /// True iff at least one child slot is occupied.
  #[inline]
  pub fn has_children(&self) -> bool {
    match &self.children {
      Some(slots) => slots.iter().any(Option::is_some),
      None => false,
    }
  }

  /// Child in slot `octant`, if present.
  #[inline]
  pub fn child(&self, octant: usize) -> Option<&Node<C>> {
    self.children.as_ref()?[octant].as_deref()
  }

  /// Mutable child in slot `octant`, if present.
  #[inline]
  pub fn child_mut(&mut self, octant: usize) -> Option<&mut Node<C>> {
    self.children.as_mut()?[octant].as_deref_mut()
  }

  /// Create the child in slot `octant` with a default payload.
  ///
  /// # Panics
  /// Panics if the slot is already occupied.
  pub fn create_child(&mut self, octant: usize) -> &mut Node<C> {
    let slots = self
      .children
      .get_or_insert_with(|| Box::new(std::array::from_fn(|_| None)));
    assert!(slots[octant].is_none(), "child slot {octant} already exists");
    slots[octant] = Some(Box::new(Node::default()));
    slots[octant].as_deref_mut().expect("just created")
  }

  /// Delete the child in slot `octant` together with its subtree.
  pub fn delete_child(&mut self, octant: usize) {
    if let Some(slots) = self.children.as_mut() {
      slots[octant] = None;
    }
  }

  /// Turn a pruned leaf back into an inner node: create all eight children,
  /// each inheriting a copy of this node's payload.
  pub fn expand(&mut self) {
    debug_assert!(!self.has_children());
    let slots = self
      .children
      .get_or_insert_with(|| Box::new(std::array::from_fn(|_| None)));
    for slot in slots.iter_mut() {
      *slot = Some(Box::new(Node::new(self.cell.clone())));
    }
  }

  /// True iff all eight children exist, are leaves, and carry equal
  /// payloads.
  pub fn children_identical(&self) -> bool {
    let Some(slots) = self.children.as_ref() else {
      return false;
    };
    let Some(first) = slots[0].as_deref() else {
      return false;
    };
    if first.has_children() {
      return false;
    }
    slots[1..].iter().all(|slot| {
      slot
        .as_deref()
        .is_some_and(|child| !child.has_children() && child.cell == first.cell)
    })
  }

  /// Collapse eight identical leaf children into this node.
  ///
  /// Returns true and deletes the children when [`children_identical`]
  /// holds; the node adopts the shared child payload and becomes a leaf.
  ///
  /// [`children_identical`]: Node::children_identical
  pub fn prune(&mut self) -> bool {
    if !self.children_identical() {
      return false;
    }
    let slots = *self.children.take().expect("children checked above");
    let first = slots.into_iter().next().flatten().expect("slot 0 checked above");
    self.cell = first.cell;
    true
  }

  /// Maximum log-odds over the existing children.
  ///
  /// Returns negative infinity for a leaf.
  pub fn max_child_log_odds(&self) -> f32 {
    let mut max = f32::NEG_INFINITY;
    if let Some(slots) = self.children.as_ref() {
      for child in slots.iter().flatten() {
        max = max.max(child.log_odds());
      }
    }
    max
  }

  /// Refresh this node's payload from its children (maximum rule): an
  /// occupied sub-voxel must stay visible at coarser resolution.
  #[inline]
  pub fn update_from_children(&mut self) {
    if self.has_children() {
      let max = self.max_child_log_odds();
      self.cell.set_log_odds(max);
    }
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
