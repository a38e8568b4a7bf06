//! Filepath: src/propagate.rs
//!
//! Leaf-to-root propagation for arrive and depart.
//!
//! Both walks maintain one invariant: every internal node holds the minimum of
//! its children. They run over any [`Slots`] storage, so the tree drives them
//! over its atomic node array while holding the lock, and tests drive the same
//! code over plain vectors.
//!
//! # Arrive
//! A smaller value can only lower ancestors, so it is copied upward until a
//! node already holds something `<=` it.
//!
//! # Depart
//! Removing a value can only raise ancestors, so each ancestor is recomputed
//! from all of its children. The walk stops at the first ancestor whose
//! recomputed value is unchanged.

use crate::INFINITY;
use crate::shape::TreeShape;

/// Indexed storage of node values.
///
/// Callers guarantee exclusive access for the duration of a walk.
pub trait Slots {
    /// Value of `node`.
    fn get(&self, node: usize) -> i32;

    /// Overwrite the value of `node`.
    fn set(&mut self, node: usize, value: i32);
}

impl Slots for [i32] {
    #[inline]
    fn get(&self, node: usize) -> i32 {
        self[node]
    }

    #[inline]
    fn set(&mut self, node: usize, value: i32) {
        self[node] = value;
    }
}

impl Slots for Vec<i32> {
    #[inline]
    fn get(&self, node: usize) -> i32 {
        self[node]
    }

    #[inline]
    fn set(&mut self, node: usize, value: i32) {
        self[node] = value;
    }
}

/// Minimum over the children of `node`, [`INFINITY`] for a leaf.
#[inline]
#[must_use]
pub fn min_of_children<S: Slots + ?Sized>(shape: &TreeShape, slots: &S, node: usize) -> i32 {
    shape
        .children(node)
        .map(|child| slots.get(child))
        .min()
        .unwrap_or(INFINITY)
}

/// Publish `n` starting at `leaf_node`. Returns the number of nodes written.
///
/// `leaf_node` is an array index, not a leaf slot.
///
/// # Panics
/// If `leaf_node` is not a leaf of `shape`.
pub fn arrive_path<S: Slots + ?Sized>(
    shape: &TreeShape,
    slots: &mut S,
    leaf_node: usize,
    n: i32,
) -> usize {
    assert!(shape.is_leaf(leaf_node), "arrive_path: {leaf_node} is not a leaf");

    let mut current: usize = leaf_node;
    let mut written: usize = 0;

    while n < slots.get(current) {
        slots.set(current, n);
        written += 1;

        match shape.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }

    written
}

/// Retract the value at `leaf_node`. Returns the number of nodes written.
///
/// The children scanned at each step belong to the node about to be
/// written, i.e. the parent reached after moving up.
///
/// # Panics
/// If `leaf_node` is not a leaf of `shape`.
pub fn depart_path<S: Slots + ?Sized>(shape: &TreeShape, slots: &mut S, leaf_node: usize) -> usize {
    assert!(shape.is_leaf(leaf_node), "depart_path: {leaf_node} is not a leaf");

    let mut current: usize = leaf_node;
    let mut replacement: i32 = INFINITY;
    let mut written: usize = 0;

    // INVARIANT: slots.get(current) <= replacement, since current held the
    // minimum of a set that has only lost members.
    while slots.get(current) < replacement {
        slots.set(current, replacement);
        written += 1;

        match shape.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }

        replacement = min_of_children(shape, slots, current);
    }

    written
}

/// First internal node that is not the minimum of its children.
#[must_use]
pub fn find_violation<S: Slots + ?Sized>(shape: &TreeShape, slots: &S) -> Option<(usize, i32, i32)> {
    (0..shape.first_leaf()).find_map(|node| {
        let value = slots.get(node);
        let min_child = min_of_children(shape, slots, node);
        (value != min_child).then_some((node, value, min_child))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(shape: &TreeShape) -> Vec<i32> {
        vec![INFINITY; shape.num_nodes()]
    }

    #[test]
    fn test_arrive_writes_whole_path_on_empty_tree() {
        let shape = TreeShape::new(2, 3).unwrap();
        let mut slots = empty(&shape);

        let written = arrive_path(&shape, &mut slots, 4, 9);

        assert_eq!(written, 3);
        assert_eq!(slots, vec![9, 9, INFINITY, INFINITY, 9, INFINITY, INFINITY]);
        assert_eq!(find_violation(&shape, &slots), None);
    }

    #[test]
    fn test_arrive_stops_at_smaller_ancestor() {
        let shape = TreeShape::new(2, 3).unwrap();
        let mut slots = empty(&shape);

        arrive_path(&shape, &mut slots, 3, 2);
        let written = arrive_path(&shape, &mut slots, 5, 6);

        // Leaf 5 and its parent 2 change; the root already holds 2.
        assert_eq!(written, 2);
        assert_eq!(slots[0], 2);
        assert_eq!(slots[2], 6);
        assert_eq!(find_violation(&shape, &slots), None);
    }

    #[test]
    fn test_arrive_larger_value_is_ignored() {
        let shape = TreeShape::new(2, 2).unwrap();
        let mut slots = empty(&shape);

        arrive_path(&shape, &mut slots, 1, 4);
        let written = arrive_path(&shape, &mut slots, 1, 8);

        assert_eq!(written, 0);
        assert_eq!(slots, vec![4, 4, INFINITY]);
    }

    #[test]
    fn test_depart_restores_sibling_minimum() {
        let shape = TreeShape::new(2, 3).unwrap();
        let mut slots = empty(&shape);

        arrive_path(&shape, &mut slots, 3, 5);
        arrive_path(&shape, &mut slots, 4, 1);
        depart_path(&shape, &mut slots, 4);

        assert_eq!(slots[4], INFINITY);
        assert_eq!(slots[1], 5);
        assert_eq!(slots[0], 5);
        assert_eq!(find_violation(&shape, &slots), None);
    }

    #[test]
    fn test_depart_stops_when_ancestor_unchanged() {
        let shape = TreeShape::new(2, 3).unwrap();
        let mut slots = empty(&shape);

        arrive_path(&shape, &mut slots, 3, 1);
        arrive_path(&shape, &mut slots, 5, 7);
        let written = depart_path(&shape, &mut slots, 5);

        // Leaf 5 and node 2 change; the root keeps 1.
        assert_eq!(written, 2);
        assert_eq!(slots[0], 1);
        assert_eq!(slots[2], INFINITY);
    }

    #[test]
    fn test_depart_on_empty_leaf_writes_nothing() {
        let shape = TreeShape::new(3, 3).unwrap();
        let mut slots = empty(&shape);

        assert_eq!(depart_path(&shape, &mut slots, shape.first_leaf()), 0);
        assert!(slots.iter().all(|&v| v == INFINITY));
    }

    #[test]
    fn test_single_node_tree() {
        let shape = TreeShape::new(4, 1).unwrap();
        let mut slots = empty(&shape);

        assert_eq!(arrive_path(&shape, &mut slots, 0, 3), 1);
        assert_eq!(slots, vec![3]);
        assert_eq!(depart_path(&shape, &mut slots, 0), 1);
        assert_eq!(slots, vec![INFINITY]);
    }

    #[test]
    fn test_find_violation_reports_node() {
        let shape = TreeShape::new(2, 2).unwrap();
        let slots = vec![1, 4, INFINITY];

        assert_eq!(find_violation(&shape, &slots), Some((0, 1, 4)));
    }

    #[test]
    #[should_panic(expected = "is not a leaf")]
    fn test_arrive_rejects_internal_node() {
        let shape = TreeShape::new(2, 3).unwrap();
        let mut slots = empty(&shape);

        arrive_path(&shape, &mut slots, 1, 4);
    }

    #[test]
    #[should_panic(expected = "is not a leaf")]
    fn test_depart_rejects_out_of_range_node() {
        let shape = TreeShape::new(2, 3).unwrap();
        let mut slots = empty(&shape);

        depart_path(&shape, &mut slots, shape.num_nodes());
    }

    #[test]
    fn test_min_of_children_of_leaf_is_infinity() {
        let shape = TreeShape::new(2, 2).unwrap();
        let slots = vec![0, 0, 0];

        assert_eq!(min_of_children(&shape, &slots, 1), INFINITY);
    }
}
