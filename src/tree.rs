//! Filepath: src/tree.rs
//! `Mindicator` - a minimum-tracking tree behind one tree-wide lock.
//!
//! This module provides the main [`Mindicator<R>`] type and the [`Leaf`]
//! handle returned by [`Mindicator::leaf`].

use std::fmt as StdFmt;
use std::sync::atomic::AtomicI32;

use parking_lot::lock_api::{Mutex, MutexGuard, RawMutex};

use crate::INFINITY;
use crate::error::{Error, InvariantViolation, Result};
use crate::lock::TatasLock;
use crate::ordering::{LOCKED_READ, LOCKED_WRITE, RELAXED_QUERY};
use crate::propagate::{self, Slots};
use crate::shape::TreeShape;
use crate::tracing_helpers::{debug_log, trace_log};


// ============================================================================
//  Node
// ============================================================================

/// One tree slot. Written only under the tree lock.
#[derive(Debug)]
struct Node {
    value: AtomicI32,
}

impl Node {
    const fn empty() -> Self {
        Self {
            value: AtomicI32::new(INFINITY),
        }
    }
}

/// Node array viewed through a held tree lock.
///
/// The guard is the proof that walks over this view are exclusive.
struct LockedNodes<'a, R: RawMutex> {
    nodes: &'a [Node],
    _guard: MutexGuard<'a, R, ()>,
}

impl<R: RawMutex> Slots for LockedNodes<'_, R> {
    #[inline]
    fn get(&self, node: usize) -> i32 {
        self.nodes[node].value.load(LOCKED_READ)
    }

    #[inline]
    fn set(&mut self, node: usize, value: i32) {
        self.nodes[node].value.store(value, LOCKED_WRITE);
    }
}

// ============================================================================
//  Mindicator
// ============================================================================

/// A Mindicator tree with a coarse-grained lock.
///
/// Every leaf slot belongs to one participant. [`arrive`](Self::arrive)
/// publishes a timestamp at a slot, [`depart`](Self::depart) retracts it, and
/// [`query`](Self::query) returns the smallest timestamp currently published,
/// or [`INFINITY`] when no slot is active.
///
/// `R` is the raw lock protecting the whole tree. It defaults to the
/// [`TatasLock`] spin lock; [`ParkingMindicator`] uses `parking_lot`'s mutex.
///
/// # Thread Safety
/// `Mindicator<R>` is `Send + Sync`. Arrive, depart and `query` take the tree
/// lock for their full duration and are linearizable in lock order. A caller
/// that panics inside the critical section releases the lock on unwind; a
/// process that stops while holding it (abort, infinite loop) deadlocks every
/// later caller.
///
/// # Example
///
/// ```rust
/// use mindicator::{INFINITY, Mindicator};
///
/// let tree = Mindicator::new(2, 3)?;
/// assert_eq!(tree.query(), INFINITY);
///
/// tree.arrive(0, 5)?;
/// tree.arrive(2, 3)?;
/// assert_eq!(tree.query(), 3);
///
/// tree.depart(2)?;
/// assert_eq!(tree.query(), 5);
/// # Ok::<(), mindicator::Error>(())
/// ```
pub struct Mindicator<R: RawMutex = TatasLock> {
    shape: TreeShape,
    nodes: Box<[Node]>,
    lock: Mutex<R, ()>,
}

/// A [`Mindicator`] locked by [`parking_lot::RawMutex`].
pub type ParkingMindicator = Mindicator<parking_lot::RawMutex>;

impl Mindicator<TatasLock> {
    /// Create a tree of the given width and depth with every slot empty.
    ///
    /// # Errors
    /// [`Error::Shape`] if the shape is invalid. See [`TreeShape::new`].
    pub fn new(width: usize, depth: usize) -> Result<Self> {
        Self::with_lock(width, depth)
    }
}

impl<R: RawMutex> Mindicator<R> {
    /// Create a tree locked by `R`.
    ///
    /// # Errors
    /// [`Error::Shape`] if the shape is invalid. See [`TreeShape::new`].
    pub fn with_lock(width: usize, depth: usize) -> Result<Self> {
        let shape = TreeShape::new(width, depth)?;
        Ok(Self::from_shape(shape))
    }

    /// Create a tree from an already validated shape.
    #[must_use]
    pub fn from_shape(shape: TreeShape) -> Self {
        let nodes: Box<[Node]> = (0..shape.num_nodes()).map(|_| Node::empty()).collect();

        debug_log!(
            width = shape.width(),
            depth = shape.depth(),
            num_nodes = shape.num_nodes(),
            "mindicator created"
        );

        Self {
            shape,
            nodes,
            lock: Mutex::new(()),
        }
    }

    // ========================================================================
    //  Shape accessors
    // ========================================================================

    /// The validated tree shape.
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> &TreeShape {
        &self.shape
    }

    /// Children per internal node.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.shape.width()
    }

    /// Number of levels.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.shape.depth()
    }

    /// Number of leaf slots.
    #[inline]
    #[must_use]
    pub const fn max_leaves(&self) -> usize {
        self.shape.max_leaves()
    }

    /// Total node count.
    #[inline]
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.shape.num_nodes()
    }

    // ========================================================================
    //  Navigation
    // ========================================================================

    /// Check if `node` is the root.
    #[inline]
    #[must_use]
    pub const fn is_root(&self, node: usize) -> bool {
        self.shape.is_root(node)
    }

    /// Check if `node` is a leaf.
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self, node: usize) -> bool {
        self.shape.is_leaf(node)
    }

    /// Parent of `node`, `None` for the root.
    #[inline]
    #[must_use]
    pub const fn parent(&self, node: usize) -> Option<usize> {
        self.shape.parent(node)
    }

    /// First child of `node`, `None` for leaves.
    #[inline]
    #[must_use]
    pub const fn first_child(&self, node: usize) -> Option<usize> {
        self.shape.first_child(node)
    }

    /// Children of `node`. Empty for leaves.
    #[inline]
    #[must_use]
    pub const fn children(&self, node: usize) -> std::ops::Range<usize> {
        self.shape.children(node)
    }

    /// Array index of leaf slot `slot`.
    #[inline]
    #[must_use]
    pub const fn leaf_node(&self, slot: usize) -> Option<usize> {
        self.shape.leaf_node(slot)
    }

    // ========================================================================
    //  Operations
    // ========================================================================

    /// Handle bound to leaf slot `index`.
    ///
    /// # Errors
    /// [`Error::LeafOutOfBounds`] if `index >= max_leaves()`.
    pub fn leaf(&self, index: usize) -> Result<Leaf<'_, R>> {
        let node = self.checked_leaf(index)?;

        Ok(Leaf {
            tree: self,
            slot: index,
            node,
        })
    }

    /// Publish timestamp `n` at leaf slot `index`.
    ///
    /// Only ever lowers values. Publishing a value larger than the one already
    /// at the slot changes nothing; depart first to raise it.
    ///
    /// # Errors
    /// [`Error::LeafOutOfBounds`] for a bad slot, [`Error::SentinelTimestamp`]
    /// if `n == INFINITY`. Nothing is modified on error.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self), err))]
    pub fn arrive(&self, index: usize, n: i32) -> Result<()> {
        let node = self.checked_leaf(index)?;
        Self::check_timestamp(n)?;

        self.arrive_at(node, n);
        Ok(())
    }

    /// Retract the timestamp at leaf slot `index`.
    ///
    /// Departing an empty slot is allowed and changes nothing.
    ///
    /// # Errors
    /// [`Error::LeafOutOfBounds`] for a bad slot.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self), err))]
    pub fn depart(&self, index: usize) -> Result<()> {
        let node = self.checked_leaf(index)?;

        self.depart_at(node);
        Ok(())
    }

    /// Smallest published timestamp, or [`INFINITY`] if no slot is active.
    ///
    /// Takes the tree lock, so the result reflects every operation that
    /// acquired the lock before this call.
    #[must_use]
    pub fn query(&self) -> i32 {
        let locked = self.locked();
        locked.get(0)
    }

    /// Read the root without the tree lock.
    ///
    /// The value was held by the root at some point no earlier than the last
    /// operation whose lock release happened-before this call. It may be an
    /// intermediate value of an operation still in flight.
    #[inline]
    #[must_use]
    pub fn query_relaxed(&self) -> i32 {
        self.nodes[0].value.load(RELAXED_QUERY)
    }

    /// Check if no slot is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query() == INFINITY
    }

    /// Reset every node to [`INFINITY`].
    pub fn reset(&mut self) {
        for node in &mut *self.nodes {
            *node.value.get_mut() = INFINITY;
        }
    }

    // ========================================================================
    //  Introspection
    // ========================================================================

    /// Value of array node `node`, read without the lock.
    #[must_use]
    pub fn node_value(&self, node: usize) -> Option<i32> {
        self.nodes.get(node).map(|n| n.value.load(RELAXED_QUERY))
    }

    /// Value at leaf slot `index`, read without the lock.
    ///
    /// # Errors
    /// [`Error::LeafOutOfBounds`] for a bad slot.
    pub fn leaf_value(&self, index: usize) -> Result<i32> {
        let node = self.checked_leaf(index)?;
        Ok(self.nodes[node].value.load(RELAXED_QUERY))
    }

    /// All node values in array order, taken under the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<i32> {
        let locked = self.locked();
        (0..self.shape.num_nodes()).map(|node| locked.get(node)).collect()
    }

    /// Check that every internal node holds the minimum of its children.
    ///
    /// # Errors
    /// The first [`InvariantViolation`] in array order.
    pub fn validate(&self) -> std::result::Result<(), InvariantViolation> {
        let locked = self.locked();

        match propagate::find_violation(&self.shape, &locked) {
            None => Ok(()),
            Some((node, value, min_child)) => Err(InvariantViolation {
                node,
                value,
                min_child,
            }),
        }
    }

    // ========================================================================
    //  Internals
    // ========================================================================

    fn locked(&self) -> LockedNodes<'_, R> {
        LockedNodes {
            nodes: &self.nodes,
            _guard: self.lock.lock(),
        }
    }

    fn checked_leaf(&self, index: usize) -> Result<usize> {
        self.shape.leaf_node(index).ok_or(Error::LeafOutOfBounds {
            index,
            max_leaves: self.shape.max_leaves(),
        })
    }

    const fn check_timestamp(n: i32) -> Result<()> {
        if n == INFINITY {
            Err(Error::SentinelTimestamp)
        } else {
            Ok(())
        }
    }

    fn arrive_at(&self, node: usize, n: i32) {
        let mut locked = self.locked();
        let written = propagate::arrive_path(&self.shape, &mut locked, node, n);

        if written == 0 && locked.get(node) < n {
            debug_log!(node, n, "arrive: larger value ignored, depart first");
        }

        trace_log!(node, n, written, "arrive done");
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn depart_at(&self, node: usize) {
        let mut locked = self.locked();
        let written = propagate::depart_path(&self.shape, &mut locked, node);

        trace_log!(node, written, "depart done");
    }
}

impl<R: RawMutex> StdFmt::Debug for Mindicator<R> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Mindicator")
            .field("shape", &self.shape)
            .field("root", &self.query_relaxed())
            .field("locked", &self.lock.is_locked())
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Leaf
// ============================================================================

/// Borrowed handle to one leaf slot.
///
/// Obtained from [`Mindicator::leaf`]; the slot index is already validated.
pub struct Leaf<'a, R: RawMutex = TatasLock> {
    tree: &'a Mindicator<R>,
    slot: usize,
    node: usize,
}

impl<R: RawMutex> StdFmt::Debug for Leaf<'_, R> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Leaf")
            .field("slot", &self.slot)
            .field("node", &self.node)
            .field("value", &self.value())
            .finish()
    }
}

impl<R: RawMutex> Clone for Leaf<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: RawMutex> Copy for Leaf<'_, R> {}

impl<R: RawMutex> Leaf<'_, R> {
    /// Leaf slot index.
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Array index of the leaf node.
    #[inline]
    #[must_use]
    pub const fn node(&self) -> usize {
        self.node
    }

    /// Publish `n` at this slot. See [`Mindicator::arrive`].
    ///
    /// # Errors
    /// [`Error::SentinelTimestamp`] if `n == INFINITY`.
    pub fn arrive(&self, n: i32) -> Result<()> {
        Mindicator::<R>::check_timestamp(n)?;
        self.tree.arrive_at(self.node, n);
        Ok(())
    }

    /// Retract this slot's timestamp. See [`Mindicator::depart`].
    pub fn depart(&self) {
        self.tree.depart_at(self.node);
    }

    /// Value at this slot, read without the lock.
    #[must_use]
    pub fn value(&self) -> i32 {
        self.tree.nodes[self.node].value.load(RELAXED_QUERY)
    }
}
