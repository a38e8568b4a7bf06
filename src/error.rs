//! Filepath: src/error.rs
//!
//! Error types for tree construction and leaf operations.

use thiserror::Error as ThisError;

/// Result type for [`Mindicator`](crate::Mindicator) operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from validating a `(width, depth)` tree shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum ShapeError {
    /// Width (children per node) must be at least 1.
    #[error("tree width must be at least 1")]
    ZeroWidth,

    /// Depth must be at least 1.
    #[error("tree depth must be at least 1")]
    ZeroDepth,

    /// The node count overflows or exceeds [`MAX_NODES`](crate::shape::MAX_NODES).
    #[error("tree shape {width}x{depth} has too many nodes")]
    TooLarge {
        /// Requested width.
        width: usize,
        /// Requested depth.
        depth: usize,
    },
}

/// Errors returned by leaf operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Invalid tree shape.
    #[error("invalid shape: {0}")]
    Shape(#[from] ShapeError),

    /// Leaf slot is not in `[0, max_leaves)`.
    #[error("leaf index {index} out of bounds (max leaves: {max_leaves})")]
    LeafOutOfBounds {
        /// Requested leaf slot.
        index: usize,
        /// Number of leaf slots in the tree.
        max_leaves: usize,
    },

    /// The sentinel [`INFINITY`](crate::INFINITY) cannot be published.
    #[error("cannot arrive with the sentinel timestamp")]
    SentinelTimestamp,
}

/// An internal node whose value is not the minimum of its children.
///
/// Returned by [`Mindicator::validate`](crate::Mindicator::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("node {node} holds {value} but the minimum of its children is {min_child}")]
pub struct InvariantViolation {
    /// Node index in the tree array.
    pub node: usize,
    /// Value stored at the node.
    pub value: i32,
    /// Minimum over the node's children.
    pub min_child: i32,
}
