//! Filepath: src/shape.rs
//!
//! Shape of a complete W-ary tree laid out in one array.
//!
//! Index 0 is the root. Node `i > 0` has parent `(i - 1) / W` and node `i`
//! has children `i * W + 1 ..= i * W + W`. Leaves fill the last level:
//!
//! ```text
//! max_leaves = W^(D-1)
//! num_nodes  = 1 + W + ... + W^(D-1)
//! first_leaf = 1 + W + ... + W^(D-2)
//! ```

use std::ops::Range;

use crate::error::ShapeError;

/// Largest node count a [`TreeShape`] accepts.
pub const MAX_NODES: usize = 1 << 24;

// ============================================================================
//  Shape arithmetic
// ============================================================================

/// `base^exp`, or `None` on overflow.
#[must_use]
pub const fn power(base: usize, exp: usize) -> Option<usize> {
    let mut acc: usize = 1;
    let mut i: usize = 0;

    while i < exp {
        acc = match acc.checked_mul(base) {
            Some(v) => v,
            None => return None,
        };
        i += 1;
    }

    Some(acc)
}

/// `first + first*ratio + ... + first*ratio^(terms-1)`, or `None` on overflow.
#[must_use]
pub const fn geo_sum(first: usize, ratio: usize, terms: usize) -> Option<usize> {
    let mut sum: usize = 0;
    let mut term: usize = first;
    let mut i: usize = 0;

    while i < terms {
        sum = match sum.checked_add(term) {
            Some(v) => v,
            None => return None,
        };
        i += 1;
        if i < terms {
            term = match term.checked_mul(ratio) {
                Some(v) => v,
                None => return None,
            };
        }
    }

    Some(sum)
}

// ============================================================================
//  TreeShape
// ============================================================================

/// Validated `(width, depth)` with the derived node counts.
///
/// # Example
///
/// ```rust
/// use mindicator::shape::TreeShape;
///
/// let shape = TreeShape::new(2, 3).unwrap();
/// assert_eq!(shape.max_leaves(), 4);
/// assert_eq!(shape.num_nodes(), 7);
/// assert_eq!(shape.first_leaf(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeShape {
    width: usize,
    depth: usize,
    max_leaves: usize,
    num_nodes: usize,
    first_leaf: usize,
}

impl TreeShape {
    /// Validate a shape and compute its node counts.
    ///
    /// # Errors
    /// [`ShapeError::ZeroWidth`] or [`ShapeError::ZeroDepth`] for a zero
    /// parameter, [`ShapeError::TooLarge`] if the node count overflows or
    /// exceeds [`MAX_NODES`].
    pub const fn new(width: usize, depth: usize) -> Result<Self, ShapeError> {
        if width == 0 {
            return Err(ShapeError::ZeroWidth);
        }
        if depth == 0 {
            return Err(ShapeError::ZeroDepth);
        }

        let too_large = ShapeError::TooLarge { width, depth };

        // Every level holds at least one node, so this bounds both loops below.
        if depth > MAX_NODES {
            return Err(too_large);
        }

        let Some(max_leaves) = power(width, depth - 1) else {
            return Err(too_large);
        };
        let Some(num_nodes) = geo_sum(1, width, depth) else {
            return Err(too_large);
        };
        if num_nodes > MAX_NODES {
            return Err(too_large);
        }
        let first_leaf = num_nodes - max_leaves;

        Ok(Self {
            width,
            depth,
            max_leaves,
            num_nodes,
            first_leaf,
        })
    }

    /// Children per internal node.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of levels, counting the root.
    #[inline]
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaf slots, `W^(D-1)`.
    #[inline]
    #[must_use]
    pub const fn max_leaves(&self) -> usize {
        self.max_leaves
    }

    /// Total node count.
    #[inline]
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Array index of leaf slot 0.
    #[inline]
    #[must_use]
    pub const fn first_leaf(&self) -> usize {
        self.first_leaf
    }

    // ========================================================================
    //  Navigation
    // ========================================================================

    /// Check if `node` is the root.
    #[inline]
    #[must_use]
    pub const fn is_root(&self, node: usize) -> bool {
        node == 0
    }

    /// Check if `node` is a leaf.
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self, node: usize) -> bool {
        self.first_leaf <= node && node < self.num_nodes
    }

    /// Parent of `node`, `None` for the root.
    #[inline]
    #[must_use]
    pub const fn parent(&self, node: usize) -> Option<usize> {
        if node == 0 {
            None
        } else {
            Some((node - 1) / self.width)
        }
    }

    /// First child of `node`, `None` for leaves.
    #[inline]
    #[must_use]
    pub const fn first_child(&self, node: usize) -> Option<usize> {
        if node >= self.first_leaf {
            None
        } else {
            Some(node * self.width + 1)
        }
    }

    /// Children of `node`. Empty for leaves.
    #[inline]
    #[must_use]
    pub const fn children(&self, node: usize) -> Range<usize> {
        match self.first_child(node) {
            Some(first) => first..first + self.width,
            None => 0..0,
        }
    }

    /// Array index of leaf slot `slot`, `None` if out of range.
    #[inline]
    #[must_use]
    pub const fn leaf_node(&self, slot: usize) -> Option<usize> {
        if slot < self.max_leaves {
            Some(self.first_leaf + slot)
        } else {
            None
        }
    }
}
