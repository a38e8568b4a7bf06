//! # `Mindicator`
//!
//! A minimum-tracking tree: many participants each publish a timestamp, and
//! any reader learns the smallest one currently published without scanning
//! every participant.
//!
//! This crate implements the coarse-grained-lock (CGL) variant:
//! - A complete W-ary tree of depth D stored in one array
//! - Every internal node holds the minimum of its children
//! - One tree-wide lock serializes every arrive, depart and query
//!
//! ## Status
//!
//! | Feature | Status |
//! |---------|--------|
//! | Arrive / depart / query | Works (linearizable through the tree lock) |
//! | Lock-free root read | Works (`query_relaxed`, best effort) |
//! | Pluggable raw lock | Works (`TatasLock` default, `parking_lot` alternative) |
//! | Fine-grained / lock-free trees | Not implemented |
//!
//! ## Thread Safety
//!
//! `Mindicator` is `Send + Sync`. Share it through an `Arc` and give each
//! participant its own leaf slot:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use mindicator::{INFINITY, Mindicator};
//!
//! let tree = Arc::new(Mindicator::new(4, 3)?);
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|slot| {
//!         let tree = Arc::clone(&tree);
//!         thread::spawn(move || {
//!             tree.arrive(slot, 100 + slot as i32).unwrap();
//!             assert!(tree.query() <= 100 + slot as i32);
//!             tree.depart(slot).unwrap();
//!         })
//!     })
//!     .collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//! assert_eq!(tree.query(), INFINITY);
//! # Ok::<(), mindicator::Error>(())
//! ```
//!
//! ## Timestamps
//!
//! - Timestamps are `i32`; smaller means older.
//! - [`INFINITY`] (`i32::MAX`) is the sentinel for "no contribution" and
//!   cannot be published.
//! - Arrive only lowers a slot. To publish a larger value, depart first.
//!
//! ## Design
//!
//! Nodes are indices into the tree's array: node `i` has parent `(i-1)/W` and
//! children `i*W+1 ..= i*W+W`. Leaf slot `k` is node `first_leaf + k`. See
//! [`shape`] for the arithmetic and [`propagate`] for the two walks.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod lock;
pub mod ordering;
pub mod propagate;
pub mod shape;
pub mod tree;

mod tracing_helpers;

pub use error::{Error, InvariantViolation, Result, ShapeError};
pub use lock::TatasLock;
pub use shape::TreeShape;
pub use tree::{Leaf, Mindicator, ParkingMindicator};

/// Sentinel value meaning "no active publisher in this subtree".
pub const INFINITY: i32 = i32::MAX;

/// Install a `tracing` subscriber reading filters from `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
/// Without the `tracing` feature this does nothing.
pub fn init_tracing() {
    #[cfg(feature = "tracing")]
    {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mindicator=info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_target(true)
            .compact()
            .try_init();
    }
}
