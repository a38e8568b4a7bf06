//! Standard memory orderings for node values and the tree lock.
//!
//! These constants keep ordering usage consistent across the codebase
//! and make the intent clear at each access point.

use std::sync::atomic::Ordering;

/// Ordering for reading a node value inside the critical section.
/// The tree lock already orders every locked access.
pub const LOCKED_READ: Ordering = Ordering::Relaxed;

/// Ordering for writing a node value under the lock.
/// Pairs with [`RELAXED_QUERY`] for readers that skip the lock.
pub const LOCKED_WRITE: Ordering = Ordering::Release;

/// Ordering for reading the root without taking the lock.
pub const RELAXED_QUERY: Ordering = Ordering::Acquire;

/// Ordering for a successful lock CAS.
pub const LOCK_ACQUIRE: Ordering = Ordering::Acquire;

/// Ordering for a failed lock CAS and the read-only spin.
pub const LOCK_SPIN: Ordering = Ordering::Relaxed;

/// Ordering for releasing the lock.
/// Publishes every write made in the critical section.
pub const LOCK_RELEASE: Ordering = Ordering::Release;
