//! Filepath: src/lock.rs
//!
//! Test-and-test-and-set spin lock guarding a whole tree.
//!
//! [`TatasLock`] implements [`lock_api::RawMutex`], so the tree wraps it in a
//! `lock_api::Mutex<TatasLock, ()>` and gets an RAII guard for free. Any other
//! raw mutex (e.g. [`parking_lot::RawMutex`]) can be swapped in through the
//! tree's lock type parameter.
//!
//! # Protocol
//! 1. `lock()`: spin on a plain load until the flag reads clear, then CAS
//!    `false -> true` with `Acquire`. Failed rounds back off.
//! 2. `unlock()`: `Release` store of `false`.
//!
//! The lock never poisons. A guard dropped during unwinding releases it, but a
//! holder that never returns (abort, infinite loop) blocks every later caller.

use std::hint;
use std::sync::atomic::AtomicBool;
use std::thread;

use parking_lot::lock_api::{self, GuardSend};

use crate::ordering::{LOCK_ACQUIRE, LOCK_RELEASE, LOCK_SPIN};
use crate::tracing_helpers::warn_log;

/// Spin rounds before backing off to `yield_now`.
const SPIN_LIMIT: u32 = 64;

/// Rounds after which a still-waiting acquirer is reported.
const SLOW_LOCK_ROUNDS: u32 = 1 << 20;

/// A raw TATAS spin lock.
///
/// # Example
///
/// ```rust
/// use mindicator::lock::TatasLock;
/// use parking_lot::lock_api::RawMutex;
///
/// let lock = TatasLock::new();
/// lock.lock();
/// assert!(lock.is_locked());
/// assert!(!lock.try_lock());
///
/// // SAFETY: locked just above on this thread.
/// unsafe { lock.unlock() };
/// assert!(!lock.is_locked());
/// ```
#[derive(Debug, Default)]
pub struct TatasLock {
    locked: AtomicBool,
}

impl TatasLock {
    /// Create an unlocked lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange_weak(false, true, LOCK_ACQUIRE, LOCK_SPIN)
            .is_ok()
    }

    #[cold]
    fn lock_contended(&self) {
        let mut rounds: u32 = 0;

        loop {
            // Read-only spin keeps the cache line shared while the holder works.
            while self.locked.load(LOCK_SPIN) {
                rounds = rounds.saturating_add(1);

                if rounds <= SPIN_LIMIT {
                    hint::spin_loop();
                } else {
                    thread::yield_now();
                }

                if rounds == SLOW_LOCK_ROUNDS {
                    warn_log!(rounds, "SLOW_LOCK: tree lock still held");
                }
            }

            if self.try_acquire() {
                return;
            }
        }
    }
}

// SAFETY: `lock`/`try_lock` only succeed through an `Acquire` CAS from
// `false` to `true`, so at most one owner exists at a time, and `unlock`
// publishes the owner's writes with a `Release` store.
unsafe impl lock_api::RawMutex for TatasLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        if !self.try_acquire() {
            self.lock_contended();
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        !self.locked.load(LOCK_SPIN)
            && self
                .locked
                .compare_exchange(false, true, LOCK_ACQUIRE, LOCK_SPIN)
                .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, LOCK_RELEASE);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.locked.load(LOCK_SPIN)
    }
}
