//! Thread-safe sequence counter for wire request numbering.
//!
//! Every request sent to the debuggee carries a `seq` number, and the
//! debuggee echoes it back as `request_seq` in the matching response.  That
//! echo is the only thing tying a response to its request, so two requests
//! in flight at the same time must never share a number.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU64` internally, so concurrent commands (each
//! running in its own task) can draw numbers without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing counter for request sequence numbers.
///
/// Sequence numbers start at 1: some debuggee implementations treat a zero
/// `request_seq` as "no request".  The counter wraps from `u64::MAX` back to 1.
///
/// # Examples
///
/// ```rust
/// use inspector_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.next(), 2);
/// ```
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a new counter whose first value is 1.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(1),
        }
    }

    /// Returns the next sequence number and atomically increments the counter.
    ///
    /// `Ordering::Relaxed` is enough: the numbers only need to be unique, they
    /// do not publish any other memory.
    pub fn next(&self) -> u64 {
        let value = self.inner.fetch_add(1, Ordering::Relaxed);
        if value == 0 {
            // Wrapped past u64::MAX; skip the reserved zero.
            return self.inner.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Returns the value the next call to [`next`](Self::next) will hand out,
    /// without incrementing.  For logging only.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
