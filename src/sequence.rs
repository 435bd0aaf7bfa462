//! Connection identifiers used to correlate log lines.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing ids, safe to share between tasks.
///
/// The counter wraps at `u64::MAX`.
#[derive(Debug, Default)]
pub struct ConnectionIds {
    next: AtomicU64,
}

impl ConnectionIds {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns the next id. Every call observes a distinct value.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
