use std::sync::atomic::{AtomicU32, Ordering};

/// Largest sequence number a request may carry; the next value after it
/// wraps back to 1. 0 and the top half of the range are reserved.
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// Source of request sequence numbers.
///
/// A session needs values that are unique while their correlation entries
/// live; a process-local counter is enough for one connection. Deployments
/// that share one bind across processes plug in their own implementation
/// (for example one backed by a shared counter service).
pub trait SequenceGenerator: Send + Sync {
    /// The next sequence number, in 1..=0x7FFFFFFF.
    fn next(&self) -> u32;
}

/// Default generator: an atomic counter starting at 1.
#[derive(Debug)]
pub struct AtomicSequence {
    last: AtomicU32,
}

impl AtomicSequence {
    pub fn new() -> Self {
        Self::starting_after(0)
    }

    /// Start the counter so the first value handed out is `last + 1`.
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: AtomicU32::new(last),
        }
    }
}

impl Default for AtomicSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGenerator for AtomicSequence {
    fn next(&self) -> u32 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let next = if current >= MAX_SEQUENCE_NUMBER {
                1
            } else {
                current + 1
            };
            match self
                .last
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }
}
