//! IdGenerator port: where task ids come from.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::TaskId;

/// Hands out task ids.
///
/// Implementations must return strictly increasing ids and never repeat one.
/// The queue calls `next_task_id` while holding its lock, so an implementation
/// must not call back into the queue.
pub trait IdGenerator: Send + Sync {
    fn next_task_id(&self) -> TaskId;
}

/// Counter-backed generator; one per queue.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_task_id(&self) -> TaskId {
        TaskId::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
