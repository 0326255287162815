//! Domain identifiers.
//!
//! Task ids are plain monotonically increasing integers handed out by the
//! queue's [`IdGenerator`](crate::ports::IdGenerator). They are never reused,
//! so ordering ids is the same as ordering admissions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a Task (unique within the queue that admitted it).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}
