use serde::{Deserialize, Serialize};

use crate::domain::TaskId;
use crate::queue::RunPhase;

/// Point-in-time counters of a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub phase: RunPhase,
    pub pending: usize,
    pub in_flight: Option<TaskId>,
    /// Tasks whose completion policy has been evaluated.
    pub executed: u64,
    /// Of those, how many signalled an error.
    pub failed: u64,
    pub stopped_runs: u64,
    pub emptied_runs: u64,
}
