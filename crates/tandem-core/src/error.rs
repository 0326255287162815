use thiserror::Error;

use crate::domain::TaskId;

/// Executor-level errors. Task failures are not reported here; they travel
/// through the completion signal as [`TaskError`](crate::domain::TaskError).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task body is required (label={label:?})")]
    MissingBody { label: Option<String> },

    #[error("{task_id} was admitted by a different queue")]
    ForeignTask { task_id: TaskId },

    #[error("queue is already running a task chain")]
    AlreadyRunning,
}
