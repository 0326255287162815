//! Task runtime errors.
//!
//! A [`TaskError`] is what a task body reports through its completion signal.
//! It is data for the completion policy, not a failure of the executor.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

/// Classification of a task error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The body reported a failure.
    Failed,

    /// Every completion handle was dropped without a signal.
    Abandoned,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Failed => f.write_str("failed"),
            ErrorKind::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// Error reported by a task body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Failed,
            message: message.into(),
        }
    }

    pub fn abandoned(task_id: TaskId) -> Self {
        Self {
            kind: ErrorKind::Abandoned,
            message: format!("{task_id} dropped its completion handle without signalling"),
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.kind == ErrorKind::Abandoned
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Result a task body signals on completion.
pub type TaskResult<R> = Result<R, TaskError>;
