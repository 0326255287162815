//! Terminal reports of a run-loop invocation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{TaskError, TaskResult};

/// Why a run-loop invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A completion policy returned [`Decision::Stop`](super::Decision::Stop).
    Stopped,

    /// No pending task was left.
    Emptied,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Stopped => "stopped",
            StopReason::Emptied => "emptied",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handed to the on-stop observer and returned from `run`.
///
/// `outcome` carries what the last task signalled when the chain was
/// stopped by a policy, and is `None` when the queue emptied.
#[derive(Debug, Clone)]
pub struct StopReport<S, R> {
    pub reason: StopReason,
    pub state: S,
    pub outcome: Option<TaskResult<R>>,
}

impl<S, R> StopReport<S, R> {
    pub fn emptied(state: S) -> Self {
        Self {
            reason: StopReason::Emptied,
            state,
            outcome: None,
        }
    }

    pub fn stopped(state: S, outcome: TaskResult<R>) -> Self {
        Self {
            reason: StopReason::Stopped,
            state,
            outcome: Some(outcome),
        }
    }

    pub fn error(&self) -> Option<&TaskError> {
        self.outcome.as_ref().and_then(|o| o.as_ref().err())
    }

    pub fn result(&self) -> Option<&R> {
        self.outcome.as_ref().and_then(|o| o.as_ref().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptied_has_no_outcome() {
        let report: StopReport<(), u8> = StopReport::emptied(());
        assert_eq!(report.reason, StopReason::Emptied);
        assert!(report.error().is_none());
        assert!(report.result().is_none());
    }

    #[test]
    fn stopped_exposes_error() {
        let report: StopReport<(), u8> = StopReport::stopped((), Err(TaskError::new("x")));
        assert_eq!(report.reason.to_string(), "stopped");
        assert_eq!(report.error().map(|e| e.message.as_str()), Some("x"));
        assert!(report.result().is_none());
    }

    #[test]
    fn reason_serializes_lowercase() {
        let s = serde_json::to_string(&StopReason::Emptied).unwrap();
        assert_eq!(s, "\"emptied\"");
    }
}
