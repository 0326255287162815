//! Decision model: whether the chain continues after a task completes.
//!
//! A [`CompletionPolicy`] sees the run state and the outcome a task signalled,
//! and returns a [`Decision`]. Policies are evaluated by the run loop exactly
//! once per executed task. They may have side effects on the state or on the
//! queue (re-enqueueing work, for example); the executor itself never retries.

use serde::{Deserialize, Serialize};

use super::TaskResult;

/// What the run loop does after a task's policy has been evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Dequeue and run the next task.
    Continue,

    /// Terminate this run invocation; pending tasks stay queued.
    Stop,
}

impl Decision {
    pub fn is_continue(self) -> bool {
        self == Decision::Continue
    }
}

impl From<bool> for Decision {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Decision::Continue
        } else {
            Decision::Stop
        }
    }
}

/// Decides whether the chain continues after a task signalled completion.
pub trait CompletionPolicy<S, R>: Send + Sync {
    fn decide(&self, state: &S, outcome: &TaskResult<R>) -> Decision;
}

/// Default policy: continue on success, stop on any error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnError;

impl<S, R> CompletionPolicy<S, R> for StopOnError {
    fn decide(&self, _state: &S, outcome: &TaskResult<R>) -> Decision {
        match outcome {
            Ok(_) => Decision::Continue,
            Err(_) => Decision::Stop,
        }
    }
}

/// Never stops the chain, errors included.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl<S, R> CompletionPolicy<S, R> for AlwaysContinue {
    fn decide(&self, _state: &S, _outcome: &TaskResult<R>) -> Decision {
        Decision::Continue
    }
}

/// Adapts a predicate closure (`true` = continue) into a policy.
pub struct FnPolicy<F>(F);

impl<F> FnPolicy<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<S, R, F> CompletionPolicy<S, R> for FnPolicy<F>
where
    F: Fn(&S, &TaskResult<R>) -> bool + Send + Sync,
{
    fn decide(&self, state: &S, outcome: &TaskResult<R>) -> Decision {
        Decision::from((self.0)(state, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskError;

    #[test]
    fn stop_on_error_continues_on_success() {
        let outcome: TaskResult<u32> = Ok(1);
        assert_eq!(StopOnError.decide(&(), &outcome), Decision::Continue);
    }

    #[test]
    fn stop_on_error_stops_on_failure() {
        let outcome: TaskResult<u32> = Err(TaskError::new("x"));
        assert_eq!(StopOnError.decide(&(), &outcome), Decision::Stop);
    }

    #[test]
    fn always_continue_ignores_errors() {
        let outcome: TaskResult<u32> = Err(TaskError::new("x"));
        assert_eq!(AlwaysContinue.decide(&(), &outcome), Decision::Continue);
    }

    #[test]
    fn fn_policy_maps_bool() {
        let policy = FnPolicy::new(|limit: &u32, outcome: &TaskResult<u32>| {
            matches!(outcome, Ok(v) if v < limit)
        });
        assert_eq!(policy.decide(&10, &Ok(3)), Decision::Continue);
        assert_eq!(policy.decide(&10, &Ok(12)), Decision::Stop);
    }
}
