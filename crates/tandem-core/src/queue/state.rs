//! Run-loop phases.

use serde::{Deserialize, Serialize};

use crate::domain::StopReason;

/// Phase of a queue's run loop.
///
/// Transitions:
/// - Idle -> Running (run started)
/// - Running -> Stopped (a completion policy returned Stop)
/// - Running -> Emptied (no pending task left)
/// - Running -> Idle (the run future was dropped mid-chain)
/// - Stopped | Emptied -> Running (run called again)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Stopped,
    Emptied,
}

impl RunPhase {
    pub fn is_running(self) -> bool {
        self == RunPhase::Running
    }

    /// Did the last invocation end on its own (policy stop or empty queue)?
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Stopped | RunPhase::Emptied)
    }
}

impl From<StopReason> for RunPhase {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::Stopped => RunPhase::Stopped,
            StopReason::Emptied => RunPhase::Emptied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases_come_from_stop_reasons() {
        assert_eq!(RunPhase::from(StopReason::Stopped), RunPhase::Stopped);
        assert_eq!(RunPhase::from(StopReason::Emptied), RunPhase::Emptied);
        assert!(RunPhase::Stopped.is_terminal());
        assert!(!RunPhase::Running.is_terminal());
        assert!(!RunPhase::Idle.is_terminal());
        assert!(RunPhase::Running.is_running());
    }
}
