//! The one-shot completion signal between a task body and the run loop.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::warn;

use crate::domain::{TaskError, TaskId, TaskResult};

type Slot<R> = Arc<Mutex<Option<oneshot::Sender<TaskResult<R>>>>>;

/// Handle a task body uses to signal that it is done.
///
/// Cloneable, so a body can hand it to several callbacks (a timer racing an
/// I/O callback, say). Only the first signal is delivered; later ones are
/// ignored and return `false`. If every clone is dropped without a signal the
/// run loop sees an [`Abandoned`](crate::domain::ErrorKind::Abandoned) error.
pub struct Completion<R> {
    task_id: TaskId,
    slot: Slot<R>,
}

impl<R> Completion<R> {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Deliver the outcome. Returns `true` if this was the first signal.
    pub fn complete(&self, outcome: TaskResult<R>) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            // The receiver is gone only if the run future was dropped.
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => {
                warn!(task_id = %self.task_id, "Completion::complete: duplicate signal ignored");
                false
            }
        }
    }

    pub fn succeed(&self, result: R) -> bool {
        self.complete(Ok(result))
    }

    pub fn fail(&self, error: impl Into<TaskError>) -> bool {
        self.complete(Err(error.into()))
    }

    pub fn is_completed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<R> Clone for Completion<R> {
    fn clone(&self) -> Self {
        Self {
            task_id: self.task_id,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R> std::fmt::Debug for Completion<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("task_id", &self.task_id)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// The run loop's end of the pair.
pub(crate) struct CompletionSignal<R> {
    task_id: TaskId,
    rx: oneshot::Receiver<TaskResult<R>>,
}

impl<R> CompletionSignal<R> {
    pub(crate) async fn wait(self) -> TaskResult<R> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(TaskError::abandoned(self.task_id)),
        }
    }
}

pub(crate) fn completion_pair<R>(task_id: TaskId) -> (Completion<R>, CompletionSignal<R>) {
    let (tx, rx) = oneshot::channel();
    (
        Completion {
            task_id,
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        CompletionSignal { task_id, rx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;

    #[tokio::test]
    async fn first_signal_wins() {
        let (done, signal) = completion_pair::<u32>(TaskId::new(1));
        let other = done.clone();

        assert!(done.succeed(1));
        assert!(!other.succeed(2));
        assert!(!done.fail("late"));
        assert!(other.is_completed());

        assert_eq!(signal.wait().await, Ok(1));
    }

    #[tokio::test]
    async fn dropped_handle_is_abandoned() {
        let (done, signal) = completion_pair::<u32>(TaskId::new(9));
        let copy = done.clone();
        drop(done);
        drop(copy);

        let err = signal.wait().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Abandoned);
    }

    #[tokio::test]
    async fn signal_from_another_task() {
        let (done, signal) = completion_pair::<&'static str>(TaskId::new(2));
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            done.fail("boom");
        });

        let err = signal.wait().await.unwrap_err();
        assert_eq!(err.message, "boom");
        assert_eq!(err.kind, ErrorKind::Failed);
    }
}
