//! Task record and its builder.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CompletionPolicy, FnPolicy, StopOnError, TaskId, TaskResult};
use crate::error::QueueError;
use crate::handler::TaskHandler;
use crate::queue::Completion;

/// The work a task performs.
///
/// The body receives the run state and a [`Completion`] handle, and must
/// signal through the handle exactly once, either before returning or later
/// from whatever asynchronous operation it started.
pub type TaskBody<S, R> = Box<dyn FnOnce(S, Completion<R>) + Send + 'static>;

/// Adapt an async closure into a callback body. The future is spawned on the
/// current tokio runtime when the body is dispatched.
pub(crate) fn future_body<S, R, F, Fut>(make: F) -> TaskBody<S, R>
where
    S: Send + 'static,
    R: Send + 'static,
    F: FnOnce(S) -> Fut + Send + 'static,
    Fut: Future<Output = TaskResult<R>> + Send + 'static,
{
    Box::new(move |state, done: Completion<R>| {
        tokio::spawn(async move {
            done.complete(make(state).await);
        });
    })
}

/// A unit of queued work plus its completion policy and identity.
///
/// Immutable once admitted. The queue owns it while it is pending; the run
/// loop takes it over when it is dequeued and drops it after the policy has
/// been evaluated.
pub struct Task<S, R> {
    id: TaskId,
    label: String,
    enqueued_at: DateTime<Utc>,
    body: TaskBody<S, R>,
    policy: Box<dyn CompletionPolicy<S, R>>,
    /// Token of the queue that assigned `id`; ids are only unique per queue.
    origin: Weak<()>,
}

impl<S, R> Task<S, R> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            label: self.label.clone(),
            enqueued_at: self.enqueued_at,
        }
    }

    pub(crate) fn belongs_to(&self, origin: &Arc<()>) -> bool {
        self.origin.as_ptr() == Arc::as_ptr(origin)
    }

    pub(crate) fn into_parts(self) -> (TaskBody<S, R>, Box<dyn CompletionPolicy<S, R>>) {
        (self.body, self.policy)
    }
}

impl<S, R> fmt::Debug for Task<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// Label given to a task pushed without one.
pub(crate) fn default_label(label_prefix: &str, id: TaskId) -> String {
    format!("{label_prefix}-{}", id.get())
}

/// Serializable snapshot of a pending task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub label: String,
    pub enqueued_at: DateTime<Utc>,
}

/// Collects the parts of a task before it is admitted to a queue.
///
/// # Example
/// ```ignore
/// queue.push(
///     TaskBuilder::new()
///         .label("fetch")
///         .body(|state, done| { /* ... */ done.succeed(1); })
///         .policy_fn(|_state, outcome| outcome.is_ok()),
/// )?;
/// ```
pub struct TaskBuilder<S, R> {
    label: Option<String>,
    body: Option<TaskBody<S, R>>,
    policy: Option<Box<dyn CompletionPolicy<S, R>>>,
}

impl<S, R> TaskBuilder<S, R>
where
    S: Send + 'static,
    R: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            label: None,
            body: None,
            policy: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Callback-style body.
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: FnOnce(S, Completion<R>) + Send + 'static,
    {
        self.body = Some(Box::new(body));
        self
    }

    /// Async body. The future is spawned on the current tokio runtime and its
    /// output becomes the completion signal.
    pub fn future<F, Fut>(mut self, make: F) -> Self
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<R>> + Send + 'static,
    {
        self.body = Some(future_body(make));
        self
    }

    /// Body backed by a [`TaskHandler`].
    pub fn handler(mut self, handler: Arc<dyn TaskHandler<S, R>>) -> Self {
        self.body = Some(Box::new(move |state, done: Completion<R>| {
            tokio::spawn(async move {
                done.complete(handler.handle(state).await);
            });
        }));
        self
    }

    pub fn policy<P>(mut self, policy: P) -> Self
    where
        P: CompletionPolicy<S, R> + 'static,
    {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Predicate policy: `true` continues the chain, `false` stops it.
    pub fn policy_fn<F>(self, predicate: F) -> Self
    where
        F: Fn(&S, &TaskResult<R>) -> bool + Send + Sync + 'static,
    {
        self.policy(FnPolicy::new(predicate))
    }

    /// Check that a body was supplied. Nothing is allocated for a rejected
    /// builder, so it never consumes an id.
    pub(crate) fn into_ready(self) -> Result<ReadyTask<S, R>, QueueError> {
        let Some(body) = self.body else {
            return Err(QueueError::MissingBody { label: self.label });
        };
        Ok(ReadyTask {
            label: self.label,
            body,
            policy: self.policy,
        })
    }
}

/// A validated builder waiting for its id.
pub(crate) struct ReadyTask<S, R> {
    label: Option<String>,
    body: TaskBody<S, R>,
    policy: Option<Box<dyn CompletionPolicy<S, R>>>,
}

impl<S, R> ReadyTask<S, R> {
    pub(crate) fn from_body(body: TaskBody<S, R>) -> Self {
        Self {
            label: None,
            body,
            policy: None,
        }
    }

    pub(crate) fn finish(
        self,
        label_prefix: &str,
        id: TaskId,
        enqueued_at: DateTime<Utc>,
        origin: Weak<()>,
    ) -> Task<S, R> {
        Task {
            id,
            label: self
                .label
                .unwrap_or_else(|| default_label(label_prefix, id)),
            enqueued_at,
            body: self.body,
            policy: self.policy.unwrap_or_else(|| Box::new(StopOnError)),
            origin,
        }
    }
}

impl<S, R> Default for TaskBuilder<S, R>
where
    S: Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decision, TaskError};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn finished<R: Send + 'static>(builder: TaskBuilder<(), R>, prefix: &str) -> Task<(), R> {
        builder
            .into_ready()
            .unwrap()
            .finish(prefix, TaskId::new(5), at(), Weak::new())
    }

    #[test]
    fn builder_without_body_is_rejected() {
        let builder: TaskBuilder<(), ()> = TaskBuilder::new().label("orphan");
        let err = builder.into_ready().err().unwrap();
        assert!(matches!(err, QueueError::MissingBody { label: Some(ref l) } if l == "orphan"));
    }

    #[test]
    fn default_label_uses_prefix_and_id() {
        let task = finished(
            TaskBuilder::new().body(|_, done: Completion<()>| {
                done.succeed(());
            }),
            "step",
        );
        assert_eq!(task.label(), "step-5");
        assert_eq!(task.id(), TaskId::new(5));
        assert_eq!(task.enqueued_at(), at());
    }

    #[test]
    fn default_policy_stops_on_error() {
        let task = finished(
            TaskBuilder::new().body(|_, done: Completion<()>| {
                done.succeed(());
            }),
            "task",
        );
        let (_body, policy) = task.into_parts();
        assert_eq!(policy.decide(&(), &Ok(())), Decision::Continue);
        assert_eq!(policy.decide(&(), &Err(TaskError::new("x"))), Decision::Stop);
    }

    #[test]
    fn explicit_policy_is_kept() {
        let task = finished(
            TaskBuilder::new()
                .body(|_, done: Completion<u8>| {
                    done.succeed(1);
                })
                .policy_fn(|_, outcome| matches!(outcome, Ok(v) if *v > 1)),
            "task",
        );
        let (_body, policy) = task.into_parts();
        assert_eq!(policy.decide(&(), &Ok(1)), Decision::Stop);
        assert_eq!(policy.decide(&(), &Ok(2)), Decision::Continue);
    }

    #[test]
    fn info_snapshot_matches_task() {
        let task = finished(
            TaskBuilder::new().label("snap").body(|_, done: Completion<u8>| {
                done.succeed(1);
            }),
            "task",
        );
        let info = task.info();
        assert_eq!(info.id, task.id());
        assert_eq!(info.label, "snap");
        assert_eq!(info.enqueued_at, task.enqueued_at());
        assert!(format!("{task:?}").contains("snap"));
    }

    #[test]
    fn origin_token_identifies_the_admitting_queue() {
        let token = Arc::new(());
        let other = Arc::new(());
        let task = TaskBuilder::<(), ()>::new()
            .body(|_, done: Completion<()>| {
                done.succeed(());
            })
            .into_ready()
            .unwrap()
            .finish("task", TaskId::new(1), at(), Arc::downgrade(&token));
        assert!(task.belongs_to(&token));
        assert!(!task.belongs_to(&other));
    }
}
