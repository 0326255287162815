//! In-memory task queue and its run loop.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, instrument, warn};

use super::completion::completion_pair;
use super::{Completion, QueueConfig, RunPhase};
use crate::domain::{
    Decision, StopReason, StopReport, Task, TaskBuilder, TaskId, TaskInfo, TaskResult,
};
use crate::domain::task::{ReadyTask, future_body};
use crate::error::QueueError;
use crate::observability::QueueCounts;
use crate::ports::{Clock, IdGenerator, SequentialIdGenerator, SystemClock};

/// Mutable part of the queue.
///
/// The lock guarding it is never held across an `.await` and never while
/// bodies, policies or observers run, so those may freely call back into the
/// queue. The one port consulted under the lock is the [`IdGenerator`].
struct QueueState<S, R> {
    /// Pending tasks, head first.
    pending: VecDeque<Task<S, R>>,

    phase: RunPhase,

    /// Task dequeued by the run loop and not yet evaluated.
    in_flight: Option<TaskId>,

    executed: u64,
    failed: u64,
    stopped_runs: u64,
    emptied_runs: u64,
}

impl<S, R> QueueState<S, R> {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            phase: RunPhase::Idle,
            in_flight: None,
            executed: 0,
            failed: 0,
            stopped_runs: 0,
            emptied_runs: 0,
        }
    }

    fn counts(&self) -> QueueCounts {
        QueueCounts {
            phase: self.phase,
            pending: self.pending.len(),
            in_flight: self.in_flight,
            executed: self.executed,
            failed: self.failed,
            stopped_runs: self.stopped_runs,
            emptied_runs: self.emptied_runs,
        }
    }
}

struct Shared<S, R> {
    state: Mutex<QueueState<S, R>>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: QueueConfig,
    /// Identity of this queue; admitted tasks hold a weak reference to it.
    token: Arc<()>,
}

impl<S, R> Shared<S, R> {
    fn lock(&self) -> MutexGuard<'_, QueueState<S, R>> {
        // No user code runs under this lock, so a poisoned guard still holds
        // a consistent sequence.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A FIFO queue of tasks executed one at a time.
///
/// `S` is the run state threaded through every body and policy of one `run`
/// invocation (usually a shared handle such as `Arc<Mutex<T>>`); `R` is what
/// task bodies produce on success.
///
/// The queue is a cheap handle: clones refer to the same pending sequence.
/// Bodies and policies that push follow-up work should capture a
/// [`WeakTaskQueue`] from [`downgrade`](Self::downgrade): a strong clone held
/// by a pending task keeps the queue alive after every caller handle is gone.
pub struct TaskQueue<S, R> {
    shared: Arc<Shared<S, R>>,
}

impl<S, R> Clone for TaskQueue<S, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, R> std::fmt::Debug for TaskQueue<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.shared.config.name)
            .field("counts", &self.shared.lock().counts())
            .finish()
    }
}

impl<S, R> Default for TaskQueue<S, R>
where
    S: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R> TaskQueue<S, R>
where
    S: Clone + Send + Sync + 'static,
    R: Send + 'static,
{
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    pub fn with_config(config: QueueConfig) -> Self {
        let ids = Arc::new(SequentialIdGenerator::starting_at(config.first_id));
        Self::with_parts(config, ids, Arc::new(SystemClock))
    }

    pub fn with_parts(config: QueueConfig, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::new()),
                ids,
                clock,
                config,
                token: Arc::new(()),
            }),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    // ----------------------------------------------------------------------
    // Admission
    // ----------------------------------------------------------------------

    /// Append a task at the tail.
    ///
    /// Fails with [`QueueError::MissingBody`] if the builder has no body; the
    /// queue is left untouched in that case.
    pub fn push(&self, builder: TaskBuilder<S, R>) -> Result<TaskId, QueueError> {
        let ready = builder.into_ready().inspect_err(|err| {
            warn!(queue = %self.shared.config.name, %err, "TaskQueue::push: rejected");
        })?;
        Ok(self.admit(ready))
    }

    /// Append a callback-style body with the default label and policy.
    pub fn push_fn<F>(&self, body: F) -> TaskId
    where
        F: FnOnce(S, Completion<R>) + Send + 'static,
    {
        self.admit(ReadyTask::from_body(Box::new(body)))
    }

    /// Append an async body with the default label and policy.
    pub fn push_async<F, Fut>(&self, make: F) -> TaskId
    where
        F: FnOnce(S) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult<R>> + Send + 'static,
    {
        self.admit(ReadyTask::from_body(future_body(make)))
    }

    /// Put back a task previously taken out of this queue with
    /// [`pop_head`](Self::pop_head) or [`pop_tail`](Self::pop_tail). It keeps
    /// its id and goes to the tail.
    ///
    /// Ids are only unique per queue, so a task admitted by another queue is
    /// rejected with [`QueueError::ForeignTask`] and dropped.
    pub fn requeue(&self, task: Task<S, R>) -> Result<(), QueueError> {
        let task_id = task.id();
        if !task.belongs_to(&self.shared.token) {
            warn!(queue = %self.shared.config.name, %task_id, "TaskQueue::requeue: foreign task rejected");
            return Err(QueueError::ForeignTask { task_id });
        }
        debug!(queue = %self.shared.config.name, %task_id, "TaskQueue::requeue: called");
        self.shared.lock().pending.push_back(task);
        Ok(())
    }

    /// A handle that does not keep the queue alive.
    pub fn downgrade(&self) -> WeakTaskQueue<S, R> {
        WeakTaskQueue {
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn admit(&self, ready: ReadyTask<S, R>) -> TaskId {
        let shared = &self.shared;
        let enqueued_at = shared.clock.now();
        let origin = Arc::downgrade(&shared.token);
        // Ids are assigned under the lock so that concurrent pushes append in
        // the order their ids were handed out.
        let mut state = shared.lock();
        let task = ready.finish(&shared.config.label_prefix, shared.ids.next_task_id(), enqueued_at, origin);
        let id = task.id();
        debug!(queue = %shared.config.name, task_id = %id, label = %task.label(), "TaskQueue::push: enqueued");
        state.pending.push_back(task);
        id
    }

    // ----------------------------------------------------------------------
    // Container operations (no execution side effects)
    // ----------------------------------------------------------------------

    pub fn pop_head(&self) -> Option<Task<S, R>> {
        self.shared.lock().pending.pop_front()
    }

    pub fn pop_tail(&self) -> Option<Task<S, R>> {
        self.shared.lock().pending.pop_back()
    }

    /// Discard every pending task and return how many there were. A task
    /// already dequeued by the run loop is unaffected.
    pub fn clear(&self) -> usize {
        let discarded: Vec<Task<S, R>> = self.shared.lock().pending.drain(..).collect();
        if !discarded.is_empty() {
            debug!(queue = %self.shared.config.name, count = discarded.len(), "TaskQueue::clear: discarded");
        }
        // Dropped outside the lock: captured values may call back into the queue.
        discarded.len()
    }

    /// Number of pending (not yet started) tasks.
    pub fn len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().pending.is_empty()
    }

    /// Snapshot of the pending tasks, head first.
    pub fn pending(&self) -> Vec<TaskInfo> {
        self.shared.lock().pending.iter().map(Task::info).collect()
    }

    pub fn phase(&self) -> RunPhase {
        self.shared.lock().phase
    }

    pub fn counts(&self) -> QueueCounts {
        self.shared.lock().counts()
    }

    // ----------------------------------------------------------------------
    // Run loop
    // ----------------------------------------------------------------------

    /// Run pending tasks head first, one at a time, until a completion policy
    /// stops the chain or the queue is empty.
    ///
    /// Each dequeued task gets a clone of `state` and a [`Completion`] handle.
    /// The loop waits for the task's signal, evaluates its policy with the
    /// same state, and either continues with the new head or stops. Tasks
    /// pushed meanwhile are appended and run after everything already queued.
    ///
    /// Fails only with [`QueueError::AlreadyRunning`] when another `run` is
    /// active on this queue.
    #[instrument(skip_all, fields(queue = %self.shared.config.name))]
    pub async fn run(&self, state: S) -> Result<StopReport<S, R>, QueueError> {
        let mut run = RunGuard::acquire(&self.shared)?;
        info!("TaskQueue::run: started");

        loop {
            let Some(task) = run.dequeue() else {
                run.finish(StopReason::Emptied);
                info!("TaskQueue::run: emptied");
                return Ok(StopReport::emptied(state));
            };

            let id = task.id();
            debug!(task_id = %id, label = %task.label(), "TaskQueue::run: dispatching");
            let (body, policy) = task.into_parts();
            let (done, signal) = completion_pair(id);
            body(state.clone(), done);

            let outcome = signal.wait().await;
            if let Err(err) = &outcome {
                warn!(task_id = %id, %err, "TaskQueue::run: task reported an error");
            }

            let decision = policy.decide(&state, &outcome);
            run.record(&outcome);
            debug!(task_id = %id, ?decision, "TaskQueue::run: evaluated");

            if decision == Decision::Stop {
                run.finish(StopReason::Stopped);
                info!(task_id = %id, remaining = self.len(), "TaskQueue::run: stopped by completion policy");
                return Ok(StopReport::stopped(state, outcome));
            }
        }
    }

    /// [`run`](Self::run), then hand the report to `on_stop` before returning it.
    pub async fn run_with<F>(&self, state: S, on_stop: F) -> Result<StopReport<S, R>, QueueError>
    where
        F: FnOnce(&StopReport<S, R>) + Send,
    {
        let report = self.run(state).await?;
        on_stop(&report);
        Ok(report)
    }
}

/// Non-owning [`TaskQueue`] handle, for capture inside bodies and policies.
pub struct WeakTaskQueue<S, R> {
    shared: Weak<Shared<S, R>>,
}

impl<S, R> WeakTaskQueue<S, R> {
    /// The queue, if some strong handle still exists.
    pub fn upgrade(&self) -> Option<TaskQueue<S, R>> {
        self.shared.upgrade().map(|shared| TaskQueue { shared })
    }
}

impl<S, R> Clone for WeakTaskQueue<S, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<S, R> std::fmt::Debug for WeakTaskQueue<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakTaskQueue")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Marks the queue as running for the lifetime of one `run` invocation.
///
/// If the run future is dropped mid-chain the queue returns to `Idle`.
struct RunGuard<'a, S, R> {
    shared: &'a Shared<S, R>,
    finished: bool,
}

impl<'a, S, R> RunGuard<'a, S, R> {
    fn acquire(shared: &'a Shared<S, R>) -> Result<Self, QueueError> {
        let mut state = shared.lock();
        if state.phase.is_running() {
            return Err(QueueError::AlreadyRunning);
        }
        state.phase = RunPhase::Running;
        Ok(Self {
            shared,
            finished: false,
        })
    }

    fn dequeue(&mut self) -> Option<Task<S, R>> {
        let mut state = self.shared.lock();
        let task = state.pending.pop_front()?;
        state.in_flight = Some(task.id());
        Some(task)
    }

    fn record(&mut self, outcome: &TaskResult<R>) {
        let mut state = self.shared.lock();
        state.in_flight = None;
        state.executed += 1;
        if outcome.is_err() {
            state.failed += 1;
        }
    }

    fn finish(&mut self, reason: StopReason) {
        let mut state = self.shared.lock();
        state.phase = reason.into();
        match reason {
            StopReason::Stopped => state.stopped_runs += 1,
            StopReason::Emptied => state.emptied_runs += 1,
        }
        self.finished = true;
    }
}

impl<S, R> Drop for RunGuard<'_, S, R> {
    fn drop(&mut self) {
        if !self.finished {
            let mut state = self.shared.lock();
            state.phase = RunPhase::Idle;
            state.in_flight = None;
        }
    }
}
