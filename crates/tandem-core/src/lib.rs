//! tandem-core
//!
//! A sequential task executor: tasks are pushed onto a [`TaskQueue`], then
//! [`TaskQueue::run`] executes them strictly one at a time in FIFO order,
//! threading a caller-supplied state value through the chain, until a
//! completion policy stops it or the queue is empty.
//!
//! # Modules
//! - **domain**: task ids, tasks and builders, task errors, completion policies, stop reports
//! - **ports**: `Clock` and `IdGenerator` seams
//! - **queue**: `TaskQueue`, the run loop and the `Completion` signal
//! - **handler**: `TaskHandler`, an async alternative to callback bodies
//! - **observability**: `QueueCounts`
//! - **error**: `QueueError`

pub mod domain;
pub mod error;
pub mod handler;
pub mod observability;
pub mod ports;
pub mod queue;

pub use domain::{
    AlwaysContinue, CompletionPolicy, Decision, StopOnError, StopReason, StopReport, Task,
    TaskBuilder, TaskError, TaskId, TaskResult,
};
pub use error::QueueError;
pub use handler::TaskHandler;
pub use queue::{Completion, QueueConfig, RunPhase, TaskQueue, WeakTaskQueue};
