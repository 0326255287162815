//! Domain model (task ids, tasks, errors, decisions, stop reports).

pub mod decision;
pub mod errors;
pub mod ids;
pub mod stop;
pub mod task;

pub use decision::{AlwaysContinue, CompletionPolicy, Decision, FnPolicy, StopOnError};
pub use errors::{ErrorKind, TaskError, TaskResult};
pub use ids::TaskId;
pub use stop::{StopReason, StopReport};
pub use task::{Task, TaskBody, TaskBuilder, TaskInfo};
