//! Queue module: the task container, its run loop and the completion signal.

mod completion;
mod config;
mod memory;
mod state;

pub use completion::Completion;
pub use config::{ConfigError, QueueConfig};
pub use memory::{TaskQueue, WeakTaskQueue};
pub use state::RunPhase;
