use async_trait::async_trait;

use crate::domain::TaskResult;

/// An async alternative to callback bodies.
///
/// Handlers are shared (`Arc<dyn TaskHandler<S, R>>`), so one handler can back
/// many tasks. The returned result becomes the task's completion signal.
#[async_trait]
pub trait TaskHandler<S, R>: Send + Sync
where
    S: Send + 'static,
    R: Send + 'static,
{
    async fn handle(&self, state: S) -> TaskResult<R>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::domain::{StopReason, TaskBuilder, TaskError};
    use crate::queue::TaskQueue;

    struct Countdown;

    #[async_trait]
    impl TaskHandler<Arc<AtomicU32>, u32> for Countdown {
        async fn handle(&self, state: Arc<AtomicU32>) -> TaskResult<u32> {
            let left = state.load(Ordering::SeqCst);
            if left == 0 {
                return Err(TaskError::new("nothing left"));
            }
            state.fetch_sub(1, Ordering::SeqCst);
            Ok(left)
        }
    }

    #[tokio::test]
    async fn shared_handler_backs_several_tasks() {
        let queue: TaskQueue<Arc<AtomicU32>, u32> = TaskQueue::new();
        let handler: Arc<dyn TaskHandler<Arc<AtomicU32>, u32>> = Arc::new(Countdown);
        for _ in 0..3 {
            queue
                .push(TaskBuilder::new().handler(Arc::clone(&handler)))
                .unwrap();
        }

        let report = queue.run(Arc::new(AtomicU32::new(2))).await.unwrap();

        assert_eq!(report.reason, StopReason::Stopped);
        assert_eq!(report.error().map(|e| e.message.as_str()), Some("nothing left"));
        assert_eq!(report.state.load(Ordering::SeqCst), 0);
        assert!(queue.is_empty());
    }
}
