//! Ports: seams for the queue's sources of time and identity.
//!
//! Both are injected through [`TaskQueue::with_parts`](crate::queue::TaskQueue::with_parts)
//! so tests can pin timestamps and id sequences.

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, SequentialIdGenerator};
