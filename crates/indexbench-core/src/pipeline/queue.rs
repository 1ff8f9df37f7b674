//! Work queue between the producer and the worker pool.
//!
//! Multi-consumer channel: every worker holds a clone of the receiver and
//! each item is delivered to exactly one of them. Dropping the last sender
//! closes the queue; workers drain what is left and then see the end.

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Queue sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueCapacity {
    /// Producer blocks once this many items are waiting. Zero is a rendezvous
    /// channel: every send waits for a worker to take the item.
    Bounded(usize),
    Unbounded,
}

impl Default for QueueCapacity {
    fn default() -> Self {
        QueueCapacity::Bounded(8)
    }
}

/// Create a work queue with the given capacity
pub fn work_queue<T>(capacity: QueueCapacity) -> (Sender<T>, Receiver<T>) {
    match capacity {
        QueueCapacity::Bounded(n) => crossbeam_channel::bounded(n),
        QueueCapacity::Unbounded => crossbeam_channel::unbounded(),
    }
}
