//! Progress messages from a running task to its observers.

use crate::wake::VortonRow;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One progress record.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskMessage {
    /// Free-text log line.
    Log(String),
    /// Vorton snapshot after a wake iteration.
    LiveUpdate {
        /// Control value of the operating point being evaluated.
        control: f64,
        vortons: Vec<VortonRow>,
    },
}

/// FIFO queue shared between the worker and any number of readers.
#[derive(Debug, Default)]
pub struct MessageQueue {
    queue: Mutex<VecDeque<TaskMessage>>,
    available: Condvar,
}

impl MessageQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking reader cannot leave the deque half-modified.
    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskMessage>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a message and wakes every waiting reader.
    pub fn push(&self, message: TaskMessage) {
        self.lock().push_back(message);
        self.available.notify_all();
    }

    /// Appends a log line.
    pub fn log(&self, line: impl Into<String>) {
        self.push(TaskMessage::Log(line.into()));
    }

    #[must_use]
    pub fn try_pop(&self) -> Option<TaskMessage> {
        self.lock().pop_front()
    }

    /// Waits up to `timeout` for a message.
    #[must_use]
    pub fn wait_pop(&self, timeout: Duration) -> Option<TaskMessage> {
        let guard = self.lock();
        let (mut guard, _) = self
            .available
            .wait_timeout_while(guard, timeout, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        guard.pop_front()
    }

    /// Removes and returns every queued message, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<TaskMessage> {
        self.lock().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = MessageQueue::new();
        queue.log("first");
        queue.log("second");
        assert_eq!(queue.try_pop(), Some(TaskMessage::Log("first".into())));
        assert_eq!(queue.drain(), vec![TaskMessage::Log("second".into())]);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_wait_pop_times_out_when_empty() {
        let queue = MessageQueue::new();
        assert!(queue.wait_pop(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_wait_pop_wakes_on_push() {
        let queue = Arc::new(MessageQueue::new());
        let reader = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_pop(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(10));
        queue.log("ready");
        assert_eq!(
            reader.join().unwrap(),
            Some(TaskMessage::Log("ready".into()))
        );
    }
}
