//! FIFO between the tailer and the hub's drain loop.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use frpcd_core::LogLine;
use tokio::sync::Notify;

/// Lines kept when nothing drains the queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Bounded delivery queue for tailed lines. When full, the oldest line is dropped.
#[derive(Debug)]
pub struct LogQueue {
    lines: Mutex<VecDeque<LogLine>>,
    capacity: usize,
    notify: Notify,
}

impl Default for LogQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl LogQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue holding at most `capacity` lines (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            notify: Notify::new(),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: LogLine) {
        {
            let mut lines = self.lock();
            if lines.len() >= self.capacity {
                lines.pop_front();
            }
            lines.push_back(line);
        }
        self.notify.notify_one();
    }

    /// Take every queued line, oldest first.
    pub fn drain(&self) -> Vec<LogLine> {
        self.lock().drain(..).collect()
    }

    /// Discard every queued line.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait until at least one push happened since the last wakeup.
    ///
    /// `Notify` stores a permit, so a push racing with this call is not lost.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}
