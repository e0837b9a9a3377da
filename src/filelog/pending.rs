//! Pre-open queue
//!
//! Holds formatted records published before the sink has a directory.
//! Producers enqueue under a short lock; the writer drains the whole
//! queue, in order, before it writes anything newer.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Unbounded FIFO of formatted records
#[derive(Debug, Default)]
pub struct PendingQueue {
    queue: Mutex<VecDeque<String>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `record` if `still_pending()` holds under the queue lock
    ///
    /// Hands the record back when the check fails, so the caller can
    /// route it elsewhere.
    pub fn push_while(
        &self,
        record: String,
        still_pending: impl FnOnce() -> bool,
    ) -> Result<(), String> {
        let mut queue = self.queue.lock();
        if !still_pending() {
            return Err(record);
        }
        queue.push_back(record);
        Ok(())
    }

    /// Run `f` while holding the queue lock
    ///
    /// Lifecycle transitions out of `Initial` go through here so that no
    /// producer can enqueue after the transition.
    pub fn gate<R>(&self, f: impl FnOnce() -> R) -> R {
        let _queue = self.queue.lock();
        f()
    }

    /// Remove and return everything queued, oldest first
    pub fn take_all(&self) -> VecDeque<String> {
        std::mem::take(&mut *self.queue.lock())
    }

    /// Put records back at the front, ahead of anything queued since
    pub fn restore(&self, mut records: VecDeque<String>) {
        if records.is_empty() {
            return;
        }
        let mut queue = self.queue.lock();
        records.append(&mut queue);
        *queue = records;
    }

    /// Drop everything queued, returning how many records were discarded
    pub fn clear(&self) -> usize {
        let mut queue = self.queue.lock();
        let n = queue.len();
        queue.clear();
        n
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }
}
