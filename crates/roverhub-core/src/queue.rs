//! FIFO queues shared between workers.
//!
//! Tokio's mpsc channels hand the receiving end to one owner, but a mode
//! change must be able to clear the command and waypoint queues from
//! *outside* the consuming worker. So the queues here are a locked
//! `VecDeque` plus a [`Notify`], exposed through enqueue/dequeue
//! operations only.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

/// An unbounded multi-producer FIFO with external clearing.
///
/// Each queue in the hub has exactly one consuming worker; producers may
/// be any number of workers.
pub struct SharedQueue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> SharedQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn inner(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one item and wake the consumer.
    pub fn push(&self, item: T) {
        self.inner().push_back(item);
        self.notify.notify_one();
    }

    /// Append every item of `iter` in order.
    pub fn extend(&self, iter: impl IntoIterator<Item = T>) {
        let mut items = self.inner();
        items.extend(iter);
        drop(items);
        self.notify.notify_one();
    }

    /// Wait for and remove the front item.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.notify.notified();
            if let Some(item) = self.inner().pop_front() {
                return item;
            }
            notified.await;
        }
    }

    /// Remove the front item if one is queued.
    pub fn try_pop(&self) -> Option<T> {
        self.inner().pop_front()
    }

    /// Discard everything. Returns how many items were dropped.
    pub fn clear(&self) -> usize {
        let mut items = self.inner();
        let dropped = items.len();
        items.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.inner().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner().is_empty()
    }
}

impl<T> Default for SharedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
