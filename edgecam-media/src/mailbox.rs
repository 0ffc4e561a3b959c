//! Single-slot, latest-wins handoff between threads.
//!
//! A producer posting into a full mailbox replaces the waiting item and gets
//! the old one back, so nothing queues up behind a slow consumer. Returned
//! items can be recycled to avoid per-frame allocation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What happened to a posted item.
#[derive(Debug, PartialEq, Eq)]
pub enum Posted<T> {
    /// The slot was empty.
    Delivered,
    /// The slot held an undelivered item, which is returned.
    Replaced(T),
    /// The mailbox is closed; the posted item is returned.
    Closed(T),
}

/// Result of a blocking receive.
#[derive(Debug, PartialEq, Eq)]
pub enum Recv<T> {
    Item(T),
    Timeout,
    /// Closed and drained.
    Closed,
}

#[derive(Debug)]
struct Slot<T> {
    item: Option<T>,
    closed: bool,
}

/// Single-slot mailbox with drop-oldest semantics.
#[derive(Debug)]
pub struct FrameMailbox<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    dropped: AtomicU64,
}

impl<T> Default for FrameMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameMailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                item: None,
                closed: false,
            }),
            ready: Condvar::new(),
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `item` in the slot, displacing any item still waiting.
    pub fn post(&self, item: T) -> Posted<T> {
        let mut slot = self.lock();
        if slot.closed {
            return Posted::Closed(item);
        }
        let previous = slot.item.replace(item);
        drop(slot);
        self.ready.notify_one();

        match previous {
            Some(old) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Posted::Replaced(old)
            }
            None => Posted::Delivered,
        }
    }

    /// Take the waiting item without blocking.
    pub fn take(&self) -> Option<T> {
        self.lock().item.take()
    }

    /// Wait up to `timeout` for an item.
    ///
    /// An item still waiting when the mailbox is closed is returned before
    /// [`Recv::Closed`].
    pub fn recv_timeout(&self, timeout: Duration) -> Recv<T> {
        let slot = self.lock();
        let (mut slot, _) = self
            .ready
            .wait_timeout_while(slot, timeout, |s| s.item.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);

        match slot.item.take() {
            Some(item) => Recv::Item(item),
            None if slot.closed => Recv::Closed,
            None => Recv::Timeout,
        }
    }

    /// Refuse further posts and wake any waiting receiver.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items displaced by a newer post.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
