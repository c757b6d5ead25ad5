//! Single-slot mailbox used to hand metadata snapshots to subscribers.
//!
//! Publishing never blocks: a value that was never received is replaced by the
//! newer one. Receiving waits until a value is present. The producer side of
//! an ICY stream therefore never stalls on a slow (or absent) subscriber, and
//! at most one value is ever retained.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::Notify;
use tracing::trace;

/// Error returned by [`Receiver::try_recv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// Nothing has been published since the last receive.
    Empty,
    /// The sender is gone and the slot is empty.
    Closed,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::Empty => f.write_str("mailbox is empty"),
            TryRecvError::Closed => f.write_str("mailbox is closed"),
        }
    }
}

impl std::error::Error for TryRecvError {}

struct State<T> {
    value: Option<T>,
    closed: bool,
    published: u64,
    replaced: u64,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // The critical sections never panic mid-update, so a poisoned slot is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a mailbox and return its two halves.
pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State {
            value: None,
            closed: false,
            published: 0,
            replaced: 0,
        }),
        notify: Notify::new(),
    });

    (
        Sender {
            inner: inner.clone(),
        },
        Receiver { inner },
    )
}

/// Publishing half. Dropping it closes the mailbox.
pub struct Sender<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Sender<T> {
    /// Store `value`, replacing any value that was never received.
    ///
    /// Returns `true` when an unread value was discarded.
    pub fn publish(&self, value: T) -> bool {
        let replaced = {
            let mut state = self.inner.lock();
            let replaced = state.value.replace(value).is_some();
            state.published += 1;
            if replaced {
                state.replaced += 1;
                trace!(
                    "mailbox: unread value replaced ({} of {} published)",
                    state.replaced,
                    state.published
                );
            }
            replaced
        };
        self.inner.notify.notify_one();
        replaced
    }

    /// Total number of values published so far
    pub fn published(&self) -> u64 {
        self.inner.lock().published
    }

    /// Whether the receiving half has been dropped
    pub fn is_closed(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.inner.lock().closed = true;
        self.inner.notify.notify_one();
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

/// Receiving half.
pub struct Receiver<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Receiver<T> {
    /// Wait for the next value.
    ///
    /// Returns immediately when a value is already waiting. Returns `None`
    /// once the sender is dropped and no value is left.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            // notify_one stores a permit when nobody waits, so a publish
            // landing between this check and `notified()` is not lost.
            match self.try_recv() {
                Ok(value) => return Some(value),
                Err(TryRecvError::Closed) => return None,
                Err(TryRecvError::Empty) => self.inner.notify.notified().await,
            }
        }
    }

    /// Take the waiting value without blocking.
    pub fn try_recv(&mut self) -> Result<T, TryRecvError> {
        let mut state = self.inner.lock();
        match state.value.take() {
            Some(value) => Ok(value),
            None if state.closed => Err(TryRecvError::Closed),
            None => Err(TryRecvError::Empty),
        }
    }

    /// Blocking variant of [`recv`](Self::recv) for synchronous threads.
    ///
    /// Must not be called from within an async task: it parks the calling
    /// thread until a value arrives.
    pub fn blocking_recv(&mut self) -> Option<T> {
        futures::executor::block_on(self.recv())
    }

    /// Whether the sender is gone. A value may still be waiting.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}
