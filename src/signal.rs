//! Signal - Typed notification fan-out
//!
//! Two ways to listen:
//! - synchronous callbacks via [`Signal::connect`], invoked on the emitting
//!   thread and removed when the returned [`Subscription`] is dropped
//! - an async stream via [`Signal::stream`] backed by a broadcast channel;
//!   slow readers skip what they missed

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::trace;

/// Broadcast buffer used by [`Signal::new`]
pub const DEFAULT_STREAM_CAPACITY: usize = 256;

type SlotFn<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    slots: RwLock<Vec<(u64, SlotFn<E>)>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<E>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<E: Send + Sync> Detach for Inner<E> {
    fn detach(&self, id: u64) {
        let removed = {
            let mut slots = self.slots.write();
            slots
                .iter()
                .position(|(slot_id, _)| *slot_id == id)
                .map(|index| slots.remove(index))
        };
        // Callback drops outside the lock
        drop(removed);
    }
}

/// Multi-listener notification source
pub struct Signal<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for Signal<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone + Send + Sync + 'static> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + Sync + 'static> Signal<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STREAM_CAPACITY)
    }

    /// Create a signal whose stream buffers up to `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                slots: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                tx,
            }),
        }
    }

    /// Register a callback; it stays registered while the handle lives
    #[must_use = "dropping the subscription disconnects the callback"]
    pub fn connect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.slots.write().push((id, Arc::new(callback)));

        let inner: Arc<dyn Detach> = self.inner.clone();
        Subscription {
            id,
            owner: Arc::downgrade(&inner),
        }
    }

    /// Deliver an event to every callback, then to stream readers
    ///
    /// The slot list is copied before any callback runs, so callbacks may
    /// connect or drop subscriptions without deadlocking.
    pub fn emit(&self, event: E) {
        let slots: Vec<SlotFn<E>> = self
            .inner
            .slots
            .read()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();

        for slot in &slots {
            slot(&event);
        }

        if self.inner.tx.receiver_count() > 0 {
            let _ = self.inner.tx.send(event);
        }
        trace!(callbacks = slots.len(), "Signal emitted");
    }

    /// Raw broadcast receiver
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.inner.tx.subscribe()
    }

    /// Async view of future events; lagged events are skipped
    pub fn stream(&self) -> impl Stream<Item = E> + Send + 'static {
        BroadcastStream::new(self.inner.tx.subscribe()).filter_map(|item| item.ok())
    }

    /// Number of connected callbacks
    pub fn callback_count(&self) -> usize {
        self.inner.slots.read().len()
    }
}

/// Handle that keeps a callback connected
///
/// Holds only a weak reference to the signal; dropping it after the signal
/// is gone is a no-op.
pub struct Subscription {
    id: u64,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    /// Disconnect now (same as dropping)
    pub fn disconnect(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.detach(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
