//! Best-effort change notification.
//!
//! The [`Notifier`] keeps a registry of bounded per-subscriber queues. A
//! broadcast never waits: a full queue loses that delivery, and a queue
//! whose receiving side is gone is pruned from the registry. Subscribers
//! only see events broadcast after they registered.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::event::Event;

/// Identifier of one registration, unique per [`Notifier`].
pub type SubscriptionId = u64;

#[derive(Debug, Default)]
struct Registry {
    next_id: SubscriptionId,
    // Ordered so deliveries go out in registration order.
    senders: BTreeMap<SubscriptionId, mpsc::Sender<Event>>,
}

impl Registry {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        self.senders.remove(&id).is_some()
    }
}

/// Registry of subscriber queues.
#[derive(Debug, Clone)]
pub struct Notifier {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl Notifier {
    /// Create a notifier whose queues hold `capacity` events (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber. No past events are replayed.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = {
            let mut registry = self.registry.lock();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.senders.insert(id, sender);
            id
        };
        tracing::debug!(subscription = id, capacity = self.capacity, "subscribed");

        Subscription {
            id,
            receiver,
            handle: CancelHandle {
                id,
                registry: Arc::downgrade(&self.registry),
            },
        }
    }

    /// Offer `event` to every live subscriber without blocking.
    ///
    /// Returns the number of queues that accepted it.
    pub fn broadcast(&self, event: &Event) -> usize {
        let mut registry = self.registry.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (&id, sender) in &registry.senders {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(subscription = id, event = event.id, "queue full, dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            registry.remove(id);
            tracing::debug!(subscription = id, "pruned closed subscriber");
        }

        delivered
    }

    /// Number of live registrations.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().senders.len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

/// Detached handle that cancels a [`Subscription`] from anywhere.
///
/// Cancelling more than once, or after the notifier is gone, is a no-op.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: SubscriptionId,
    registry: Weak<Mutex<Registry>>,
}

impl CancelHandle {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the registration. Returns `true` if this call removed it.
    pub fn cancel(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let removed = registry.lock().remove(self.id);
        if removed {
            tracing::debug!(subscription = self.id, "cancelled");
        }
        removed
    }
}

/// A live registration and its receiving queue.
///
/// Events buffered before cancellation can still be received; after that
/// the queue reports closed. Dropping the subscription cancels it.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<Event>,
    handle: CancelHandle,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next event. `None` once cancelled and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take the next buffered event without waiting.
    ///
    /// # Errors
    ///
    /// [`TryRecvError::Empty`] if nothing is buffered yet, or
    /// [`TryRecvError::Disconnected`] once cancelled and drained.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Blocking variant of [`Subscription::recv`] for synchronous callers.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<Event> {
        self.receiver.blocking_recv()
    }

    /// Stop receiving new events. Idempotent.
    pub fn cancel(&self) -> bool {
        self.handle.cancel()
    }

    /// A handle that can cancel this subscription from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("buffered", &self.receiver.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}
