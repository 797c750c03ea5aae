//! Fan-out of lifecycle events to dynamically registered subscribers.
//!
//! Each subscriber owns a bounded queue. Broadcast uses a non-blocking send
//! and drops the event for a subscriber whose queue is full, so one stalled
//! consumer can never block the producer or its peers. Subscribers that need
//! every event must drain their queue promptly; the state store remains the
//! source of truth either way.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::event::DomainEvent;

/// Default per-subscriber queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Unique handle identifying one subscription.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Receiving side of one subscription.
///
/// The channel is closed when the subscription is removed via
/// [`EventBus::unsubscribe`] or when the bus is dropped.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: Receiver<DomainEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Block until the next event is available.
    pub fn recv(&self) -> Result<DomainEvent, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Result<DomainEvent, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for an event.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<DomainEvent, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Process-wide fan-out of [`DomainEvent`]s.
///
/// The subscriber map is the only shared mutable structure: broadcast holds
/// the read lock, subscribe/unsubscribe hold the write lock. Removal under
/// the write lock drops the send side, which closes the subscriber's channel;
/// a concurrent broadcast can therefore never send on a closed channel it
/// still observes — `try_send` on a disconnected sender just reports it.
#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    subscribers: RwLock<HashMap<SubscriptionId, SyncSender<DomainEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// A bus whose subscribers each get a queue of `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new subscriber and return its receive side.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        let id = SubscriptionId::new();
        self.subscribers
            .write()
            .expect("subscriber map lock poisoned")
            .insert(id, tx);
        debug!(subscription = %id, "event bus subscriber added");
        Subscription { id, receiver: rx }
    }

    /// Remove a subscription, closing its channel. Returns false if the id
    /// was not (or no longer) registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self
            .subscribers
            .write()
            .expect("subscriber map lock poisoned")
            .remove(&id)
            .is_some();
        if removed {
            debug!(subscription = %id, "event bus subscriber removed");
        }
        removed
    }

    /// Deliver `event` to every current subscriber; returns how many
    /// subscribers received it. Full queues drop the event for that
    /// subscriber; hung-up subscribers are reaped.
    pub fn broadcast(&self, event: &DomainEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let subs = self
                .subscribers
                .read()
                .expect("subscriber map lock poisoned");
            for (id, tx) in subs.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(subscription = %id, kind = ?event.kind, "subscriber queue full, dropping event");
                    }
                    Err(TrySendError::Disconnected(_)) => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut subs = self
                .subscribers
                .write()
                .expect("subscriber map lock poisoned");
            for id in dead {
                subs.remove(&id);
                debug!(subscription = %id, "reaped hung-up subscriber");
            }
        }

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber map lock poisoned")
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use zonekeeper_core::OrgId;

    use super::*;

    fn event() -> DomainEvent {
        DomainEvent::register_succeeded(OrgId::new(1), "test.domain")
    }

    #[test]
    fn subscription_ids_are_unique() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_ne!(a.id(), b.id());
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn broadcast_reaches_every_subscriber_exactly_once() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        assert_eq!(bus.broadcast(&event()), 2);

        assert_eq!(a.try_recv().unwrap(), event());
        assert_eq!(b.try_recv().unwrap(), event());
        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn unsubscribed_channel_is_closed_and_silent() {
        let bus = EventBus::new();
        let sub = bus.subscribe();

        assert!(bus.unsubscribe(sub.id()));
        assert_eq!(bus.broadcast(&event()), 0);
        assert_eq!(sub.try_recv(), Err(mpsc::TryRecvError::Disconnected));

        // Second unsubscribe is a no-op.
        assert!(!bus.unsubscribe(sub.id()));
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let bus = EventBus::with_capacity(1);
        let sub = bus.subscribe();

        assert_eq!(bus.broadcast(&event()), 1);
        // Queue is now full; this must not block the broadcaster.
        assert_eq!(bus.broadcast(&event()), 0);

        assert!(sub.try_recv().is_ok());
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriber_is_reaped_on_broadcast() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        drop(sub);

        assert_eq!(bus.broadcast(&event()), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
