//! `zonekeeper-events` — lifecycle event model and fan-out.
//!
//! Register/unregister outcomes are published on an internal notification
//! channel, drained by a single [`relay::EventRelay`] thread, and broadcast
//! by the [`bus::EventBus`] to dynamically registered subscribers. Delivery
//! is best-effort: subscribers get bounded queues and slow consumers lose
//! events rather than stalling the producer.

pub mod bus;
pub mod event;
pub mod relay;

pub use bus::{EventBus, Subscription, SubscriptionId};
pub use event::{DomainEvent, DomainEventKind};
pub use relay::EventRelay;
