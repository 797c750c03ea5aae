//! Background relay from the provider notification channel to the bus.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::bus::EventBus;
use crate::event::DomainEvent;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One background thread draining the lifecycle notification channel and
/// broadcasting each event on the bus. Exits when shut down or when every
/// producer has hung up.
#[derive(Debug)]
pub struct EventRelay {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl EventRelay {
    pub fn spawn(source: Receiver<DomainEvent>, bus: Arc<EventBus>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("dns-event-relay".to_string())
            .spawn(move || relay_loop(source, bus, shutdown_rx))
            .expect("failed to spawn event relay thread");

        Self {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }

    /// Request shutdown and wait for the relay thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

fn relay_loop(source: Receiver<DomainEvent>, bus: Arc<EventBus>, shutdown_rx: Receiver<()>) {
    info!("event relay started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match source.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                let delivered = bus.broadcast(&event);
                debug!(kind = ?event.kind, domain = %event.domain, delivered, "relayed event");
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("event relay stopped");
}

#[cfg(test)]
mod tests {
    use zonekeeper_core::OrgId;

    use super::*;

    #[test]
    fn relays_events_from_source_to_subscribers() {
        let bus = Arc::new(EventBus::new());
        let sub = bus.subscribe();

        let (tx, rx) = mpsc::channel();
        let relay = EventRelay::spawn(rx, bus.clone());

        let event = DomainEvent::unregister_succeeded(OrgId::new(1), "test.domain");
        tx.send(event.clone()).unwrap();

        let got = sub.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, event);

        relay.shutdown();
    }

    #[test]
    fn exits_when_producer_hangs_up() {
        let bus = Arc::new(EventBus::new());
        let (tx, rx) = mpsc::channel::<DomainEvent>();
        let relay = EventRelay::spawn(rx, bus);

        drop(tx);
        // shutdown() joins; the thread must have exited on its own already.
        relay.shutdown();
    }
}
