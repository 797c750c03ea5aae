//! Periodic garbage collection of abandoned registrations.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{error, info};

use zonekeeper_core::DnsResult;
use zonekeeper_registry::DomainRegistry;

/// Something the collector can tick. Implemented by [`DomainRegistry`];
/// tests substitute a counting fake.
pub trait Reconciler: Send + Sync {
    fn cleanup(&self) -> DnsResult<()>;
}

impl Reconciler for DomainRegistry {
    fn cleanup(&self) -> DnsResult<()> {
        DomainRegistry::cleanup(self)
    }
}

/// Garbage collector configuration.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Time between cleanup passes.
    pub interval: Duration,
    /// Thread name for logging.
    pub name: String,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            name: "dns-gc".to_string(),
        }
    }
}

impl GcConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A stopped garbage collector, ready to start.
pub struct GarbageCollector {
    reconciler: Arc<dyn Reconciler>,
    config: GcConfig,
}

impl GarbageCollector {
    pub fn new(reconciler: Arc<dyn Reconciler>, config: GcConfig) -> Self {
        Self { reconciler, config }
    }

    /// Begin the ticking background loop; each tick runs one cleanup pass.
    /// Cleanup failures are logged only, never propagated; the next tick
    /// tries again.
    pub fn start(self) -> GcHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let name = self.config.name.clone();

        let join = thread::Builder::new()
            .name(name)
            .spawn(move || gc_loop(self.reconciler, self.config, shutdown_rx))
            .expect("failed to spawn garbage collector thread");

        GcHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

/// Handle to a running garbage collector.
#[derive(Debug)]
pub struct GcHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl GcHandle {
    /// Halt the ticker and wait for the thread to exit.
    pub fn stop(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

fn gc_loop(reconciler: Arc<dyn Reconciler>, config: GcConfig, shutdown_rx: Receiver<()>) {
    info!(gc = %config.name, interval = ?config.interval, "garbage collector started");

    loop {
        match shutdown_rx.recv_timeout(config.interval) {
            Err(RecvTimeoutError::Timeout) => {
                if let Err(err) = reconciler.cleanup() {
                    error!(gc = %config.name, error = %err, "cleanup pass failed");
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(gc = %config.name, "garbage collector stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingReconciler {
        ticks: AtomicUsize,
    }

    impl Reconciler for CountingReconciler {
        fn cleanup(&self) -> DnsResult<()> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn ticks_at_least_once_within_one_and_a_half_intervals() {
        let reconciler = Arc::new(CountingReconciler::default());
        let interval = Duration::from_millis(40);
        let handle = GarbageCollector::new(
            reconciler.clone(),
            GcConfig::default().with_interval(interval).with_name("gc-test"),
        )
        .start();

        thread::sleep(interval.mul_f32(1.5));
        handle.stop();

        assert!(reconciler.ticks.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn stop_halts_the_ticker() {
        let reconciler = Arc::new(CountingReconciler::default());
        let handle = GarbageCollector::new(
            reconciler.clone(),
            GcConfig::default().with_interval(Duration::from_millis(10)),
        )
        .start();

        thread::sleep(Duration::from_millis(35));
        handle.stop();
        let after_stop = reconciler.ticks.load(Ordering::SeqCst);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(reconciler.ticks.load(Ordering::SeqCst), after_stop);
    }

    #[derive(Default)]
    struct FailingReconciler {
        ticks: AtomicUsize,
    }

    impl Reconciler for FailingReconciler {
        fn cleanup(&self) -> DnsResult<()> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Err(zonekeeper_core::DnsError::Store("down".to_string()))
        }
    }

    #[test]
    fn cleanup_failures_do_not_stop_the_loop() {
        let reconciler = Arc::new(FailingReconciler::default());
        let handle = GarbageCollector::new(
            reconciler.clone(),
            GcConfig::default().with_interval(Duration::from_millis(10)),
        )
        .start();

        thread::sleep(Duration::from_millis(45));
        handle.stop();

        assert!(reconciler.ticks.load(Ordering::SeqCst) >= 2);
    }
}
