//! Cooperative cancellation and deadlines for external calls.
//!
//! Every provider/state-store/secret-sink call accepts a `CallContext`.
//! Cancellation is observed between saga steps and treated exactly like a
//! step failure: already-completed work is compensated. Rollback itself always
//! runs under a fresh, never-cancelled context.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::{DnsError, DnsResult};

/// Cancellation flag plus optional deadline, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never cancels. Used for rollback and background
    /// reconciliation, which must run to completion.
    pub fn none() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Request cancellation. Visible to all clones of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Fail fast with `DnsError::Cancelled` if the context is done.
    pub fn check(&self) -> DnsResult<()> {
        if self.is_cancelled() {
            Err(DnsError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_passes_check() {
        assert!(CallContext::none().check().is_ok());
    }

    #[test]
    fn cancel_trips_all_clones() {
        let ctx = CallContext::none();
        let clone = ctx.clone();
        ctx.cancel();
        assert_eq!(clone.check(), Err(DnsError::Cancelled));
    }

    #[test]
    fn expired_deadline_trips_check() {
        let ctx = CallContext::with_timeout(Duration::from_secs(0));
        assert_eq!(ctx.check(), Err(DnsError::Cancelled));
    }

    #[test]
    fn future_deadline_passes_check() {
        let ctx = CallContext::with_timeout(Duration::from_secs(3600));
        assert!(ctx.check().is_ok());
    }
}
