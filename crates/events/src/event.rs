//! Domain lifecycle events.
//!
//! Events are ephemeral notifications of register/unregister outcomes. They
//! are never persisted; the state store is the source of truth.

use serde::{Deserialize, Serialize};

use zonekeeper_core::OrgId;

/// Outcome of a lifecycle operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEventKind {
    RegisterSucceeded,
    RegisterFailed,
    UnregisterSucceeded,
    UnregisterFailed,
}

impl DomainEventKind {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::RegisterFailed | Self::UnregisterFailed)
    }
}

/// One lifecycle notification, fanned out to all current subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub organization_id: OrgId,
    pub domain: String,
    pub kind: DomainEventKind,
    /// Failure description; `None` for success events.
    pub cause: Option<String>,
}

impl DomainEvent {
    pub fn register_succeeded(organization_id: OrgId, domain: impl Into<String>) -> Self {
        Self {
            organization_id,
            domain: domain.into(),
            kind: DomainEventKind::RegisterSucceeded,
            cause: None,
        }
    }

    pub fn register_failed(
        organization_id: OrgId,
        domain: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            domain: domain.into(),
            kind: DomainEventKind::RegisterFailed,
            cause: Some(cause.into()),
        }
    }

    pub fn unregister_succeeded(organization_id: OrgId, domain: impl Into<String>) -> Self {
        Self {
            organization_id,
            domain: domain.into(),
            kind: DomainEventKind::UnregisterSucceeded,
            cause: None,
        }
    }

    pub fn unregister_failed(
        organization_id: OrgId,
        domain: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            domain: domain.into(),
            kind: DomainEventKind::UnregisterFailed,
            cause: Some(cause.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_events_carry_a_cause() {
        let ev = DomainEvent::register_failed(OrgId::new(1), "test.domain", "some error");
        assert!(ev.kind.is_failure());
        assert_eq!(ev.cause.as_deref(), Some("some error"));

        let ok = DomainEvent::register_succeeded(OrgId::new(1), "test.domain");
        assert!(!ok.kind.is_failure());
        assert!(ok.cause.is_none());
    }
}
