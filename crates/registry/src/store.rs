//! Durable CRUD contract for registration records.

use thiserror::Error;

use zonekeeper_core::{DnsError, OrgId};

use crate::state::DomainState;

/// State store failure, typed per outcome so the saga can map conflicts and
/// missing records onto its own error taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateStoreError {
    #[error("registration already exists for organization {organization_id} domain '{domain}'")]
    Conflict {
        organization_id: OrgId,
        domain: String,
    },

    #[error("no registration for organization {organization_id} domain '{domain}'")]
    NotFound {
        organization_id: OrgId,
        domain: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StateStoreError> for DnsError {
    fn from(err: StateStoreError) -> Self {
        match err {
            StateStoreError::Conflict {
                organization_id,
                domain,
            } => DnsError::already_registered(organization_id, domain),
            StateStoreError::NotFound {
                organization_id,
                domain,
            } => DnsError::not_found(organization_id, domain),
            StateStoreError::Storage(msg) => DnsError::Store(msg),
        }
    }
}

/// Durable storage for [`DomainState`], keyed by `(organization_id, domain)`.
///
/// All operations are atomic with respect to a single key; no cross-key
/// transactions are required. `create` is insert-if-absent: a duplicate key
/// surfaces as a typed `Conflict` rather than requiring a separate existence
/// check, closing the check-then-act window between two concurrent
/// registrations of the same key.
pub trait StateStore: Send + Sync {
    /// Insert a new record; fails with `Conflict` if the key already exists.
    fn create(&self, state: &DomainState) -> Result<(), StateStoreError>;

    /// Replace an existing record; fails with `NotFound` if absent.
    fn update(&self, state: &DomainState) -> Result<(), StateStoreError>;

    /// Look up one record.
    fn find(
        &self,
        organization_id: OrgId,
        domain: &str,
    ) -> Result<Option<DomainState>, StateStoreError>;

    /// Remove a record; fails with `NotFound` if absent.
    fn delete(&self, organization_id: OrgId, domain: &str) -> Result<(), StateStoreError>;

    /// All records, across organizations. Used by background reconciliation.
    fn list(&self) -> Result<Vec<DomainState>, StateStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_already_registered() {
        let err: DnsError = StateStoreError::Conflict {
            organization_id: OrgId::new(1),
            domain: "test.domain".to_string(),
        }
        .into();
        assert!(matches!(err, DnsError::AlreadyRegistered { .. }));
    }

    #[test]
    fn not_found_maps_through() {
        let err: DnsError = StateStoreError::NotFound {
            organization_id: OrgId::new(1),
            domain: "test.domain".to_string(),
        }
        .into();
        assert!(matches!(err, DnsError::NotFound { .. }));
    }
}
