//! Error model for the domain lifecycle subsystem.

use thiserror::Error;

use crate::id::OrgId;

/// Result type used across the domain lifecycle crates.
pub type DnsResult<T> = Result<T, DnsError>;

/// Errors surfaced by domain registration operations.
///
/// Conflict variants (`AlreadyRegistered`, `DomainInUse`) are not retryable
/// without caller intervention. `Provider`, `Store` and `Secret` wrap
/// collaborator failures; the saga does not auto-retry them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// A registration record already exists for this (organization, domain) key.
    #[error("domain '{domain}' is already registered for organization {organization_id}")]
    AlreadyRegistered {
        organization_id: OrgId,
        domain: String,
    },

    /// The DNS name is owned by someone else at the provider (possibly a
    /// different tenant), so registration must not proceed.
    #[error("domain '{domain}' is already in use")]
    DomainInUse { domain: String },

    /// No registration record exists for this (organization, domain) key.
    #[error("domain '{domain}' is not registered for organization {organization_id}")]
    NotFound {
        organization_id: OrgId,
        domain: String,
    },

    /// A value failed validation (e.g. malformed domain name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Wrapped DNS/identity provider failure. `message` is the extracted
    /// human-readable form; `code` is preserved for callers that match on
    /// provider-specific structured errors.
    #[error("{message}")]
    Provider {
        code: Option<String>,
        message: String,
    },

    /// State store CRUD failure.
    #[error("state store error: {0}")]
    Store(String),

    /// Secret sink failure.
    #[error("secret store error: {0}")]
    Secret(String),

    /// The call context was cancelled or its deadline expired.
    #[error("operation cancelled")]
    Cancelled,
}

impl DnsError {
    pub fn already_registered(organization_id: OrgId, domain: impl Into<String>) -> Self {
        Self::AlreadyRegistered {
            organization_id,
            domain: domain.into(),
        }
    }

    pub fn domain_in_use(domain: impl Into<String>) -> Self {
        Self::DomainInUse {
            domain: domain.into(),
        }
    }

    pub fn not_found(organization_id: OrgId, domain: impl Into<String>) -> Self {
        Self::NotFound {
            organization_id,
            domain: domain.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for the conflict family (caller intervention required).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered { .. } | Self::DomainInUse { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_classification() {
        assert!(DnsError::already_registered(OrgId::new(1), "a.io").is_conflict());
        assert!(DnsError::domain_in_use("a.io").is_conflict());
        assert!(!DnsError::not_found(OrgId::new(1), "a.io").is_conflict());
        assert!(!DnsError::Cancelled.is_conflict());
    }

    #[test]
    fn provider_error_displays_extracted_message() {
        let err = DnsError::Provider {
            code: None,
            message: "some error".to_string(),
        };
        assert_eq!(err.to_string(), "some error");
    }
}
