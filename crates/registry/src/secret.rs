//! Secret sink contract for generated access-key material.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use zonekeeper_core::{CallContext, DnsError, OrgId};

/// Tag marking a secret as internal/hidden from user-facing listings.
pub const TAG_HIDDEN: &str = "hidden";
/// Tag grouping secrets owned by the DNS subsystem.
pub const TAG_ROUTE53: &str = "route53";

/// Key under which the access key id is stored in the secret values.
pub const ACCESS_KEY_ID: &str = "access_key_id";
/// Key under which the secret access key is stored in the secret values.
pub const SECRET_ACCESS_KEY: &str = "secret_access_key";

/// Deterministic name for the access-key secret of one registration, derived
/// from the domain so both the register and unregister paths can compute it.
pub fn access_key_secret_name(domain: &str) -> String {
    format!("route53.{domain}")
}

/// An opaque secret held by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub id: Uuid,
    pub organization_id: OrgId,
    pub name: String,
    pub values: HashMap<String, String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretSinkError {
    #[error("secret not found")]
    NotFound,
    #[error("secret storage error: {0}")]
    Storage(String),
}

impl From<SecretSinkError> for DnsError {
    fn from(err: SecretSinkError) -> Self {
        DnsError::Secret(err.to_string())
    }
}

/// Stores generated credential material as opaque, taggable secrets.
/// Backed by an external secret store; internals are out of scope here.
pub trait SecretSink: Send + Sync {
    /// Store a secret; returns its id.
    fn store(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        name: &str,
        values: HashMap<String, String>,
        tags: &[String],
    ) -> Result<Uuid, SecretSinkError>;

    /// Delete a secret by id; fails with `NotFound` if absent.
    fn delete(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        secret_id: Uuid,
    ) -> Result<(), SecretSinkError>;

    /// Look up one secret by name within an organization.
    fn find_by_name(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        name: &str,
    ) -> Result<Option<StoredSecret>, SecretSinkError>;
}
