//! External DNS + identity provider contract.
//!
//! Modeled on Route53/IAM: hosted zone CRUD plus the least-privilege identity
//! (policy, user, access key) scoped to one zone. Implementations wrap a
//! concrete cloud SDK; the in-memory double lives in the infra crate.

use thiserror::Error;

use zonekeeper_core::{CallContext, DnsError, DomainName};

/// A freshly minted access key pair. The secret is only ever held in memory
/// long enough to hand it to the secret sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKey {
    pub id: String,
    pub secret: String,
}

/// Raw provider failure. `code` carries the provider-specific structured
/// error code when one was present (e.g. IAM's `EntityAlreadyExists`);
/// generic transport failures leave it empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    /// A generic failure without a structured code.
    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            code: None,
            message: msg.into(),
        }
    }

    /// A provider-specific structured failure.
    pub fn coded(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: msg.into(),
        }
    }

    /// Extract the human-readable form, distinguishing structured provider
    /// errors from generic ones.
    pub fn human_message(&self) -> String {
        match &self.code {
            Some(code) => format!("{code}: {}", self.message),
            None => self.message.clone(),
        }
    }

    /// The resource this call targeted no longer exists at the provider.
    /// Teardown treats these as already-deleted and moves on, which lets a
    /// FAILED record whose resources were rolled back still be collected.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some("NoSuchHostedZone") | Some("NoSuchEntity")
        )
    }
}

impl From<ProviderError> for DnsError {
    fn from(err: ProviderError) -> Self {
        let message = err.human_message();
        DnsError::Provider {
            code: err.code,
            message,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Synchronous DNS + identity operations against the external provider.
///
/// Every call observes the [`CallContext`]; a cancelled context is reported
/// as a provider failure and handled by the saga like any other failure.
pub trait DnsProvider: Send + Sync {
    /// Global existence check, independent of tenant. Guards against a
    /// different organization already owning the DNS name.
    fn hosted_zone_exists(&self, ctx: &CallContext, domain: &DomainName) -> ProviderResult<bool>;

    fn create_hosted_zone(&self, ctx: &CallContext, domain: &DomainName)
    -> ProviderResult<String>;

    fn delete_hosted_zone(&self, ctx: &CallContext, zone_id: &str) -> ProviderResult<()>;

    /// Create the zone-scoped access policy; returns its ARN.
    fn create_policy(&self, ctx: &CallContext, zone_id: &str) -> ProviderResult<String>;

    fn delete_policy(&self, ctx: &CallContext, policy_arn: &str) -> ProviderResult<()>;

    /// Create the IAM user; returns the canonical user name.
    fn create_user(&self, ctx: &CallContext, user: &str) -> ProviderResult<String>;

    fn delete_user(&self, ctx: &CallContext, user: &str) -> ProviderResult<()>;

    fn attach_policy(&self, ctx: &CallContext, user: &str, policy_arn: &str)
    -> ProviderResult<()>;

    fn detach_policy(&self, ctx: &CallContext, user: &str, policy_arn: &str)
    -> ProviderResult<()>;

    fn create_access_key(&self, ctx: &CallContext, user: &str) -> ProviderResult<AccessKey>;

    fn delete_access_key(&self, ctx: &CallContext, user: &str, key_id: &str)
    -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_errors_extract_verbatim() {
        let err = ProviderError::message("some error");
        assert_eq!(err.human_message(), "some error");

        let dns: DnsError = err.into();
        assert_eq!(dns.to_string(), "some error");
    }

    #[test]
    fn coded_errors_extract_with_code() {
        let err = ProviderError::coded("NoSuchHostedZone", "zone gone");
        assert_eq!(err.human_message(), "NoSuchHostedZone: zone gone");

        let dns: DnsError = err.into();
        assert!(matches!(dns, DnsError::Provider { code: Some(ref c), .. } if c == "NoSuchHostedZone"));
    }
}
