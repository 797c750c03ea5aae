//! Persisted registration state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zonekeeper_core::{DomainName, OrgId};

/// Lifecycle status of one registration record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Creating,
    Created,
    Failed,
    Removing,
}

impl RegistrationStatus {
    /// Terminal states are inspectable end points; CREATING/REMOVING indicate
    /// work interrupted mid-flight and are reconciled at startup.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Created | Self::Failed)
    }
}

/// The durable record of one domain's registration, keyed by
/// `(organization_id, domain)`.
///
/// Sub-resource identifiers are populated strictly left-to-right in
/// provisioning order (`hosted_zone_id`, `policy_arn`, `iam_user`,
/// `access_key_id`); a later field is never set while an earlier one is
/// empty. `Created` implies all four are present. During teardown each field
/// is cleared as soon as its resource is deleted, which is what makes a
/// retried unregister skip already-removed sub-resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainState {
    pub organization_id: OrgId,
    pub domain: String,

    pub hosted_zone_id: Option<String>,
    pub policy_arn: Option<String>,
    pub iam_user: Option<String>,
    pub access_key_id: Option<String>,

    pub status: RegistrationStatus,
    /// Last failure description; present only when `status` is `Failed`.
    pub err_msg: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DomainState {
    /// A fresh record in CREATING, persisted before any external call.
    pub fn new(organization_id: OrgId, domain: &DomainName) -> Self {
        Self {
            organization_id,
            domain: domain.as_str().to_string(),
            hosted_zone_id: None,
            policy_arn: None,
            iam_user: None,
            access_key_id: None,
            status: RegistrationStatus::Creating,
            err_msg: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_created(&mut self) {
        self.status = RegistrationStatus::Created;
        self.err_msg = None;
    }

    pub fn mark_failed(&mut self, msg: impl Into<String>) {
        self.status = RegistrationStatus::Failed;
        self.err_msg = Some(msg.into());
    }

    pub fn mark_removing(&mut self) {
        self.status = RegistrationStatus::Removing;
        self.err_msg = None;
    }

    pub fn is_fully_provisioned(&self) -> bool {
        self.hosted_zone_id.is_some()
            && self.policy_arn.is_some()
            && self.iam_user.is_some()
            && self.access_key_id.is_some()
    }
}
