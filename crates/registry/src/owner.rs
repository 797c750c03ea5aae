//! Directory of organizations that still own their registrations.

use zonekeeper_core::{DnsResult, OrgId};

/// Answers which organizations currently exist. The garbage collector
/// unregisters domains whose owning organization is no longer listed.
pub trait OwnerDirectory: Send + Sync {
    fn active_organizations(&self) -> DnsResult<Vec<OrgId>>;
}
