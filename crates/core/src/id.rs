//! Strongly-typed identifiers.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DnsError;

/// Identifier of an organization (the multi-tenant boundary).
///
/// Registrations are keyed by `(OrgId, domain)`; the same DNS name can never
/// be registered by two organizations at once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(u64);

impl OrgId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for OrgId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for OrgId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<OrgId> for u64 {
    fn from(value: OrgId) -> Self {
        value.0
    }
}

impl FromStr for OrgId {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<u64>()
            .map_err(|e| DnsError::validation(format!("OrgId: {e}")))?;
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let id: OrgId = "42".parse().unwrap();
        assert_eq!(id, OrgId::new(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-number".parse::<OrgId>().is_err());
    }
}
