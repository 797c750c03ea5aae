//! Static owner directory for tests/dev.

use std::collections::HashSet;
use std::sync::RwLock;

use zonekeeper_core::{DnsResult, OrgId};
use zonekeeper_registry::OwnerDirectory;

/// [`OwnerDirectory`] over an explicit, mutable set of organizations.
#[derive(Debug, Default)]
pub struct StaticOwnerDirectory {
    active: RwLock<HashSet<OrgId>>,
}

impl StaticOwnerDirectory {
    pub fn new(orgs: impl IntoIterator<Item = OrgId>) -> Self {
        Self {
            active: RwLock::new(orgs.into_iter().collect()),
        }
    }

    pub fn add(&self, org: OrgId) {
        self.active.write().unwrap().insert(org);
    }

    pub fn remove(&self, org: OrgId) {
        self.active.write().unwrap().remove(&org);
    }
}

impl OwnerDirectory for StaticOwnerDirectory {
    fn active_organizations(&self) -> DnsResult<Vec<OrgId>> {
        Ok(self.active.read().unwrap().iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_membership() {
        let dir = StaticOwnerDirectory::new([OrgId::new(1)]);
        assert_eq!(dir.active_organizations().unwrap(), vec![OrgId::new(1)]);

        dir.add(OrgId::new(2));
        dir.remove(OrgId::new(1));
        assert_eq!(dir.active_organizations().unwrap(), vec![OrgId::new(2)]);
    }
}
