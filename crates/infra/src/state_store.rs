//! In-memory state store for tests/dev.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use zonekeeper_core::OrgId;
use zonekeeper_registry::{DomainState, StateStore, StateStoreError};

/// In-memory [`StateStore`] keyed by `(organization, domain)`.
///
/// Create is atomic insert-if-absent under the write lock, mirroring the
/// uniqueness constraint a relational backing store enforces.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    records: RwLock<HashMap<(OrgId, String), DomainState>>,
    fail_next_update: Mutex<Option<String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `update` call fail with `msg`. One-shot.
    pub fn fail_next_update(&self, msg: impl Into<String>) {
        *self.fail_next_update.lock().unwrap() = Some(msg.into());
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }
}

impl StateStore for InMemoryStateStore {
    fn create(&self, state: &DomainState) -> Result<(), StateStoreError> {
        let mut records = self.records.write().unwrap();
        let key = (state.organization_id, state.domain.clone());
        if records.contains_key(&key) {
            return Err(StateStoreError::Conflict {
                organization_id: state.organization_id,
                domain: state.domain.clone(),
            });
        }
        records.insert(key, state.clone());
        Ok(())
    }

    fn update(&self, state: &DomainState) -> Result<(), StateStoreError> {
        if let Some(msg) = self.fail_next_update.lock().unwrap().take() {
            return Err(StateStoreError::Storage(msg));
        }

        let mut records = self.records.write().unwrap();
        let key = (state.organization_id, state.domain.clone());
        if !records.contains_key(&key) {
            return Err(StateStoreError::NotFound {
                organization_id: state.organization_id,
                domain: state.domain.clone(),
            });
        }
        records.insert(key, state.clone());
        Ok(())
    }

    fn find(
        &self,
        organization_id: OrgId,
        domain: &str,
    ) -> Result<Option<DomainState>, StateStoreError> {
        let records = self.records.read().unwrap();
        Ok(records.get(&(organization_id, domain.to_string())).cloned())
    }

    fn delete(&self, organization_id: OrgId, domain: &str) -> Result<(), StateStoreError> {
        let mut records = self.records.write().unwrap();
        match records.remove(&(organization_id, domain.to_string())) {
            Some(_) => Ok(()),
            None => Err(StateStoreError::NotFound {
                organization_id,
                domain: domain.to_string(),
            }),
        }
    }

    fn list(&self) -> Result<Vec<DomainState>, StateStoreError> {
        let records = self.records.read().unwrap();
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by_key(|s| s.created_at);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use zonekeeper_core::DomainName;

    use super::*;

    fn state(org: u64, domain: &str) -> DomainState {
        DomainState::new(OrgId::new(org), &DomainName::new(domain).unwrap())
    }

    #[test]
    fn create_is_insert_if_absent() {
        let store = InMemoryStateStore::new();
        store.create(&state(1, "test.domain")).unwrap();

        let err = store.create(&state(1, "test.domain")).unwrap_err();
        assert!(matches!(err, StateStoreError::Conflict { .. }));

        // Different key, same domain: no conflict.
        store.create(&state(2, "test.domain")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn update_requires_existing_record() {
        let store = InMemoryStateStore::new();
        let mut s = state(1, "test.domain");

        assert!(matches!(
            store.update(&s).unwrap_err(),
            StateStoreError::NotFound { .. }
        ));

        store.create(&s).unwrap();
        s.mark_failed("some error");
        store.update(&s).unwrap();

        let found = store.find(OrgId::new(1), "test.domain").unwrap().unwrap();
        assert_eq!(found.err_msg.as_deref(), Some("some error"));
    }

    #[test]
    fn delete_removes_the_record() {
        let store = InMemoryStateStore::new();
        store.create(&state(1, "test.domain")).unwrap();
        store.delete(OrgId::new(1), "test.domain").unwrap();
        assert!(store.find(OrgId::new(1), "test.domain").unwrap().is_none());

        assert!(matches!(
            store.delete(OrgId::new(1), "test.domain").unwrap_err(),
            StateStoreError::NotFound { .. }
        ));
    }

    #[test]
    fn injected_update_failure_is_one_shot() {
        let store = InMemoryStateStore::new();
        let s = state(1, "test.domain");
        store.create(&s).unwrap();

        store.fail_next_update("boom");
        assert!(matches!(
            store.update(&s).unwrap_err(),
            StateStoreError::Storage(_)
        ));
        store.update(&s).unwrap();
    }
}
