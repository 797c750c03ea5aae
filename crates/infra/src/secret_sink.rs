//! In-memory secret sink for tests/dev.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use uuid::Uuid;

use zonekeeper_core::{CallContext, OrgId};
use zonekeeper_registry::{SecretSink, SecretSinkError, StoredSecret};

/// In-memory [`SecretSink`] honoring tags and name lookup.
#[derive(Debug, Default)]
pub struct InMemorySecretSink {
    secrets: RwLock<HashMap<(OrgId, Uuid), StoredSecret>>,
    fail_next_store: Mutex<Option<String>>,
}

impl InMemorySecretSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `store` call fail with `msg`. One-shot.
    pub fn fail_next_store(&self, msg: impl Into<String>) {
        *self.fail_next_store.lock().unwrap() = Some(msg.into());
    }

    pub fn len(&self) -> usize {
        self.secrets.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.read().unwrap().is_empty()
    }
}

impl SecretSink for InMemorySecretSink {
    fn store(
        &self,
        _ctx: &CallContext,
        organization_id: OrgId,
        name: &str,
        values: HashMap<String, String>,
        tags: &[String],
    ) -> Result<Uuid, SecretSinkError> {
        if let Some(msg) = self.fail_next_store.lock().unwrap().take() {
            return Err(SecretSinkError::Storage(msg));
        }

        let id = Uuid::now_v7();
        let secret = StoredSecret {
            id,
            organization_id,
            name: name.to_string(),
            values,
            tags: tags.to_vec(),
        };
        self.secrets
            .write()
            .unwrap()
            .insert((organization_id, id), secret);
        Ok(id)
    }

    fn delete(
        &self,
        _ctx: &CallContext,
        organization_id: OrgId,
        secret_id: Uuid,
    ) -> Result<(), SecretSinkError> {
        match self
            .secrets
            .write()
            .unwrap()
            .remove(&(organization_id, secret_id))
        {
            Some(_) => Ok(()),
            None => Err(SecretSinkError::NotFound),
        }
    }

    fn find_by_name(
        &self,
        _ctx: &CallContext,
        organization_id: OrgId,
        name: &str,
    ) -> Result<Option<StoredSecret>, SecretSinkError> {
        let secrets = self.secrets.read().unwrap();
        Ok(secrets
            .values()
            .find(|s| s.organization_id == organization_id && s.name == name)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use zonekeeper_registry::secret::TAG_HIDDEN;

    use super::*;

    #[test]
    fn store_find_delete_round_trip() {
        let sink = InMemorySecretSink::new();
        let ctx = CallContext::none();
        let org = OrgId::new(1);

        let id = sink
            .store(
                &ctx,
                org,
                "route53.test.domain",
                HashMap::from([("k".to_string(), "v".to_string())]),
                &[TAG_HIDDEN.to_string()],
            )
            .unwrap();

        let found = sink
            .find_by_name(&ctx, org, "route53.test.domain")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.tags, vec![TAG_HIDDEN.to_string()]);

        // Scoped per organization.
        assert!(
            sink.find_by_name(&ctx, OrgId::new(2), "route53.test.domain")
                .unwrap()
                .is_none()
        );

        sink.delete(&ctx, org, id).unwrap();
        assert!(sink.is_empty());
        assert_eq!(sink.delete(&ctx, org, id), Err(SecretSinkError::NotFound));
    }
}
