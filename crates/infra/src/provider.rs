//! In-memory DNS/identity provider double.
//!
//! Deterministic resource ids, per-operation call counters, and scriptable
//! failure injection. Deletes verify the resource exists and ordering
//! constraints hold (a user cannot be deleted while it still has attached
//! policies or live access keys), so tests exercising rollback order fail
//! loudly when the order is wrong.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use zonekeeper_core::{CallContext, DomainName};
use zonekeeper_registry::{AccessKey, DnsProvider, ProviderError, ProviderResult};

use crate::policy::route53_zone_policy;

/// Provider operations, for counters and failure injection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    HostedZoneExists,
    CreateHostedZone,
    DeleteHostedZone,
    CreatePolicy,
    DeletePolicy,
    CreateUser,
    DeleteUser,
    AttachPolicy,
    DetachPolicy,
    CreateAccessKey,
    DeleteAccessKey,
}

#[derive(Debug, Default)]
struct Inner {
    /// zone id -> domain
    zones: HashMap<String, String>,
    /// policy arn -> document
    policies: HashMap<String, JsonValue>,
    /// user -> attached policy arns
    users: HashMap<String, HashSet<String>>,
    /// user -> live access key ids
    access_keys: HashMap<String, Vec<String>>,
    calls: HashMap<ProviderOp, usize>,
    failures: HashMap<ProviderOp, String>,
    seq: u64,
}

impl Inner {
    fn enter(&mut self, op: ProviderOp) -> ProviderResult<()> {
        *self.calls.entry(op).or_insert(0) += 1;
        if let Some(msg) = self.failures.get(&op) {
            return Err(ProviderError::message(msg.clone()));
        }
        Ok(())
    }
}

/// Deterministic in-memory [`DnsProvider`].
#[derive(Debug, Default)]
pub struct InMemoryDnsProvider {
    inner: Mutex<Inner>,
}

impl InMemoryDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent invocation of `op` with `msg`, until cleared.
    pub fn fail_on(&self, op: ProviderOp, msg: impl Into<String>) {
        self.inner.lock().unwrap().failures.insert(op, msg.into());
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    /// How many times `op` has been invoked.
    pub fn calls(&self, op: ProviderOp) -> usize {
        *self.inner.lock().unwrap().calls.get(&op).unwrap_or(&0)
    }

    /// Pre-create a zone, as if another tenant already owned the domain.
    pub fn seed_zone(&self, domain: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.seq += 1;
        let id = format!("zone-{}", inner.seq);
        inner.zones.insert(id.clone(), domain.to_string());
        id
    }

    /// True when no zone/policy/user/key survives, i.e. everything was
    /// rolled back or torn down.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.zones.is_empty()
            && inner.policies.is_empty()
            && inner.users.is_empty()
            && inner.access_keys.values().all(Vec::is_empty)
    }

    pub fn has_zone(&self, zone_id: &str) -> bool {
        self.inner.lock().unwrap().zones.contains_key(zone_id)
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.inner.lock().unwrap().users.contains_key(user)
    }
}

impl DnsProvider for InMemoryDnsProvider {
    fn hosted_zone_exists(&self, _ctx: &CallContext, domain: &DomainName) -> ProviderResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::HostedZoneExists)?;
        Ok(inner.zones.values().any(|d| d == domain.as_str()))
    }

    fn create_hosted_zone(
        &self,
        _ctx: &CallContext,
        domain: &DomainName,
    ) -> ProviderResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::CreateHostedZone)?;
        inner.seq += 1;
        let id = format!("zone-{}", inner.seq);
        inner.zones.insert(id.clone(), domain.as_str().to_string());
        Ok(id)
    }

    fn delete_hosted_zone(&self, _ctx: &CallContext, zone_id: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::DeleteHostedZone)?;
        if inner.zones.remove(zone_id).is_none() {
            return Err(ProviderError::coded(
                "NoSuchHostedZone",
                format!("hosted zone {zone_id} does not exist"),
            ));
        }
        Ok(())
    }

    fn create_policy(&self, _ctx: &CallContext, zone_id: &str) -> ProviderResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::CreatePolicy)?;
        let arn = format!("arn:aws:iam::123456789012:policy/route53-{zone_id}");
        if inner.policies.contains_key(&arn) {
            return Err(ProviderError::coded(
                "EntityAlreadyExists",
                format!("policy {arn} already exists"),
            ));
        }
        inner.policies.insert(arn.clone(), route53_zone_policy(zone_id));
        Ok(arn)
    }

    fn delete_policy(&self, _ctx: &CallContext, policy_arn: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::DeletePolicy)?;
        if inner.users.values().any(|arns| arns.contains(policy_arn)) {
            return Err(ProviderError::coded(
                "DeleteConflict",
                format!("policy {policy_arn} is still attached"),
            ));
        }
        if inner.policies.remove(policy_arn).is_none() {
            return Err(ProviderError::coded(
                "NoSuchEntity",
                format!("policy {policy_arn} does not exist"),
            ));
        }
        Ok(())
    }

    fn create_user(&self, _ctx: &CallContext, user: &str) -> ProviderResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::CreateUser)?;
        if inner.users.contains_key(user) {
            return Err(ProviderError::coded(
                "EntityAlreadyExists",
                format!("user {user} already exists"),
            ));
        }
        inner.users.insert(user.to_string(), HashSet::new());
        Ok(user.to_string())
    }

    fn delete_user(&self, _ctx: &CallContext, user: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::DeleteUser)?;
        match inner.users.get(user) {
            None => {
                return Err(ProviderError::coded(
                    "NoSuchEntity",
                    format!("user {user} does not exist"),
                ));
            }
            Some(attached) if !attached.is_empty() => {
                return Err(ProviderError::coded(
                    "DeleteConflict",
                    format!("user {user} still has attached policies"),
                ));
            }
            Some(_) => {}
        }
        if inner.access_keys.get(user).is_some_and(|k| !k.is_empty()) {
            return Err(ProviderError::coded(
                "DeleteConflict",
                format!("user {user} still has access keys"),
            ));
        }
        inner.users.remove(user);
        inner.access_keys.remove(user);
        Ok(())
    }

    fn attach_policy(
        &self,
        _ctx: &CallContext,
        user: &str,
        policy_arn: &str,
    ) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::AttachPolicy)?;
        if !inner.policies.contains_key(policy_arn) {
            return Err(ProviderError::coded(
                "NoSuchEntity",
                format!("policy {policy_arn} does not exist"),
            ));
        }
        match inner.users.get_mut(user) {
            Some(attached) => {
                attached.insert(policy_arn.to_string());
                Ok(())
            }
            None => Err(ProviderError::coded(
                "NoSuchEntity",
                format!("user {user} does not exist"),
            )),
        }
    }

    fn detach_policy(
        &self,
        _ctx: &CallContext,
        user: &str,
        policy_arn: &str,
    ) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::DetachPolicy)?;
        match inner.users.get_mut(user) {
            // Detaching an already-detached policy succeeds, which keeps a
            // retried teardown idempotent.
            Some(attached) => {
                attached.remove(policy_arn);
                Ok(())
            }
            None => Err(ProviderError::coded(
                "NoSuchEntity",
                format!("user {user} does not exist"),
            )),
        }
    }

    fn create_access_key(&self, _ctx: &CallContext, user: &str) -> ProviderResult<AccessKey> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::CreateAccessKey)?;
        if !inner.users.contains_key(user) {
            return Err(ProviderError::coded(
                "NoSuchEntity",
                format!("user {user} does not exist"),
            ));
        }
        inner.seq += 1;
        let key = AccessKey {
            id: format!("AKIA{:016}", inner.seq),
            secret: format!("secret-{}", inner.seq),
        };
        inner
            .access_keys
            .entry(user.to_string())
            .or_default()
            .push(key.id.clone());
        Ok(key)
    }

    fn delete_access_key(
        &self,
        _ctx: &CallContext,
        user: &str,
        key_id: &str,
    ) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter(ProviderOp::DeleteAccessKey)?;
        let Some(keys) = inner.access_keys.get_mut(user) else {
            return Err(ProviderError::coded(
                "NoSuchEntity",
                format!("user {user} has no access keys"),
            ));
        };
        let before = keys.len();
        keys.retain(|k| k != key_id);
        if keys.len() == before {
            return Err(ProviderError::coded(
                "NoSuchEntity",
                format!("access key {key_id} does not exist"),
            ));
        }
        Ok(())
    }
}
