//! The domain registration saga façade.
//!
//! Registration is a strictly sequential chain of external side effects
//! (hosted zone → policy → user → attach → access key → secret), each
//! recorded both in the state store and on the compensator stack. Any
//! failure rolls back what was already provisioned and leaves the record in
//! FAILED with the failure message, preserved for diagnosis. Teardown is the
//! asymmetric counterpart: not compensated, but guarded per field so a
//! retried unregister skips sub-resources that are already gone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use zonekeeper_core::{CallContext, DnsError, DnsResult, DomainName, OrgId};
use zonekeeper_events::DomainEvent;

use crate::compensator::{CompensatingAction, Compensator};
use crate::owner::OwnerDirectory;
use crate::provider::DnsProvider;
use crate::secret::{
    ACCESS_KEY_ID, SECRET_ACCESS_KEY, SecretSink, TAG_HIDDEN, TAG_ROUTE53, access_key_secret_name,
};
use crate::state::{DomainState, RegistrationStatus};
use crate::store::StateStore;

/// Prefix of IAM user names created for registered zones.
pub const IAM_USER_PREFIX: &str = "zonekeeper.route53";

/// Derive the IAM user name for a hosted zone.
pub fn iam_user_name(zone_id: &str) -> String {
    format!("{IAM_USER_PREFIX}.{zone_id}")
}

/// Tunables for the registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long FAILED records are kept for inspection before the garbage
    /// collector tears them down.
    pub failed_retention: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            failed_retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl RegistryConfig {
    pub fn with_failed_retention(mut self, retention: Duration) -> Self {
        self.failed_retention = retention;
        self
    }
}

/// Orchestrates the registration lifecycle over the injected collaborators.
///
/// Construct one instance at the composition root and share it; there is no
/// global state. Concurrent calls for distinct `(organization, domain)` keys
/// proceed fully in parallel; the state store's insert-if-absent is the only
/// mutual exclusion for a single key.
pub struct DomainRegistry {
    store: Arc<dyn StateStore>,
    provider: Arc<dyn DnsProvider>,
    secrets: Arc<dyn SecretSink>,
    owners: Arc<dyn OwnerDirectory>,
    notifications: Sender<DomainEvent>,
    config: RegistryConfig,
}

impl DomainRegistry {
    pub fn new(
        store: Arc<dyn StateStore>,
        provider: Arc<dyn DnsProvider>,
        secrets: Arc<dyn SecretSink>,
        owners: Arc<dyn OwnerDirectory>,
        notifications: Sender<DomainEvent>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            provider,
            secrets,
            owners,
            notifications,
            config,
        }
    }

    /// Register `domain` for `organization_id`: provision the hosted zone and
    /// its least-privilege identity, persisting durable state after every
    /// step. On any failure, already-provisioned sub-resources are rolled
    /// back and the record is left in FAILED with the failure message.
    pub fn register_domain(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        domain: &DomainName,
    ) -> DnsResult<()> {
        ctx.check()
            .map_err(|e| self.fail_register(organization_id, domain, e))?;

        // Local conflict check first: no external call is made for a domain
        // this organization already holds.
        if self
            .store
            .find(organization_id, domain.as_str())
            .map_err(|e| self.fail_register(organization_id, domain, e.into()))?
            .is_some()
        {
            let err = DnsError::already_registered(organization_id, domain.as_str());
            return Err(self.fail_register(organization_id, domain, err));
        }

        // Provider-global check: the DNS name may be owned by another tenant.
        let in_use = self
            .provider
            .hosted_zone_exists(ctx, domain)
            .map_err(|e| self.fail_register(organization_id, domain, e.into()))?;
        if in_use {
            let err = DnsError::domain_in_use(domain.as_str());
            return Err(self.fail_register(organization_id, domain, err));
        }

        // Durable CREATING record before the first side effect. Insert-if-
        // absent closes the race with a concurrent register of the same key.
        let mut state = DomainState::new(organization_id, domain);
        if let Err(err) = self.store.create(&state) {
            // Conflict here means we lost the race to a concurrent register
            // of the same key; it maps to AlreadyRegistered.
            return Err(self.fail_register(organization_id, domain, err.into()));
        }

        let mut comp = Compensator::default();
        if let Err(err) = self.provision(ctx, domain, &mut state, &mut comp) {
            comp.rollback(self.provider.as_ref(), self.secrets.as_ref());

            // The record is kept (FAILED, with the message) rather than
            // deleted, as an inspectable audit trail; the garbage collector
            // removes it after the configured retention.
            state.mark_failed(err.to_string());
            if let Err(update_err) = self.store.update(&state) {
                error!(
                    organization = %organization_id,
                    domain = %domain,
                    error = %update_err,
                    "failed to persist FAILED registration state"
                );
            }
            return Err(self.fail_register(organization_id, domain, err));
        }

        info!(organization = %organization_id, domain = %domain, "domain registered");
        self.notify(DomainEvent::register_succeeded(
            organization_id,
            domain.as_str(),
        ));
        Ok(())
    }

    /// Steps 4–10 of the registration sequence. Every intermediate persistence
    /// failure aborts like a provisioning failure; the caller rolls back
    /// whatever this method managed to record on the compensator.
    fn provision(
        &self,
        ctx: &CallContext,
        domain: &DomainName,
        state: &mut DomainState,
        comp: &mut Compensator,
    ) -> DnsResult<()> {
        ctx.check()?;
        let zone_id = self.provider.create_hosted_zone(ctx, domain)?;
        comp.push(CompensatingAction::DeleteHostedZone {
            zone_id: zone_id.clone(),
        });
        state.hosted_zone_id = Some(zone_id.clone());
        self.store.update(state)?;

        ctx.check()?;
        let policy_arn = self.provider.create_policy(ctx, &zone_id)?;
        comp.push(CompensatingAction::DeletePolicy {
            policy_arn: policy_arn.clone(),
        });
        state.policy_arn = Some(policy_arn.clone());
        self.store.update(state)?;

        ctx.check()?;
        let user = self.provider.create_user(ctx, &iam_user_name(&zone_id))?;
        comp.push(CompensatingAction::DeleteUser { user: user.clone() });
        state.iam_user = Some(user.clone());
        self.store.update(state)?;

        ctx.check()?;
        self.provider.attach_policy(ctx, &user, &policy_arn)?;
        comp.push(CompensatingAction::DetachPolicy {
            user: user.clone(),
            policy_arn: policy_arn.clone(),
        });

        ctx.check()?;
        let key = self.provider.create_access_key(ctx, &user)?;
        comp.push(CompensatingAction::DeleteAccessKey {
            user: user.clone(),
            key_id: key.id.clone(),
        });
        state.access_key_id = Some(key.id.clone());
        self.store.update(state)?;

        ctx.check()?;
        let values = HashMap::from([
            (ACCESS_KEY_ID.to_string(), key.id),
            (SECRET_ACCESS_KEY.to_string(), key.secret),
        ]);
        let secret_id = self.secrets.store(
            ctx,
            state.organization_id,
            &access_key_secret_name(&state.domain),
            values,
            &[TAG_HIDDEN.to_string(), TAG_ROUTE53.to_string()],
        )?;
        comp.push(CompensatingAction::DeleteSecret {
            organization_id: state.organization_id,
            secret_id,
        });

        state.mark_created();
        self.store.update(state)?;
        Ok(())
    }

    /// Tear down the registration and remove the record. Not compensated:
    /// a failure halts immediately, leaves the record FAILED, and relies on
    /// a retried unregister, which skips already-removed sub-resources.
    pub fn unregister_domain(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        domain: &DomainName,
    ) -> DnsResult<()> {
        ctx.check()?;

        let Some(mut state) = self
            .store
            .find(organization_id, domain.as_str())
            .map_err(DnsError::from)?
        else {
            return Err(DnsError::not_found(organization_id, domain.as_str()));
        };

        state.mark_removing();
        let result = self
            .store
            .update(&state)
            .map_err(DnsError::from)
            .and_then(|()| self.teardown(ctx, &mut state))
            .and_then(|()| {
                self.store
                    .delete(organization_id, domain.as_str())
                    .map_err(DnsError::from)
            });

        match result {
            Ok(()) => {
                info!(organization = %organization_id, domain = %domain, "domain unregistered");
                self.notify(DomainEvent::unregister_succeeded(
                    organization_id,
                    domain.as_str(),
                ));
                Ok(())
            }
            Err(err) => {
                warn!(
                    organization = %organization_id,
                    domain = %domain,
                    error = %err,
                    "unregistration failed; record left for retry"
                );
                state.mark_failed(err.to_string());
                if let Err(update_err) = self.store.update(&state) {
                    error!(
                        organization = %organization_id,
                        domain = %domain,
                        error = %update_err,
                        "failed to persist FAILED unregistration state"
                    );
                }
                self.notify(DomainEvent::unregister_failed(
                    organization_id,
                    domain.as_str(),
                    err.to_string(),
                ));
                Err(err)
            }
        }
    }

    /// Guarded deletion of every sub-resource a record still references.
    /// Each field is cleared and persisted as soon as its resource is gone,
    /// which is what makes re-invocation after a partial failure safe.
    /// Resources the provider reports as missing count as deleted: a FAILED
    /// record keeps its resource ids after rollback for diagnosis, and this
    /// is what lets such a record still be torn down later.
    fn teardown(&self, ctx: &CallContext, state: &mut DomainState) -> DnsResult<()> {
        if let Some(zone_id) = state.hosted_zone_id.clone() {
            ctx.check()?;
            ignore_missing(self.provider.delete_hosted_zone(ctx, &zone_id))?;
            state.hosted_zone_id = None;
            self.store.update(state)?;
        }

        if let Some((user, policy_arn)) = state.iam_user.clone().zip(state.policy_arn.clone()) {
            ctx.check()?;
            ignore_missing(self.provider.detach_policy(ctx, &user, &policy_arn))?;
        }

        if let Some(policy_arn) = state.policy_arn.clone() {
            ctx.check()?;
            ignore_missing(self.provider.delete_policy(ctx, &policy_arn))?;
            state.policy_arn = None;
            self.store.update(state)?;
        }

        if let Some((user, key_id)) = state.iam_user.clone().zip(state.access_key_id.clone()) {
            ctx.check()?;
            ignore_missing(self.provider.delete_access_key(ctx, &user, &key_id))?;
            state.access_key_id = None;
            self.store.update(state)?;
        }

        if let Some(user) = state.iam_user.clone() {
            ctx.check()?;
            ignore_missing(self.provider.delete_user(ctx, &user))?;
            state.iam_user = None;
            self.store.update(state)?;
        }

        ctx.check()?;
        let name = access_key_secret_name(&state.domain);
        if let Some(secret) = self
            .secrets
            .find_by_name(ctx, state.organization_id, &name)?
        {
            self.secrets.delete(ctx, state.organization_id, secret.id)?;
        }

        Ok(())
    }

    /// Whether the registration exists and completed successfully.
    pub fn is_domain_registered(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        domain: &DomainName,
    ) -> DnsResult<bool> {
        ctx.check()?;
        let found = self
            .store
            .find(organization_id, domain.as_str())
            .map_err(DnsError::from)?;
        Ok(found.is_some_and(|s| s.status == RegistrationStatus::Created))
    }

    /// One garbage-collection pass: unregister domains whose owning
    /// organization no longer exists, and tear down FAILED records older
    /// than the configured retention. Per-record failures are logged and
    /// retried on the next pass.
    pub fn cleanup(&self) -> DnsResult<()> {
        let ctx = CallContext::none();
        let active: HashSet<OrgId> = self
            .owners
            .active_organizations()?
            .into_iter()
            .collect();
        let retention =
            chrono::Duration::from_std(self.config.failed_retention).unwrap_or_default();
        let now = Utc::now();

        for state in self.store.list().map_err(DnsError::from)? {
            let stale_owner = !active.contains(&state.organization_id);
            let expired_failure = state.status == RegistrationStatus::Failed
                && now - state.created_at >= retention;
            if !stale_owner && !expired_failure {
                continue;
            }

            let reason = if stale_owner {
                "owner organization gone"
            } else {
                "failed record past retention"
            };
            info!(
                organization = %state.organization_id,
                domain = %state.domain,
                reason,
                "garbage-collecting registration"
            );

            let domain = match DomainName::new(&state.domain) {
                Ok(d) => d,
                Err(err) => {
                    error!(domain = %state.domain, error = %err, "stored domain no longer parses");
                    continue;
                }
            };
            if let Err(err) = self.unregister_domain(&ctx, state.organization_id, &domain) {
                warn!(
                    organization = %state.organization_id,
                    domain = %state.domain,
                    error = %err,
                    "cleanup failed; will retry next pass"
                );
            }
        }

        Ok(())
    }

    /// Reconcile records left in CREATING/REMOVING by a previous process
    /// crash: REMOVING registrations retry their teardown; CREATING ones tear
    /// down whatever was provisioned and settle in FAILED.
    pub fn process_unfinished_tasks(&self) -> DnsResult<()> {
        let ctx = CallContext::none();

        for state in self.store.list().map_err(DnsError::from)? {
            match state.status {
                RegistrationStatus::Removing => {
                    debug!(
                        organization = %state.organization_id,
                        domain = %state.domain,
                        "resuming interrupted unregistration"
                    );
                    let Ok(domain) = DomainName::new(&state.domain) else {
                        error!(domain = %state.domain, "stored domain no longer parses");
                        continue;
                    };
                    if let Err(err) =
                        self.unregister_domain(&ctx, state.organization_id, &domain)
                    {
                        warn!(
                            organization = %state.organization_id,
                            domain = %state.domain,
                            error = %err,
                            "could not resume unregistration"
                        );
                    }
                }
                RegistrationStatus::Creating => {
                    debug!(
                        organization = %state.organization_id,
                        domain = %state.domain,
                        "rolling back interrupted registration"
                    );
                    let mut state = state;
                    let msg = match self.teardown(&ctx, &mut state) {
                        Ok(()) => "provisioning interrupted by restart".to_string(),
                        Err(err) => {
                            warn!(
                                organization = %state.organization_id,
                                domain = %state.domain,
                                error = %err,
                                "partial teardown of interrupted registration"
                            );
                            err.to_string()
                        }
                    };
                    state.mark_failed(msg.clone());
                    if let Err(err) = self.store.update(&state) {
                        error!(
                            organization = %state.organization_id,
                            domain = %state.domain,
                            error = %err,
                            "failed to persist reconciled state"
                        );
                    }
                    self.notify(DomainEvent::register_failed(
                        state.organization_id,
                        state.domain.clone(),
                        msg,
                    ));
                }
                RegistrationStatus::Created | RegistrationStatus::Failed => {}
            }
        }

        Ok(())
    }

    fn fail_register(&self, organization_id: OrgId, domain: &DomainName, err: DnsError) -> DnsError {
        warn!(
            organization = %organization_id,
            domain = %domain,
            error = %err,
            "registration failed"
        );
        self.notify(DomainEvent::register_failed(
            organization_id,
            domain.as_str(),
            err.to_string(),
        ));
        err
    }

    fn notify(&self, event: DomainEvent) {
        // The relay owns the receive side; if it is gone the notification is
        // dropped, never blocking a caller.
        if self.notifications.send(event).is_err() {
            debug!("notification channel closed, dropping event");
        }
    }
}

/// Treat provider "resource does not exist" responses as success.
fn ignore_missing(result: crate::provider::ProviderResult<()>) -> DnsResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_not_found() => {
            debug!(error = %err.human_message(), "sub-resource already gone, skipping");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iam_user_name_derives_from_zone_id() {
        assert_eq!(
            iam_user_name("testhostedzone1"),
            "zonekeeper.route53.testhostedzone1"
        );
    }

    #[test]
    fn default_retention_is_a_week() {
        let config = RegistryConfig::default();
        assert_eq!(config.failed_retention, Duration::from_secs(604_800));

        let short = RegistryConfig::default().with_failed_retention(Duration::from_secs(60));
        assert_eq!(short.failed_retention, Duration::from_secs(60));
    }
}
