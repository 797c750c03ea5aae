//! Data-driven rollback for partially completed provisioning runs.
//!
//! Each successful provisioning step pushes a tagged compensating action onto
//! an ordered stack. On failure the stack is interpreted in reverse (LIFO)
//! order, so dependent resources are undone before the resources they depend
//! on (access key before user, detach before policy delete, and so on).
//! Rollback is best-effort cleanup: an action failure is logged and later
//! actions still run; the aggregate outcome is reported for logging only and
//! never surfaced to the caller as an error.

use tracing::{debug, error, info};
use uuid::Uuid;

use zonekeeper_core::{CallContext, OrgId};

use crate::provider::DnsProvider;
use crate::secret::SecretSink;

/// One reversible operation recorded during provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensatingAction {
    DeleteHostedZone {
        zone_id: String,
    },
    DeletePolicy {
        policy_arn: String,
    },
    DeleteUser {
        user: String,
    },
    DetachPolicy {
        user: String,
        policy_arn: String,
    },
    DeleteAccessKey {
        user: String,
        key_id: String,
    },
    DeleteSecret {
        organization_id: OrgId,
        secret_id: Uuid,
    },
}

/// Aggregate rollback result, by count of failed actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Every action succeeded (including the empty stack).
    Succeeded { undone: usize },
    /// Some actions failed; the rest were still attempted.
    Partial { undone: usize, failed: usize },
    /// Every action failed.
    Failed { failed: usize },
}

/// Ordered stack of compensating actions for one provisioning run.
#[derive(Debug, Default)]
pub struct Compensator {
    actions: Vec<CompensatingAction>,
}

impl Compensator {
    pub fn push(&mut self, action: CompensatingAction) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Execute all recorded actions in reverse order, unconditionally.
    ///
    /// Runs under a never-cancelled context: once compensation starts it must
    /// be given the chance to finish.
    pub fn rollback(
        &self,
        provider: &dyn DnsProvider,
        secrets: &dyn SecretSink,
    ) -> RollbackOutcome {
        if self.actions.is_empty() {
            debug!("nothing to roll back");
            return RollbackOutcome::Succeeded { undone: 0 };
        }

        let ctx = CallContext::none();
        let mut failed = 0usize;

        for action in self.actions.iter().rev() {
            match apply(action, &ctx, provider, secrets) {
                Ok(()) => debug!(action = ?action, "compensating action applied"),
                Err(msg) => {
                    failed += 1;
                    error!(action = ?action, error = %msg, "compensating action failed");
                }
            }
        }

        let total = self.actions.len();
        let outcome = if failed == 0 {
            RollbackOutcome::Succeeded { undone: total }
        } else if failed == total {
            RollbackOutcome::Failed { failed }
        } else {
            RollbackOutcome::Partial {
                undone: total - failed,
                failed,
            }
        };

        info!(outcome = ?outcome, "rollback finished");
        outcome
    }
}

fn apply(
    action: &CompensatingAction,
    ctx: &CallContext,
    provider: &dyn DnsProvider,
    secrets: &dyn SecretSink,
) -> Result<(), String> {
    match action {
        CompensatingAction::DeleteHostedZone { zone_id } => provider
            .delete_hosted_zone(ctx, zone_id)
            .map_err(|e| e.human_message()),
        CompensatingAction::DeletePolicy { policy_arn } => provider
            .delete_policy(ctx, policy_arn)
            .map_err(|e| e.human_message()),
        CompensatingAction::DeleteUser { user } => provider
            .delete_user(ctx, user)
            .map_err(|e| e.human_message()),
        CompensatingAction::DetachPolicy { user, policy_arn } => provider
            .detach_policy(ctx, user, policy_arn)
            .map_err(|e| e.human_message()),
        CompensatingAction::DeleteAccessKey { user, key_id } => provider
            .delete_access_key(ctx, user, key_id)
            .map_err(|e| e.human_message()),
        CompensatingAction::DeleteSecret {
            organization_id,
            secret_id,
        } => secrets
            .delete(ctx, *organization_id, *secret_id)
            .map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use zonekeeper_core::DomainName;

    use super::*;
    use crate::provider::{AccessKey, ProviderError, ProviderResult};
    use crate::secret::{SecretSinkError, StoredSecret};

    /// Records applied operations in order; fails those listed in `fail`.
    #[derive(Default)]
    struct RecordingProvider {
        log: Mutex<Vec<String>>,
        fail: Vec<&'static str>,
    }

    impl RecordingProvider {
        fn record(&self, op: &str) -> ProviderResult<()> {
            self.log.lock().unwrap().push(op.to_string());
            if self.fail.contains(&op) {
                Err(ProviderError::message(format!("{op} failed")))
            } else {
                Ok(())
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl DnsProvider for RecordingProvider {
        fn hosted_zone_exists(
            &self,
            _ctx: &CallContext,
            _domain: &DomainName,
        ) -> ProviderResult<bool> {
            Ok(false)
        }

        fn create_hosted_zone(
            &self,
            _ctx: &CallContext,
            _domain: &DomainName,
        ) -> ProviderResult<String> {
            Err(ProviderError::message("unused"))
        }

        fn delete_hosted_zone(&self, _ctx: &CallContext, _zone_id: &str) -> ProviderResult<()> {
            self.record("delete_hosted_zone")
        }

        fn create_policy(&self, _ctx: &CallContext, _zone_id: &str) -> ProviderResult<String> {
            Err(ProviderError::message("unused"))
        }

        fn delete_policy(&self, _ctx: &CallContext, _policy_arn: &str) -> ProviderResult<()> {
            self.record("delete_policy")
        }

        fn create_user(&self, _ctx: &CallContext, _user: &str) -> ProviderResult<String> {
            Err(ProviderError::message("unused"))
        }

        fn delete_user(&self, _ctx: &CallContext, _user: &str) -> ProviderResult<()> {
            self.record("delete_user")
        }

        fn attach_policy(
            &self,
            _ctx: &CallContext,
            _user: &str,
            _policy_arn: &str,
        ) -> ProviderResult<()> {
            Err(ProviderError::message("unused"))
        }

        fn detach_policy(
            &self,
            _ctx: &CallContext,
            _user: &str,
            _policy_arn: &str,
        ) -> ProviderResult<()> {
            self.record("detach_policy")
        }

        fn create_access_key(&self, _ctx: &CallContext, _user: &str) -> ProviderResult<AccessKey> {
            Err(ProviderError::message("unused"))
        }

        fn delete_access_key(
            &self,
            _ctx: &CallContext,
            _user: &str,
            _key_id: &str,
        ) -> ProviderResult<()> {
            self.record("delete_access_key")
        }
    }

    #[derive(Default)]
    struct NullSink;

    impl SecretSink for NullSink {
        fn store(
            &self,
            _ctx: &CallContext,
            _organization_id: OrgId,
            _name: &str,
            _values: HashMap<String, String>,
            _tags: &[String],
        ) -> Result<Uuid, SecretSinkError> {
            Err(SecretSinkError::Storage("unused".to_string()))
        }

        fn delete(
            &self,
            _ctx: &CallContext,
            _organization_id: OrgId,
            _secret_id: Uuid,
        ) -> Result<(), SecretSinkError> {
            Ok(())
        }

        fn find_by_name(
            &self,
            _ctx: &CallContext,
            _organization_id: OrgId,
            _name: &str,
        ) -> Result<Option<StoredSecret>, SecretSinkError> {
            Ok(None)
        }
    }

    fn full_stack() -> Compensator {
        let mut comp = Compensator::default();
        comp.push(CompensatingAction::DeleteHostedZone {
            zone_id: "zone-1".to_string(),
        });
        comp.push(CompensatingAction::DeletePolicy {
            policy_arn: "arn-1".to_string(),
        });
        comp.push(CompensatingAction::DeleteUser {
            user: "u".to_string(),
        });
        comp.push(CompensatingAction::DetachPolicy {
            user: "u".to_string(),
            policy_arn: "arn-1".to_string(),
        });
        comp.push(CompensatingAction::DeleteAccessKey {
            user: "u".to_string(),
            key_id: "key-1".to_string(),
        });
        comp
    }

    #[test]
    fn empty_stack_succeeds_with_nothing_undone() {
        let provider = RecordingProvider::default();
        let outcome = Compensator::default().rollback(&provider, &NullSink);
        assert_eq!(outcome, RollbackOutcome::Succeeded { undone: 0 });
        assert!(provider.log().is_empty());
    }

    #[test]
    fn rollback_runs_in_reverse_order() {
        let provider = RecordingProvider::default();
        let outcome = full_stack().rollback(&provider, &NullSink);

        assert_eq!(outcome, RollbackOutcome::Succeeded { undone: 5 });
        assert_eq!(
            provider.log(),
            vec![
                "delete_access_key",
                "detach_policy",
                "delete_user",
                "delete_policy",
                "delete_hosted_zone",
            ]
        );
    }

    #[test]
    fn failures_do_not_stop_later_actions() {
        let provider = RecordingProvider {
            fail: vec!["delete_user"],
            ..Default::default()
        };
        let outcome = full_stack().rollback(&provider, &NullSink);

        assert_eq!(
            outcome,
            RollbackOutcome::Partial {
                undone: 4,
                failed: 1
            }
        );
        // The failed action does not short-circuit the remaining two.
        assert_eq!(provider.log().len(), 5);
    }

    #[test]
    fn all_failures_reported_as_failed() {
        let provider = RecordingProvider {
            fail: vec![
                "delete_access_key",
                "detach_policy",
                "delete_user",
                "delete_policy",
                "delete_hosted_zone",
            ],
            ..Default::default()
        };
        let outcome = full_stack().rollback(&provider, &NullSink);
        assert_eq!(outcome, RollbackOutcome::Failed { failed: 5 });
    }
}
