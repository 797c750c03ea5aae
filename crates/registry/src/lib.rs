//! `zonekeeper-registry` — the external DNS domain lifecycle saga.
//!
//! Provisioning a customer-owned domain is a sequence of non-transactional
//! external side effects (hosted zone, scoped policy, IAM user, access key,
//! stored secret) that must behave as an atomic unit. This crate holds the
//! persisted state model, the collaborator contracts, the compensating-action
//! stack, and the [`registry::DomainRegistry`] façade that drives them.

pub mod compensator;
pub mod owner;
pub mod provider;
pub mod registry;
pub mod secret;
pub mod state;
pub mod store;

pub use compensator::{CompensatingAction, Compensator, RollbackOutcome};
pub use owner::OwnerDirectory;
pub use provider::{AccessKey, DnsProvider, ProviderError, ProviderResult};
pub use registry::{DomainRegistry, IAM_USER_PREFIX, RegistryConfig, iam_user_name};
pub use secret::{SecretSink, SecretSinkError, StoredSecret, access_key_secret_name};
pub use state::{DomainState, RegistrationStatus};
pub use store::{StateStore, StateStoreError};
