//! `zonekeeper-infra` — collaborator implementations and process wiring.
//!
//! In-memory doubles for the state store, secret sink and DNS provider, the
//! Route53 policy-document builder, the garbage collector, and the
//! [`platform::DnsPlatform`] composition root.

pub mod gc;
pub mod owner;
pub mod platform;
pub mod policy;
pub mod provider;
pub mod secret_sink;
pub mod state_store;


pub use gc::{GarbageCollector, GcConfig, GcHandle, Reconciler};
pub use owner::StaticOwnerDirectory;
pub use platform::{DnsPlatform, PlatformConfig, ProviderCredentials, PROVIDER_CREDENTIALS_SECRET};
pub use policy::{hosted_zone_arn, route53_zone_policy};
pub use provider::{InMemoryDnsProvider, ProviderOp};
pub use secret_sink::InMemorySecretSink;
pub use state_store::InMemoryStateStore;
