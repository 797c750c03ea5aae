//! Process-lifetime composition root for the DNS subsystem.
//!
//! Built exactly once by the application and passed by dependency injection;
//! there is no global state. When provider credentials are missing or
//! unparsable the platform comes up **disabled**: every operation is a
//! logged no-op, so the rest of the application runs unaffected.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use zonekeeper_core::{CallContext, DnsResult, DomainName, OrgId};
use zonekeeper_events::{EventBus, EventRelay, Subscription};
use zonekeeper_registry::{
    DnsProvider, DomainRegistry, OwnerDirectory, RegistryConfig, SecretSink, StateStore,
};

use crate::gc::{GarbageCollector, GcConfig, Reconciler};

/// Well-known secret name holding the provider credentials.
pub const PROVIDER_CREDENTIALS_SECRET: &str = "route53.credentials";

/// Credential material for the external provider, read from the secret sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl ProviderCredentials {
    /// Parse from secret values; `None` when a field is missing or empty.
    pub fn from_values(values: &HashMap<String, String>) -> Option<Self> {
        let access_key_id = values.get("access_key_id")?.clone();
        let secret_access_key = values.get("secret_access_key")?.clone();
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return None;
        }
        Some(Self {
            access_key_id,
            secret_access_key,
        })
    }
}

/// Platform configuration.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub gc: GcConfig,
    pub registry: RegistryConfig,
    /// Organization owning the provider credentials secret.
    pub credentials_org: OrgId,
    /// Name of the provider credentials secret.
    pub credentials_secret: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            gc: GcConfig::default(),
            registry: RegistryConfig::default(),
            credentials_org: OrgId::new(0),
            credentials_secret: PROVIDER_CREDENTIALS_SECRET.to_string(),
        }
    }
}

impl PlatformConfig {
    pub fn with_gc(mut self, gc: GcConfig) -> Self {
        self.gc = gc;
        self
    }

    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_credentials(mut self, org: OrgId, secret: impl Into<String>) -> Self {
        self.credentials_org = org;
        self.credentials_secret = secret.into();
        self
    }
}

struct Enabled {
    registry: Arc<DomainRegistry>,
    bus: Arc<EventBus>,
    gc: Option<crate::gc::GcHandle>,
    relay: Option<EventRelay>,
}

/// The wired DNS subsystem, or a disabled shell when credentials are absent.
pub struct DnsPlatform {
    inner: Option<Enabled>,
}

impl DnsPlatform {
    /// One-time construction. Reads provider credentials from the secret
    /// sink; on success wires the registry, starts the garbage collector and
    /// the event relay, and reconciles records left unfinished by a previous
    /// process crash. Missing or invalid credentials yield a disabled
    /// platform rather than an error.
    pub fn initialize<F>(
        config: PlatformConfig,
        store: Arc<dyn StateStore>,
        secrets: Arc<dyn SecretSink>,
        owners: Arc<dyn OwnerDirectory>,
        make_provider: F,
    ) -> anyhow::Result<Self>
    where
        F: FnOnce(&ProviderCredentials) -> Arc<dyn DnsProvider>,
    {
        let ctx = CallContext::none();
        let secret = secrets
            .find_by_name(&ctx, config.credentials_org, &config.credentials_secret)
            .context("reading provider credentials")?;

        let Some(secret) = secret else {
            warn!(
                secret = %config.credentials_secret,
                "provider credentials not found; DNS subsystem disabled"
            );
            return Ok(Self { inner: None });
        };
        let Some(credentials) = ProviderCredentials::from_values(&secret.values) else {
            warn!(
                secret = %config.credentials_secret,
                "provider credentials malformed; DNS subsystem disabled"
            );
            return Ok(Self { inner: None });
        };

        let provider = make_provider(&credentials);

        let (notifications, source) = mpsc::channel();
        let bus = Arc::new(EventBus::new());
        let relay = EventRelay::spawn(source, bus.clone());

        let registry = Arc::new(DomainRegistry::new(
            store,
            provider,
            secrets,
            owners,
            notifications,
            config.registry,
        ));

        // Records stuck in CREATING/REMOVING from a crash get reconciled
        // before anyone else touches the registry.
        if let Err(err) = registry.process_unfinished_tasks() {
            warn!(error = %err, "startup reconciliation incomplete");
        }

        let gc = GarbageCollector::new(
            registry.clone() as Arc<dyn Reconciler>,
            config.gc,
        )
        .start();

        info!("DNS subsystem initialized");
        Ok(Self {
            inner: Some(Enabled {
                registry,
                bus,
                gc: Some(gc),
                relay: Some(relay),
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn register_domain(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        domain: &DomainName,
    ) -> DnsResult<()> {
        match &self.inner {
            Some(enabled) => enabled.registry.register_domain(ctx, organization_id, domain),
            None => {
                debug!(%organization_id, %domain, "DNS subsystem disabled; register ignored");
                Ok(())
            }
        }
    }

    pub fn unregister_domain(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        domain: &DomainName,
    ) -> DnsResult<()> {
        match &self.inner {
            Some(enabled) => enabled
                .registry
                .unregister_domain(ctx, organization_id, domain),
            None => {
                debug!(%organization_id, %domain, "DNS subsystem disabled; unregister ignored");
                Ok(())
            }
        }
    }

    pub fn is_domain_registered(
        &self,
        ctx: &CallContext,
        organization_id: OrgId,
        domain: &DomainName,
    ) -> DnsResult<bool> {
        match &self.inner {
            Some(enabled) => enabled
                .registry
                .is_domain_registered(ctx, organization_id, domain),
            None => Ok(false),
        }
    }

    /// Run one cleanup pass outside the GC schedule.
    pub fn cleanup(&self) -> DnsResult<()> {
        match &self.inner {
            Some(enabled) => enabled.registry.cleanup(),
            None => Ok(()),
        }
    }

    /// Subscribe to lifecycle events; `None` while disabled.
    pub fn subscribe(&self) -> Option<Subscription> {
        self.inner.as_ref().map(|e| e.bus.subscribe())
    }

    /// Access the bus, e.g. to unsubscribe. `None` while disabled.
    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.inner.as_ref().map(|e| &e.bus)
    }

    /// Stop the background threads. Consumes the platform.
    pub fn shutdown(mut self) {
        if let Some(mut enabled) = self.inner.take() {
            if let Some(gc) = enabled.gc.take() {
                gc.stop();
            }
            if let Some(relay) = enabled.relay.take() {
                relay.shutdown();
            }
            info!("DNS subsystem shut down");
        }
    }
}
