//! `zonekeeper-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure
//! concerns): the error taxonomy, typed identifiers, the validated domain
//! name value object, and cooperative call contexts.

pub mod context;
pub mod domain_name;
pub mod error;
pub mod id;

pub use context::CallContext;
pub use domain_name::DomainName;
pub use error::{DnsError, DnsResult};
pub use id::OrgId;
