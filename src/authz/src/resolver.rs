//! Target scope resolution seam
//!
//! The engine never owns group membership; it asks an injected resolver for
//! the target's current scope tags on every decision. Membership changes are
//! therefore visible to the very next check.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ResourceId, ScopeTag, TenantId};

/// Errors from scope resolution
///
/// Every resolver failure is treated as a deny by the engine; an
/// undeterminable scope must never grant access.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resource does not exist in the tenant's namespace
    #[error("Unknown resource: {0}")]
    UnknownResource(ResourceId),

    /// Resolver backend failure
    #[error("Resolver error: {0}")]
    Backend(String),
}

/// Resolves a resource to its current scope tags
#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// Resolve `resource` within `tenant` to its scope tags.
    ///
    /// An existing resource with no scope membership (e.g. an ungrouped
    /// device) resolves to an empty tag list; a missing resource is
    /// `ResolveError::UnknownResource`.
    async fn resolve(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
    ) -> Result<Vec<ScopeTag>, ResolveError>;
}
