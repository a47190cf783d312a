//! Group-scoped RBAC evaluation
//!
//! The engine is a pure decision function over externally supplied state: it
//! resolves the principal's roles and the target's scope tags fresh on every
//! call, performs no mutation, and caches nothing between requests. `Allow`
//! requires a matching permission; everything else is a deny, including
//! unresolvable targets and stale role references.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::decision::{Decision, DecisionReason};
use crate::error::{AuthzError, Result};
use crate::resolver::TargetResolver;
use crate::store::RoleStore;
use crate::types::{Action, Permission, Principal, ResourceId, ScopeTag, TenantId};

/// A permission together with the role that granted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantedPermission {
    pub role: String,
    pub permission: Permission,
}

/// The authorization engine
///
/// Stateless per call; `authorize` and `filter_visible` may be invoked
/// concurrently without synchronization.
pub struct AuthzEngine {
    roles: Arc<dyn RoleStore>,
    resolver: Arc<dyn TargetResolver>,
}

impl AuthzEngine {
    pub fn new(roles: Arc<dyn RoleStore>, resolver: Arc<dyn TargetResolver>) -> Self {
        Self { roles, resolver }
    }

    /// Compute the principal's effective permission set: the union of the
    /// permissions of every role the principal holds.
    ///
    /// A role name that no longer resolves to a definition is
    /// `AuthzError::UnknownRole`: stale references must never grant access,
    /// and `authorize` turns this into a hard deny.
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
    ) -> Result<Vec<GrantedPermission>> {
        let mut granted = Vec::new();
        for name in &principal.roles {
            match self.roles.get(&principal.tenant_id, name).await? {
                Some(role) => {
                    granted.extend(role.permissions.into_iter().map(|permission| {
                        GrantedPermission {
                            role: name.clone(),
                            permission,
                        }
                    }));
                }
                None => return Err(AuthzError::UnknownRole(name.clone())),
            }
        }
        Ok(granted)
    }

    /// Authorize `action` against a single target resource.
    ///
    /// The target is resolved to its current scope tags first; a resolution
    /// failure is a deny (`UnresolvedTarget`), never an implicit allow.
    pub async fn authorize(
        &self,
        principal: &Principal,
        action: &Action,
        target: &ResourceId,
    ) -> Result<Decision> {
        let granted = match self.effective_permissions(principal).await {
            Ok(granted) => granted,
            Err(AuthzError::UnknownRole(role)) => {
                warn!(principal = %principal.id, %role, "stale role reference, denying");
                return Ok(Decision::deny(DecisionReason::StaleRoleReference { role }));
            }
            Err(e) => return Err(e),
        };

        let tags = match self.resolver.resolve(&principal.tenant_id, target).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!(principal = %principal.id, resource = %target, error = %e,
                    "target scope unresolved, denying");
                return Ok(Decision::deny(DecisionReason::UnresolvedTarget {
                    resource: target.clone(),
                }));
            }
        };

        Ok(Self::decide(&granted, action, &tags))
    }

    /// Authorize `action` against pre-resolved scope tags.
    ///
    /// Used for targets whose scope the caller already knows, e.g.
    /// tenant-level management operations.
    pub async fn authorize_scoped(
        &self,
        principal: &Principal,
        action: &Action,
        tags: &[ScopeTag],
    ) -> Result<Decision> {
        let granted = match self.effective_permissions(principal).await {
            Ok(granted) => granted,
            Err(AuthzError::UnknownRole(role)) => {
                warn!(principal = %principal.id, %role, "stale role reference, denying");
                return Ok(Decision::deny(DecisionReason::StaleRoleReference { role }));
            }
            Err(e) => return Err(e),
        };
        Ok(Self::decide(&granted, action, tags))
    }

    /// Authorize a tenant-level management action.
    ///
    /// Denies outright when the addressed tenant is not the principal's own;
    /// tenants are independent authorization domains.
    pub async fn authorize_tenant(
        &self,
        principal: &Principal,
        action: &Action,
        tenant: &TenantId,
    ) -> Result<Decision> {
        if *tenant != principal.tenant_id {
            warn!(principal = %principal.id, %tenant, "cross-tenant request denied");
            return Ok(Decision::deny(DecisionReason::TenantMismatch));
        }
        self.authorize_scoped(principal, action, &[ScopeTag::tenant(tenant)])
            .await
    }

    /// Authorize `action` against a collection of targets, all-or-nothing.
    ///
    /// Allow only when a single permission in the effective set covers every
    /// target. A batch spanning two scopes is denied even when the principal
    /// holds a separate concrete permission for each scope involved; only a
    /// wildcard grant covers a cross-scope batch.
    pub async fn authorize_batch(
        &self,
        principal: &Principal,
        action: &Action,
        targets: &[ResourceId],
    ) -> Result<Decision> {
        let granted = match self.effective_permissions(principal).await {
            Ok(granted) => granted,
            Err(AuthzError::UnknownRole(role)) => {
                warn!(principal = %principal.id, %role, "stale role reference, denying");
                return Ok(Decision::deny(DecisionReason::StaleRoleReference { role }));
            }
            Err(e) => return Err(e),
        };

        if targets.is_empty() {
            return Ok(Decision::deny(DecisionReason::NoMatchingPermission));
        }

        let mut resolved: Vec<(&ResourceId, Vec<ScopeTag>)> = Vec::with_capacity(targets.len());
        for target in targets {
            match self.resolver.resolve(&principal.tenant_id, target).await {
                Ok(tags) => resolved.push((target, tags)),
                Err(e) => {
                    warn!(principal = %principal.id, resource = %target, error = %e,
                        "batch target scope unresolved, denying");
                    return Ok(Decision::deny(DecisionReason::UnresolvedTarget {
                        resource: target.clone(),
                    }));
                }
            }
        }

        let candidates: Vec<&GrantedPermission> = granted
            .iter()
            .filter(|g| g.permission.action == *action)
            .collect();
        if candidates.is_empty() {
            debug!(principal = %principal.id, %action, "no permission for action");
            return Ok(Decision::deny(DecisionReason::NoMatchingPermission));
        }

        for candidate in &candidates {
            if resolved
                .iter()
                .all(|(_, tags)| candidate.permission.matches(action, tags))
            {
                debug!(principal = %principal.id, %action, role = %candidate.role,
                    targets = targets.len(), "batch allowed under single scope");
                return Ok(Decision::allow(DecisionReason::PermissionMatch {
                    role: candidate.role.clone(),
                    action: action.clone(),
                }));
            }
        }

        // Partial coverage. Name the first target the widest candidate
        // misses so operators can see which member broke the batch.
        let offender = resolved
            .iter()
            .find(|(_, tags)| {
                !candidates
                    .iter()
                    .any(|c| c.permission.matches(action, tags))
            })
            .or_else(|| {
                resolved
                    .iter()
                    .find(|(_, tags)| !candidates[0].permission.matches(action, tags))
            })
            .map(|(target, _)| (*target).clone())
            .unwrap_or_else(|| targets[0].clone());

        debug!(principal = %principal.id, %action, resource = %offender,
            "batch denied, target outside permitted scope");
        Ok(Decision::deny(DecisionReason::ScopeViolation {
            resource: offender,
        }))
    }

    /// Narrow `candidates` to the targets the principal may perform `action`
    /// on, one decision per item.
    ///
    /// Preserves input order, is idempotent, and maps empty input to empty
    /// output. Targets whose scope cannot be resolved are dropped.
    pub async fn filter_visible(
        &self,
        principal: &Principal,
        action: &Action,
        candidates: &[ResourceId],
    ) -> Result<Vec<ResourceId>> {
        let granted = match self.effective_permissions(principal).await {
            Ok(granted) => granted,
            Err(AuthzError::UnknownRole(role)) => {
                warn!(principal = %principal.id, %role, "stale role reference, filtering to empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut visible = Vec::new();
        for candidate in candidates {
            let tags = match self.resolver.resolve(&principal.tenant_id, candidate).await {
                Ok(tags) => tags,
                Err(e) => {
                    debug!(resource = %candidate, error = %e, "dropping unresolvable candidate");
                    continue;
                }
            };
            if granted.iter().any(|g| g.permission.matches(action, &tags)) {
                visible.push(candidate.clone());
            }
        }
        Ok(visible)
    }

    /// Whether the principal holds a wildcard-scoped grant for `action`.
    ///
    /// Wildcard holders bypass scope filtering entirely, so they may be told
    /// that a resource does not exist instead of a blanket deny.
    pub async fn has_unscoped_grant(&self, principal: &Principal, action: &Action) -> Result<bool> {
        match self.effective_permissions(principal).await {
            Ok(granted) => Ok(granted.iter().any(|g| {
                g.permission.action == *action && g.permission.object.value.is_wildcard()
            })),
            Err(AuthzError::UnknownRole(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn decide(granted: &[GrantedPermission], action: &Action, tags: &[ScopeTag]) -> Decision {
        match granted.iter().find(|g| g.permission.matches(action, tags)) {
            Some(g) => {
                debug!(role = %g.role, %action, "permission match");
                Decision::allow(DecisionReason::PermissionMatch {
                    role: g.role.clone(),
                    action: action.clone(),
                })
            }
            None => {
                debug!(%action, "no matching permission");
                Decision::deny(DecisionReason::NoMatchingPermission)
            }
        }
    }
}
