//! Role definition storage
//!
//! Roles are tenant-keyed; nothing stored under one tenant is visible to
//! another. Updates are last-writer-wins, and the engine reads whatever
//! definition is current at decision time.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::{Role, TenantId};

/// Role store trait
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Get a role by name within a tenant's namespace.
    async fn get(&self, tenant: &TenantId, name: &str) -> Result<Option<Role>>;

    /// Create or replace a role. The definition is validated before it is
    /// stored: malformed permissions are rejected here, not at evaluation
    /// time.
    async fn put(&self, tenant: &TenantId, role: Role) -> Result<()>;

    /// Delete a role. Returns whether it existed.
    async fn delete(&self, tenant: &TenantId, name: &str) -> Result<bool>;

    /// List all roles in a tenant's namespace, sorted by name.
    async fn list(&self, tenant: &TenantId) -> Result<Vec<Role>>;
}

/// In-memory role store implementation
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<(TenantId, String), Role>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get(&self, tenant: &TenantId, name: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.get(&(tenant.clone(), name.to_string())).cloned())
    }

    async fn put(&self, tenant: &TenantId, role: Role) -> Result<()> {
        role.validate()?;
        let mut roles = self.roles.write().await;
        roles.insert((tenant.clone(), role.name.clone()), role);
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, name: &str) -> Result<bool> {
        let mut roles = self.roles.write().await;
        Ok(roles.remove(&(tenant.clone(), name.to_string())).is_some())
    }

    async fn list(&self, tenant: &TenantId) -> Result<Vec<Role>> {
        let roles = self.roles.read().await;
        let mut out: Vec<Role> = roles
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, role)| role.clone())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
