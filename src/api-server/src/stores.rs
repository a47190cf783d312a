//! Tenant-keyed domain stores
//!
//! In-memory backing for users, devices, deployments, and device
//! configurations. Every store is keyed by `(tenant, id)`; nothing stored
//! under one tenant is reachable from another. The device store doubles as
//! the engine's target resolver: a device resolves to its current group
//! membership at decision time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use fleetgate_authz::{ResolveError, ResourceId, ScopeTag, TargetResolver, TenantId};

/// A management-API user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// In-memory user store
pub struct UserStore {
    users: RwLock<HashMap<(TenantId, String), User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert((user.tenant_id.clone(), user.id.clone()), user);
    }

    pub async fn get(&self, tenant: &TenantId, id: &str) -> Option<User> {
        let users = self.users.read().await;
        users.get(&(tenant.clone(), id.to_string())).cloned()
    }

    /// Look a user up by id alone, across tenants. Used by the identity
    /// middleware, where the tenant is not yet known.
    pub async fn find(&self, id: &str) -> Option<User> {
        let users = self.users.read().await;
        users.values().find(|u| u.id == id).cloned()
    }

    /// Replace a user's role assignment. Returns false when the user does
    /// not exist in the tenant's namespace.
    pub async fn set_roles(&self, tenant: &TenantId, id: &str, roles: Vec<String>) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&(tenant.clone(), id.to_string())) {
            Some(user) => {
                user.roles = roles;
                true
            }
            None => false,
        }
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A device in the tenant's inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub tenant_id: TenantId,
    /// Current (static) group membership; ungrouped devices carry none.
    pub group: Option<String>,
}

/// In-memory device inventory
///
/// Implements [`TargetResolver`]: group membership is read fresh per
/// authorization decision, so moving a device between groups takes effect on
/// the very next check.
pub struct DeviceStore {
    devices: RwLock<HashMap<(TenantId, String), Device>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, device: Device) {
        let mut devices = self.devices.write().await;
        devices.insert((device.tenant_id.clone(), device.id.clone()), device);
    }

    pub async fn get(&self, tenant: &TenantId, id: &str) -> Option<Device> {
        let devices = self.devices.read().await;
        devices.get(&(tenant.clone(), id.to_string())).cloned()
    }

    /// All devices in the tenant's inventory, sorted by id.
    pub async fn list(&self, tenant: &TenantId) -> Vec<Device> {
        let devices = self.devices.read().await;
        let mut out: Vec<Device> = devices
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, d)| d.clone())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Move a device into a (static) group. Returns false when the device
    /// does not exist.
    pub async fn set_group(&self, tenant: &TenantId, id: &str, group: Option<String>) -> bool {
        let mut devices = self.devices.write().await;
        match devices.get_mut(&(tenant.clone(), id.to_string())) {
            Some(device) => {
                device.group = group;
                true
            }
            None => false,
        }
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TargetResolver for DeviceStore {
    async fn resolve(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
    ) -> Result<Vec<ScopeTag>, ResolveError> {
        match self.get(tenant, resource.as_str()).await {
            Some(device) => Ok(device
                .group
                .map(|g| vec![ScopeTag::device_group(g)])
                .unwrap_or_default()),
            None => Err(ResolveError::UnknownResource(resource.clone())),
        }
    }
}

/// A created deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub tenant_id: TenantId,
    pub name: String,
    pub artifact_name: String,
    pub device_count: usize,
    pub created_at: DateTime<Utc>,
}

/// In-memory deployment store
pub struct DeploymentStore {
    deployments: RwLock<HashMap<(TenantId, String), Deployment>>,
}

impl DeploymentStore {
    pub fn new() -> Self {
        Self {
            deployments: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, deployment: Deployment) {
        let mut deployments = self.deployments.write().await;
        deployments.insert(
            (deployment.tenant_id.clone(), deployment.id.clone()),
            deployment,
        );
    }

    pub async fn get(&self, tenant: &TenantId, id: &str) -> Option<Deployment> {
        let deployments = self.deployments.read().await;
        deployments.get(&(tenant.clone(), id.to_string())).cloned()
    }
}

impl Default for DeploymentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory device-configuration store (device id -> configuration object)
pub struct ConfigStore {
    configs: RwLock<HashMap<(TenantId, String), serde_json::Value>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            configs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, tenant: &TenantId, device_id: &str, config: serde_json::Value) {
        let mut configs = self.configs.write().await;
        configs.insert((tenant.clone(), device_id.to_string()), config);
    }

    pub async fn get(&self, tenant: &TenantId, device_id: &str) -> Option<serde_json::Value> {
        let configs = self.configs.read().await;
        configs.get(&(tenant.clone(), device_id.to_string())).cloned()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgate_authz::object_types;

    fn device(tenant: &TenantId, id: &str, group: Option<&str>) -> Device {
        Device {
            id: id.to_string(),
            tenant_id: tenant.clone(),
            group: group.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn device_resolves_to_its_current_group() {
        let tenant = TenantId::new("acme");
        let store = DeviceStore::new();
        store.insert(device(&tenant, "dev-1", Some("test"))).await;

        let tags = store
            .resolve(&tenant, &ResourceId::new("dev-1"))
            .await
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].object_type.as_str(), object_types::DEVICE_GROUP);
        assert_eq!(tags[0].value.as_str(), "test");

        // Regrouping shows up on the next resolution.
        store
            .set_group(&tenant, "dev-1", Some("staging".to_string()))
            .await;
        let tags = store
            .resolve(&tenant, &ResourceId::new("dev-1"))
            .await
            .unwrap();
        assert_eq!(tags[0].value.as_str(), "staging");
    }

    #[tokio::test]
    async fn ungrouped_device_resolves_to_no_tags() {
        let tenant = TenantId::new("acme");
        let store = DeviceStore::new();
        store.insert(device(&tenant, "dev-1", None)).await;

        let tags = store
            .resolve(&tenant, &ResourceId::new("dev-1"))
            .await
            .unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn unknown_device_is_a_resolve_error() {
        let tenant = TenantId::new("acme");
        let store = DeviceStore::new();

        let err = store
            .resolve(&tenant, &ResourceId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn devices_do_not_resolve_across_tenants() {
        let tenant_a = TenantId::new("tenant-a");
        let tenant_b = TenantId::new("tenant-b");
        let store = DeviceStore::new();
        store.insert(device(&tenant_a, "dev-1", Some("test"))).await;

        assert!(store
            .resolve(&tenant_b, &ResourceId::new("dev-1"))
            .await
            .is_err());
        assert!(store.list(&tenant_b).await.is_empty());
    }

    #[tokio::test]
    async fn user_roles_can_be_replaced() {
        let tenant = TenantId::new("acme");
        let store = UserStore::new();
        store
            .insert(User {
                id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                tenant_id: tenant.clone(),
                roles: vec![],
            })
            .await;

        assert!(store.set_roles(&tenant, "u1", vec!["ops".to_string()]).await);
        assert_eq!(store.get(&tenant, "u1").await.unwrap().roles, vec!["ops"]);
        assert!(!store.set_roles(&tenant, "ghost", vec![]).await);
    }
}
