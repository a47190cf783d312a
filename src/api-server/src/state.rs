//! Shared application state

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use fleetgate_authz::{actions, AuthzEngine, InMemoryRoleStore, Role, RoleStore, TenantId};

use crate::stores::{ConfigStore, DeploymentStore, DeviceStore, User, UserStore};

/// State shared across handlers
///
/// The engine borrows the role store and the device inventory through its
/// seams, so every authorization decision observes whatever those stores
/// hold at decision time; there is no decision cache to invalidate.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthzEngine>,
    pub roles: Arc<InMemoryRoleStore>,
    pub users: Arc<UserStore>,
    pub devices: Arc<DeviceStore>,
    pub deployments: Arc<DeploymentStore>,
    pub configs: Arc<ConfigStore>,
    pub start_time: Instant,
    pub version: String,
}

impl AppState {
    pub fn new() -> Self {
        let roles = Arc::new(InMemoryRoleStore::new());
        let users = Arc::new(UserStore::new());
        let devices = Arc::new(DeviceStore::new());
        let engine = Arc::new(AuthzEngine::new(roles.clone(), devices.clone()));

        Self {
            engine,
            roles,
            users,
            devices,
            deployments: Arc::new(DeploymentStore::new()),
            configs: Arc::new(ConfigStore::new()),
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Seed one tenant with the distinguished admin role and a first user
    /// holding it.
    ///
    /// Tenant provisioning proper is handled elsewhere; the gateway only
    /// needs an initial administrator whose wildcard grants let them create
    /// roles and users. The admin role is an ordinary role, so evaluation
    /// stays uniform and there is no ambient "admin bypass".
    pub async fn bootstrap(
        tenant: TenantId,
        admin_id: impl Into<String>,
        admin_email: impl Into<String>,
    ) -> fleetgate_authz::Result<Self> {
        let state = Self::new();
        let admin_id = admin_id.into();

        state
            .roles
            .put(&tenant, Role::unrestricted("admin", actions::ALL))
            .await?;
        state
            .users
            .insert(User {
                id: admin_id.clone(),
                email: admin_email.into(),
                tenant_id: tenant.clone(),
                roles: vec!["admin".to_string()],
            })
            .await;

        info!(%tenant, admin = %admin_id, "bootstrapped tenant with admin role");
        Ok(state)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
