//! # Fleetgate Authorization Engine
//!
//! Group-scoped RBAC for a multi-tenant device-management platform. A
//! principal's effective permission set is the union of its roles'
//! permissions; a permission grants one action over objects of one type,
//! restricted to a concrete scope value or the wildcard. Absence of a match
//! is always a deny.
//!
//! The engine is a pure decision function: role definitions and target
//! scope membership are read fresh through the [`RoleStore`] and
//! [`TargetResolver`] seams on every call, and no decision is ever cached
//! across requests.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fleetgate_authz::{
//!     actions, Action, AuthzEngine, InMemoryRoleStore, Permission, Principal,
//!     ResourceId, Role, RoleStore, TenantId,
//! };
//! # use fleetgate_authz::{ScopeTag, TargetResolver, ResolveError};
//! # struct Inventory;
//! # #[async_trait::async_trait]
//! # impl TargetResolver for Inventory {
//! #     async fn resolve(&self, _: &TenantId, _: &ResourceId)
//! #         -> Result<Vec<ScopeTag>, ResolveError> { Ok(vec![]) }
//! # }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tenant = TenantId::new("acme");
//! let roles = Arc::new(InMemoryRoleStore::new());
//! roles
//!     .put(
//!         &tenant,
//!         Role::new(
//!             "deployers",
//!             vec![Permission::device_group(actions::CREATE_DEPLOYMENT, "test")],
//!         ),
//!     )
//!     .await?;
//!
//! let engine = AuthzEngine::new(roles, Arc::new(Inventory));
//! let principal = Principal::new("alice", tenant).with_role("deployers");
//!
//! let decision = engine
//!     .authorize(
//!         &principal,
//!         &Action::new(actions::CREATE_DEPLOYMENT),
//!         &ResourceId::new("device-1"),
//!     )
//!     .await?;
//! if decision.is_allowed() {
//!     println!("deployment permitted");
//! }
//! # Ok(())
//! # }
//! ```

pub mod decision;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod store;
pub mod types;

pub use decision::{Decision, DecisionReason};
pub use engine::{AuthzEngine, GrantedPermission};
pub use error::{AuthzError, Result};
pub use resolver::{ResolveError, TargetResolver};
pub use store::{InMemoryRoleStore, RoleStore};
pub use types::{
    actions, object_types, Action, ObjectType, Permission, Principal, ResourceId, Role,
    ScopeObject, ScopeTag, ScopeValue, TenantId, SCOPE_WILDCARD,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
