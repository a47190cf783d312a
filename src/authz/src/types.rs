//! Core authorization types
//!
//! Roles bundle permissions; a permission grants one action over objects of
//! one type, restricted to a single scope value or the distinguished
//! wildcard. Everything is tenant-scoped: a role only exists inside the
//! namespace of the tenant that created it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AuthzError, Result};

/// Known action vocabulary
///
/// Actions are compared as opaque values; these constants are the ones the
/// management surface uses, but nothing stops a tenant from defining roles
/// over additional action names.
pub mod actions {
    pub const CREATE_DEPLOYMENT: &str = "CREATE_DEPLOYMENT";
    pub const VIEW_DEVICE: &str = "VIEW_DEVICE";
    pub const MANAGE_ROLES: &str = "MANAGE_ROLES";
    pub const MANAGE_USERS: &str = "MANAGE_USERS";
    pub const MANAGE_DEVICE_GROUPS: &str = "MANAGE_DEVICE_GROUPS";

    /// Every action the management surface knows about.
    pub const ALL: &[&str] = &[
        CREATE_DEPLOYMENT,
        VIEW_DEVICE,
        MANAGE_ROLES,
        MANAGE_USERS,
        MANAGE_DEVICE_GROUPS,
    ];
}

/// Known object-type vocabulary
pub mod object_types {
    pub const DEVICE_GROUP: &str = "DEVICE_GROUP";
    pub const TENANT: &str = "TENANT";
}

/// Tenant identifier, an isolated authorization domain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a resource a principal acts upon (e.g. a device id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Action being performed (opaque, compared by value)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of object a permission applies to (e.g. `DEVICE_GROUP`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectType(String);

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn device_group() -> Self {
        Self::new(object_types::DEVICE_GROUP)
    }

    pub fn tenant() -> Self {
        Self::new(object_types::TENANT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scope value restricting a permission to one concrete object, or the
/// distinguished wildcard matching any value of the object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeValue(String);

/// The distinguished wildcard scope value.
pub const SCOPE_WILDCARD: &str = "*";

impl ScopeValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn wildcard() -> Self {
        Self(SCOPE_WILDCARD.to_string())
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == SCOPE_WILDCARD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A scope tag a resource resolves to at decision time
///
/// Tags are resolved fresh per decision, so group membership changes take
/// effect on the next authorization check, never later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeTag {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub value: ScopeValue,
}

impl ScopeTag {
    pub fn new(object_type: ObjectType, value: ScopeValue) -> Self {
        Self { object_type, value }
    }

    /// Tag for membership in a named device group.
    pub fn device_group(group: impl Into<String>) -> Self {
        Self::new(ObjectType::device_group(), ScopeValue::new(group))
    }

    /// Tag for a tenant-level target.
    pub fn tenant(tenant: &TenantId) -> Self {
        Self::new(ObjectType::tenant(), ScopeValue::new(tenant.as_str()))
    }
}

/// The object half of a permission: type plus scope value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeObject {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub value: ScopeValue,
}

/// A single grant: `action` may be performed on objects of `object.type`
/// restricted to `object.value`
///
/// Immutable once attached to a role; changing a role replaces its
/// permission set wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub action: Action,
    pub object: ScopeObject,
}

impl Permission {
    pub fn new(action: Action, object_type: ObjectType, value: ScopeValue) -> Self {
        Self {
            action,
            object: ScopeObject { object_type, value },
        }
    }

    /// A grant over a named device group.
    pub fn device_group(action: impl Into<String>, group: impl Into<String>) -> Self {
        Self::new(
            Action::new(action),
            ObjectType::device_group(),
            ScopeValue::new(group),
        )
    }

    /// An unrestricted (wildcard-scoped) grant for one action.
    pub fn unrestricted(action: impl Into<String>, object_type: ObjectType) -> Self {
        Self::new(Action::new(action), object_type, ScopeValue::wildcard())
    }

    /// Fail-fast validation applied at the administrative boundary.
    ///
    /// Empty actions, types, or values never reach evaluation time, and the
    /// wildcard is only meaningful in the value position.
    pub fn validate(&self) -> Result<()> {
        if self.action.as_str().is_empty() {
            return Err(AuthzError::InvalidPermission(
                "action must be a non-empty string".to_string(),
            ));
        }
        if self.object.object_type.as_str().is_empty() {
            return Err(AuthzError::InvalidPermission(
                "object type must be a non-empty string".to_string(),
            ));
        }
        if self.object.value.as_str().is_empty() {
            return Err(AuthzError::InvalidPermission(
                "object value must be a non-empty string".to_string(),
            ));
        }
        if self.action.as_str() == SCOPE_WILDCARD
            || self.object.object_type.as_str() == SCOPE_WILDCARD
        {
            return Err(AuthzError::InvalidPermission(
                "wildcard is only valid as an object value".to_string(),
            ));
        }
        Ok(())
    }

    /// Check whether this permission covers `action` against a target whose
    /// scope resolved to `tags`.
    ///
    /// A wildcard scope value matches any target, including one with no tag
    /// of the permission's object type (an ungrouped device is only visible
    /// through wildcard grants). A concrete value requires a tag with equal
    /// type and equal value.
    pub fn matches(&self, action: &Action, tags: &[ScopeTag]) -> bool {
        if self.action != *action {
            return false;
        }
        if self.object.value.is_wildcard() {
            return true;
        }
        tags.iter().any(|tag| {
            tag.object_type == self.object.object_type && tag.value == self.object.value
        })
    }
}

/// A named, reusable bundle of permissions within one tenant's namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }

    /// The distinguished admin role: a wildcard grant for every listed
    /// action. Management actions scope over the tenant, everything else
    /// over device groups.
    pub fn unrestricted(name: impl Into<String>, actions: &[&str]) -> Self {
        let permissions = actions
            .iter()
            .map(|action| {
                let object_type = match *action {
                    actions::MANAGE_ROLES | actions::MANAGE_USERS => ObjectType::tenant(),
                    _ => ObjectType::device_group(),
                };
                Permission::unrestricted(*action, object_type)
            })
            .collect();
        Self::new(name, permissions)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AuthzError::InvalidRole(
                "role name must be a non-empty string".to_string(),
            ));
        }
        for permission in &self.permissions {
            permission.validate()?;
        }
        Ok(())
    }
}

/// An authenticated actor on whose behalf actions are requested
///
/// Carries role names only; definitions are re-fetched from the role store
/// on every decision so that role edits apply instantly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            id: id.into(),
            tenant_id,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_wire_shape() {
        let permission = Permission::device_group(actions::CREATE_DEPLOYMENT, "test");
        let json = serde_json::to_value(&permission).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "action": "CREATE_DEPLOYMENT",
                "object": {"type": "DEVICE_GROUP", "value": "test"}
            })
        );
    }

    #[test]
    fn permission_matches_concrete_scope() {
        let permission = Permission::device_group(actions::CREATE_DEPLOYMENT, "test");
        let action = Action::new(actions::CREATE_DEPLOYMENT);

        assert!(permission.matches(&action, &[ScopeTag::device_group("test")]));
        assert!(!permission.matches(&action, &[ScopeTag::device_group("production")]));
        assert!(!permission.matches(&action, &[]));
        assert!(!permission.matches(&Action::new(actions::VIEW_DEVICE), &[ScopeTag::device_group("test")]));
    }

    #[test]
    fn wildcard_matches_any_value() {
        let permission =
            Permission::unrestricted(actions::VIEW_DEVICE, ObjectType::device_group());
        let action = Action::new(actions::VIEW_DEVICE);

        assert!(permission.matches(&action, &[ScopeTag::device_group("production")]));
        // Ungrouped targets are reachable only through the wildcard.
        assert!(permission.matches(&action, &[]));
    }

    #[test]
    fn scope_type_must_match_for_concrete_values() {
        let permission = Permission::new(
            Action::new(actions::MANAGE_ROLES),
            ObjectType::tenant(),
            ScopeValue::new("acme"),
        );
        let action = Action::new(actions::MANAGE_ROLES);

        assert!(permission.matches(&action, &[ScopeTag::tenant(&TenantId::new("acme"))]));
        // Same value under a different object type does not count.
        assert!(!permission.matches(&action, &[ScopeTag::device_group("acme")]));
    }

    #[test]
    fn validation_rejects_malformed_permissions() {
        let empty_action = Permission::device_group("", "test");
        assert!(matches!(
            empty_action.validate(),
            Err(AuthzError::InvalidPermission(_))
        ));

        let empty_value = Permission::device_group(actions::CREATE_DEPLOYMENT, "");
        assert!(empty_value.validate().is_err());

        let wildcard_action = Permission::device_group("*", "test");
        assert!(wildcard_action.validate().is_err());

        let ok = Permission::device_group(actions::CREATE_DEPLOYMENT, "test");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn role_validation_covers_permissions() {
        let role = Role::new(
            "deployers",
            vec![
                Permission::device_group(actions::CREATE_DEPLOYMENT, "test"),
                Permission::device_group("", "test"),
            ],
        );
        assert!(role.validate().is_err());

        let unnamed = Role::new("", vec![]);
        assert!(matches!(unnamed.validate(), Err(AuthzError::InvalidRole(_))));
    }

    #[test]
    fn unrestricted_role_covers_all_actions() {
        let role = Role::unrestricted("admin", actions::ALL);
        role.validate().unwrap();
        assert_eq!(role.permissions.len(), actions::ALL.len());
        assert!(role.permissions.iter().all(|p| p.object.value.is_wildcard()));
    }
}
