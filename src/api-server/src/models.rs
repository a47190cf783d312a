//! Request/response bodies for the management API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use fleetgate_authz::{Action, ObjectType, Permission, Role, ScopeValue};

/// Wire shape of a permission: `{action, object: {type, value}}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionBody {
    pub action: String,
    pub object: PermissionObjectBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionObjectBody {
    #[serde(rename = "type")]
    pub object_type: String,
    pub value: String,
}

impl From<PermissionBody> for Permission {
    fn from(body: PermissionBody) -> Self {
        Permission::new(
            Action::new(body.action),
            ObjectType::new(body.object.object_type),
            ScopeValue::new(body.object.value),
        )
    }
}

impl From<Permission> for PermissionBody {
    fn from(permission: Permission) -> Self {
        Self {
            action: permission.action.as_str().to_string(),
            object: PermissionObjectBody {
                object_type: permission.object.object_type.as_str().to_string(),
                value: permission.object.value.as_str().to_string(),
            },
        }
    }
}

/// `POST /roles`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1))]
    pub name: String,
    pub permissions: Vec<PermissionBody>,
}

impl From<CreateRoleRequest> for Role {
    fn from(req: CreateRoleRequest) -> Self {
        Role::new(
            req.name,
            req.permissions.into_iter().map(Permission::from).collect(),
        )
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleResponse {
    pub name: String,
    pub permissions: Vec<PermissionBody>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            name: role.name,
            permissions: role
                .permissions
                .into_iter()
                .map(PermissionBody::from)
                .collect(),
        }
    }
}

/// `POST /users`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// `PUT /users/{id}`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeviceResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// `PUT /devices/{id}/group`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AssignGroupRequest {
    #[validate(length(min = 1))]
    pub group: String,
}

/// `POST /deployments`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDeploymentRequest {
    #[validate(length(min = 1))]
    pub artifact_name: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub devices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeploymentResponse {
    pub id: String,
    pub name: String,
    pub artifact_name: String,
    pub device_count: usize,
    pub created_at: DateTime<Utc>,
}

/// `POST /device-configurations/{id}/deploy`
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeployConfigurationRequest {
    #[serde(default)]
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeployConfigurationResponse {
    pub deployment_id: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfigurationResponse {
    pub id: String,
    #[schema(value_type = Object)]
    pub configuration: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}
