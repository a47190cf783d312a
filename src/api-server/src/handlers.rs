//! HTTP request handlers for the management API
//!
//! Every gated handler consults the authorization engine before touching a
//! store. Device-scoped handlers answer 403 for both "denied" and "no such
//! device" so callers cannot probe the inventory; only callers holding a
//! wildcard grant for the action get an honest 404. Deployment creation
//! keeps its historical 405 on scope violations.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use fleetgate_authz::{
    actions, Action, DecisionReason, Principal, ResourceId, Role, RoleStore,
};

use crate::{
    error::{ApiError, Result},
    models::{
        AssignGroupRequest, ConfigurationResponse, CreateDeploymentRequest, CreateRoleRequest,
        CreateUserRequest, DeployConfigurationRequest, DeployConfigurationResponse,
        DeploymentResponse, DeviceResponse, HealthResponse, RoleResponse, UpdateUserRequest,
        UserResponse,
    },
    state::AppState,
    stores::{Deployment, User},
};

/// Require a tenant-wide grant for an administrative action.
async fn require_tenant_action(
    state: &AppState,
    principal: &Principal,
    action: &Action,
) -> Result<()> {
    let decision = state
        .engine
        .authorize_tenant(principal, action, &principal.tenant_id)
        .await?;
    if decision.is_allowed() {
        Ok(())
    } else {
        debug!(principal = %principal.id, %action, "administrative action denied");
        Err(ApiError::Forbidden("insufficient permissions".to_string()))
    }
}

/// Require a grant covering one device.
///
/// A denied caller gets 403 whether the device exists or not. Callers whose
/// grant is unscoped for the action would see every device anyway, so an
/// unresolvable id is reported to them as 404 instead.
async fn require_device_action(
    state: &AppState,
    principal: &Principal,
    action: &Action,
    device_id: &str,
) -> Result<()> {
    let target = ResourceId::new(device_id);
    let decision = state.engine.authorize(principal, action, &target).await?;
    if decision.is_allowed() {
        return Ok(());
    }

    if matches!(decision.reason, DecisionReason::UnresolvedTarget { .. })
        && state.engine.has_unscoped_grant(principal, action).await?
    {
        return Err(ApiError::NotFound(format!("device {} not found", device_id)));
    }

    debug!(
        principal = %principal.id,
        %action,
        device = %device_id,
        "device action denied"
    );
    Err(ApiError::Forbidden("insufficient permissions".to_string()))
}

/// Reject role assignments that reference roles with no definition.
async fn require_known_roles(state: &AppState, principal: &Principal, roles: &[String]) -> Result<()> {
    for name in roles {
        if state
            .roles
            .get(&principal.tenant_id, name)
            .await?
            .is_none()
        {
            return Err(ApiError::BadRequest(format!("unknown role: {}", name)));
        }
    }
    Ok(())
}

// ============================================================================
// Health
// ============================================================================

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

// ============================================================================
// Roles
// ============================================================================

/// Create a role
#[utoipa::path(
    post,
    path = "/api/management/v1/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Malformed role definition", body = ErrorResponse),
        (status = 403, description = "Caller may not manage roles", body = ErrorResponse)
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>)> {
    require_tenant_action(&state, &principal, &Action::new(actions::MANAGE_ROLES)).await?;
    request.validate()?;

    let role: Role = request.into();
    let response = RoleResponse::from(role.clone());
    state.roles.put(&principal.tenant_id, role).await?;

    info!(tenant = %principal.tenant_id, role = %response.name, "role created");
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the tenant's roles
#[utoipa::path(
    get,
    path = "/api/management/v1/roles",
    tag = "roles",
    responses(
        (status = 200, description = "Roles in the tenant's namespace", body = [RoleResponse]),
        (status = 403, description = "Caller may not manage roles", body = ErrorResponse)
    )
)]
pub async fn list_roles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<RoleResponse>>> {
    require_tenant_action(&state, &principal, &Action::new(actions::MANAGE_ROLES)).await?;

    let roles = state.roles.list(&principal.tenant_id).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

/// Delete a role
///
/// Users still referencing the deleted role keep the dangling name; the
/// engine treats it as stale and denies until the assignment is corrected.
#[utoipa::path(
    delete,
    path = "/api/management/v1/roles/{name}",
    tag = "roles",
    params(("name" = String, Path, description = "Role name")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 403, description = "Caller may not manage roles", body = ErrorResponse),
        (status = 404, description = "No such role", body = ErrorResponse)
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    require_tenant_action(&state, &principal, &Action::new(actions::MANAGE_ROLES)).await?;

    if state.roles.delete(&principal.tenant_id, &name).await? {
        info!(tenant = %principal.tenant_id, role = %name, "role deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no such role: {}", name)))
    }
}

// ============================================================================
// Users
// ============================================================================

/// Create a user
#[utoipa::path(
    post,
    path = "/api/management/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid user or unknown role", body = ErrorResponse),
        (status = 403, description = "Caller may not manage users", body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    require_tenant_action(&state, &principal, &Action::new(actions::MANAGE_USERS)).await?;
    request.validate()?;
    require_known_roles(&state, &principal, &request.roles).await?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: request.email,
        tenant_id: principal.tenant_id.clone(),
        roles: request.roles,
    };
    let response = UserResponse {
        id: user.id.clone(),
        email: user.email.clone(),
        roles: user.roles.clone(),
    };
    state.users.insert(user).await;

    info!(tenant = %principal.tenant_id, user = %response.id, "user created");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Replace a user's role assignment
///
/// Takes effect on the user's next request; there is no session state to
/// invalidate.
#[utoipa::path(
    put,
    path = "/api/management/v1/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 204, description = "Roles replaced"),
        (status = 400, description = "Unknown role referenced", body = ErrorResponse),
        (status = 403, description = "Caller may not manage users", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<StatusCode> {
    require_tenant_action(&state, &principal, &Action::new(actions::MANAGE_USERS)).await?;
    require_known_roles(&state, &principal, &request.roles).await?;

    if state
        .users
        .set_roles(&principal.tenant_id, &id, request.roles)
        .await
    {
        info!(tenant = %principal.tenant_id, user = %id, "user roles replaced");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("no such user: {}", id)))
    }
}

// ============================================================================
// Devices
// ============================================================================

/// List devices visible to the caller
///
/// The inventory is filtered per device against the caller's VIEW_DEVICE
/// grants; a caller with no matching grant gets an empty list, not an error.
#[utoipa::path(
    get,
    path = "/api/management/v1/devices",
    tag = "devices",
    responses(
        (status = 200, description = "Devices the caller may view", body = [DeviceResponse])
    )
)]
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<DeviceResponse>>> {
    let devices = state.devices.list(&principal.tenant_id).await;
    let candidates: Vec<ResourceId> = devices.iter().map(|d| ResourceId::new(&d.id)).collect();

    let visible = state
        .engine
        .filter_visible(&principal, &Action::new(actions::VIEW_DEVICE), &candidates)
        .await?;

    let by_id: HashMap<&str, &crate::stores::Device> =
        devices.iter().map(|d| (d.id.as_str(), d)).collect();
    let response = visible
        .iter()
        .filter_map(|id| by_id.get(id.as_str()))
        .map(|d| DeviceResponse {
            id: d.id.clone(),
            group: d.group.clone(),
        })
        .collect();

    Ok(Json(response))
}

/// Move a device into a static group
#[utoipa::path(
    put,
    path = "/api/management/v1/devices/{id}/group",
    tag = "devices",
    params(("id" = String, Path, description = "Device id")),
    request_body = AssignGroupRequest,
    responses(
        (status = 204, description = "Device regrouped"),
        (status = 403, description = "Caller may not manage this device's groups", body = ErrorResponse),
        (status = 404, description = "No such device (wildcard callers only)", body = ErrorResponse)
    )
)]
pub async fn assign_device_group(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<AssignGroupRequest>,
) -> Result<StatusCode> {
    request.validate()?;
    require_device_action(
        &state,
        &principal,
        &Action::new(actions::MANAGE_DEVICE_GROUPS),
        &id,
    )
    .await?;

    state
        .devices
        .set_group(&principal.tenant_id, &id, Some(request.group.clone()))
        .await;

    info!(tenant = %principal.tenant_id, device = %id, group = %request.group, "device regrouped");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Deployments
// ============================================================================

/// Create a software deployment to a set of devices
///
/// All-or-nothing: a single grant must cover every named device, so a
/// caller scoped to two groups separately still cannot deploy across them
/// in one request. Denials are 405, never partial deployments.
#[utoipa::path(
    post,
    path = "/api/management/v1/deployments",
    tag = "deployments",
    request_body = CreateDeploymentRequest,
    responses(
        (status = 201, description = "Deployment created", body = DeploymentResponse),
        (status = 400, description = "Malformed deployment request", body = ErrorResponse),
        (status = 405, description = "Deployment outside the caller's scope", body = ErrorResponse)
    )
)]
pub async fn create_deployment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateDeploymentRequest>,
) -> Result<(StatusCode, Json<DeploymentResponse>)> {
    request.validate()?;

    let targets: Vec<ResourceId> = request.devices.iter().map(ResourceId::new).collect();
    let decision = state
        .engine
        .authorize_batch(&principal, &Action::new(actions::CREATE_DEPLOYMENT), &targets)
        .await?;

    if !decision.is_allowed() {
        debug!(
            principal = %principal.id,
            devices = targets.len(),
            reason = ?decision.reason,
            "deployment denied"
        );
        return Err(ApiError::MethodNotAllowed(
            "deployment outside permitted scope".to_string(),
        ));
    }

    let deployment = Deployment {
        id: Uuid::new_v4().to_string(),
        tenant_id: principal.tenant_id.clone(),
        name: request.name,
        artifact_name: request.artifact_name,
        device_count: targets.len(),
        created_at: chrono::Utc::now(),
    };
    let response = DeploymentResponse {
        id: deployment.id.clone(),
        name: deployment.name.clone(),
        artifact_name: deployment.artifact_name.clone(),
        device_count: deployment.device_count,
        created_at: deployment.created_at,
    };
    state.deployments.insert(deployment).await;

    info!(
        tenant = %principal.tenant_id,
        deployment = %response.id,
        devices = response.device_count,
        "deployment created"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

// ============================================================================
// Device configurations
// ============================================================================

/// Store a device's configuration
#[utoipa::path(
    put,
    path = "/api/management/v1/device-configurations/{id}",
    tag = "configurations",
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 204, description = "Configuration stored"),
        (status = 403, description = "Caller may not configure this device", body = ErrorResponse)
    )
)]
pub async fn set_configuration(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(configuration): Json<serde_json::Value>,
) -> Result<StatusCode> {
    require_device_action(
        &state,
        &principal,
        &Action::new(actions::CREATE_DEPLOYMENT),
        &id,
    )
    .await?;

    state
        .configs
        .set(&principal.tenant_id, &id, configuration)
        .await;

    info!(tenant = %principal.tenant_id, device = %id, "configuration stored");
    Ok(StatusCode::NO_CONTENT)
}

/// Deploy a device's stored configuration
#[utoipa::path(
    post,
    path = "/api/management/v1/device-configurations/{id}/deploy",
    tag = "configurations",
    params(("id" = String, Path, description = "Device id")),
    request_body = DeployConfigurationRequest,
    responses(
        (status = 200, description = "Configuration deployment started", body = DeployConfigurationResponse),
        (status = 403, description = "Caller may not configure this device", body = ErrorResponse),
        (status = 404, description = "No stored configuration", body = ErrorResponse)
    )
)]
pub async fn deploy_configuration(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(request): Json<DeployConfigurationRequest>,
) -> Result<Json<DeployConfigurationResponse>> {
    require_device_action(
        &state,
        &principal,
        &Action::new(actions::CREATE_DEPLOYMENT),
        &id,
    )
    .await?;

    if state.configs.get(&principal.tenant_id, &id).await.is_none() {
        return Err(ApiError::NotFound(format!(
            "no configuration stored for device {}",
            id
        )));
    }

    let deployment = Deployment {
        id: Uuid::new_v4().to_string(),
        tenant_id: principal.tenant_id.clone(),
        name: format!("configuration-{}", id),
        artifact_name: "device-configuration".to_string(),
        device_count: 1,
        created_at: chrono::Utc::now(),
    };
    let deployment_id = deployment.id.clone();
    state.deployments.insert(deployment).await;

    info!(
        tenant = %principal.tenant_id,
        device = %id,
        deployment = %deployment_id,
        retries = request.retries,
        "configuration deployment started"
    );
    Ok(Json(DeployConfigurationResponse { deployment_id }))
}

/// Read a device's stored configuration
#[utoipa::path(
    get,
    path = "/api/management/v1/device-configurations/{id}",
    tag = "configurations",
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Stored configuration", body = ConfigurationResponse),
        (status = 403, description = "Caller may not view this device", body = ErrorResponse),
        (status = 404, description = "No stored configuration", body = ErrorResponse)
    )
)]
pub async fn get_configuration(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<ConfigurationResponse>> {
    require_device_action(&state, &principal, &Action::new(actions::VIEW_DEVICE), &id).await?;

    match state.configs.get(&principal.tenant_id, &id).await {
        Some(configuration) => Ok(Json(ConfigurationResponse { id, configuration })),
        None => Err(ApiError::NotFound(format!(
            "no configuration stored for device {}",
            id
        ))),
    }
}
