//! Route definitions for the API server
//!
//! This module configures all HTTP routes with OpenAPI documentation.
//! Routes are organized by functionality:
//! - Health endpoint
//! - Role management
//! - User management
//! - Device inventory and grouping
//! - Deployments
//! - Device configurations

use crate::{handlers, middleware, state::AppState};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fleetgate Management API",
        version = "0.1.0",
        description = "Group-scoped RBAC gateway for fleet management",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    paths(
        handlers::health_check,
        handlers::create_role,
        handlers::list_roles,
        handlers::delete_role,
        handlers::create_user,
        handlers::update_user,
        handlers::list_devices,
        handlers::assign_device_group,
        handlers::create_deployment,
        handlers::set_configuration,
        handlers::deploy_configuration,
        handlers::get_configuration,
    ),
    components(
        schemas(
            crate::models::PermissionBody,
            crate::models::PermissionObjectBody,
            crate::models::CreateRoleRequest,
            crate::models::RoleResponse,
            crate::models::CreateUserRequest,
            crate::models::UpdateUserRequest,
            crate::models::UserResponse,
            crate::models::DeviceResponse,
            crate::models::AssignGroupRequest,
            crate::models::CreateDeploymentRequest,
            crate::models::DeploymentResponse,
            crate::models::DeployConfigurationRequest,
            crate::models::DeployConfigurationResponse,
            crate::models::ConfigurationResponse,
            crate::models::HealthResponse,
            crate::models::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health and monitoring endpoints"),
        (name = "roles", description = "Role management endpoints"),
        (name = "users", description = "User management endpoints"),
        (name = "devices", description = "Device inventory endpoints"),
        (name = "deployments", description = "Deployment endpoints"),
        (name = "configurations", description = "Device configuration endpoints"),
    )
)]
pub struct ApiDoc;

/// Create the application router with all routes and middleware
///
/// Management routes live under /api/management/v1 and require a resolved
/// principal; /health and the OpenAPI documentation are open.
pub fn create_router(state: AppState) -> Router {
    let management_routes = Router::new()
        // Role endpoints
        .route("/roles", post(handlers::create_role))
        .route("/roles", get(handlers::list_roles))
        .route("/roles/:name", delete(handlers::delete_role))
        // User endpoints
        .route("/users", post(handlers::create_user))
        .route("/users/:id", put(handlers::update_user))
        // Device endpoints
        .route("/devices", get(handlers::list_devices))
        .route("/devices/:id/group", put(handlers::assign_device_group))
        // Deployment endpoints
        .route("/deployments", post(handlers::create_deployment))
        // Configuration endpoints
        .route(
            "/device-configurations/:id",
            put(handlers::set_configuration),
        )
        .route(
            "/device-configurations/:id",
            get(handlers::get_configuration),
        )
        .route(
            "/device-configurations/:id/deploy",
            post(handlers::deploy_configuration),
        );

    Router::new()
        // Health (no principal required)
        .route("/health", get(handlers::health_check))
        // Management routes (principal required)
        .nest("/api/management/v1", management_routes)
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware layers (executed bottom to top)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
