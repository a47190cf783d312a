//! End-to-end tests for the management API
//!
//! Each test drives the full router (identity middleware, handlers, engine,
//! stores) through tower's oneshot, with a bootstrapped tenant and a seeded
//! device fleet: 5 devices in "test", 30 in "production", 20 in "staging",
//! plus one ungrouped device.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use fleetgate_api_server::{routes::create_router, state::AppState, stores::Device};
use fleetgate_authz::TenantId;

const TENANT: &str = "acme";
const ADMIN: &str = "admin";

struct TestHarness {
    app: Router,
    state: AppState,
}

impl TestHarness {
    async fn new() -> Self {
        let tenant = TenantId::new(TENANT);
        let state = AppState::bootstrap(tenant.clone(), ADMIN, "admin@example.com")
            .await
            .unwrap();

        for (group, count) in [("test", 5), ("production", 30), ("staging", 20)] {
            for i in 0..count {
                state
                    .devices
                    .insert(Device {
                        id: format!("{}-{}", group, i),
                        tenant_id: tenant.clone(),
                        group: Some(group.to_string()),
                    })
                    .await;
            }
        }
        state
            .devices
            .insert(Device {
                id: "ungrouped-0".to_string(),
                tenant_id: tenant.clone(),
                group: None,
            })
            .await;

        let app = create_router(state.clone());
        Self { app, state }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(subject) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", subject));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Create a role as the admin and assert it was accepted.
    async fn create_role(&self, name: &str, permissions: Value) {
        let (status, _) = self
            .request(
                Method::POST,
                "/api/management/v1/roles",
                Some(ADMIN),
                Some(json!({"name": name, "permissions": permissions})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    /// Create a user as the admin, returning the generated user id.
    async fn create_user(&self, email: &str, roles: &[&str]) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/management/v1/users",
                Some(ADMIN),
                Some(json!({"email": email, "roles": roles})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    fn deployment_body(devices: &[&str]) -> Value {
        json!({
            "name": "rollout",
            "artifact_name": "fleet-image-1.0",
            "devices": devices,
        })
    }
}

fn group_permission(action: &str, group: &str) -> Value {
    json!({"action": action, "object": {"type": "DEVICE_GROUP", "value": group}})
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn requests_without_credentials_are_rejected() {
    let h = TestHarness::new().await;

    let (status, _) = h
        .request(Method::GET, "/api/management/v1/devices", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .request(
            Method::GET,
            "/api/management/v1/devices",
            Some("nobody"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let h = TestHarness::new().await;

    let (status, body) = h.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

// ============================================================================
// Role management
// ============================================================================

#[tokio::test]
async fn admin_creates_role_non_admin_cannot() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;

    // A user holding only the group-scoped role may not manage roles.
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/roles",
            Some(&user),
            Some(json!({
                "name": "escalation",
                "permissions": [group_permission("MANAGE_ROLES", "*")],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_roles_are_rejected_with_400() {
    let h = TestHarness::new().await;

    // Wildcard in the action position is not a valid permission.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/roles",
            Some(ADMIN),
            Some(json!({
                "name": "broken",
                "permissions": [group_permission("*", "test")],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Empty scope value.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/roles",
            Some(ADMIN),
            Some(json!({
                "name": "broken",
                "permissions": [group_permission("CREATE_DEPLOYMENT", "")],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Rejected roles must not become assignable.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/users",
            Some(ADMIN),
            Some(json!({"email": "x@example.com", "roles": ["broken"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_role_denies_instead_of_granting() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["test-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = h
        .request(
            Method::DELETE,
            "/api/management/v1/roles/deploy-test",
            Some(ADMIN),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The dangling assignment is stale, not a grant.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["test-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// ============================================================================
// Deployments
// ============================================================================

#[tokio::test]
async fn deployment_inside_permitted_group_succeeds() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;

    let (status, body) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&[
                "test-0", "test-1", "test-2", "test-3", "test-4",
            ])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["device_count"], 5);
}

#[tokio::test]
async fn deployment_outside_permitted_group_is_405() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["production-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn deployment_spanning_groups_needs_one_covering_grant() {
    let h = TestHarness::new().await;

    // Separate grants per group do not combine for a single batch.
    h.create_role(
        "deploy-two-groups",
        json!([
            group_permission("CREATE_DEPLOYMENT", "test"),
            group_permission("CREATE_DEPLOYMENT", "staging"),
        ]),
    )
    .await;
    let user = h
        .create_user("dev@example.com", &["deploy-two-groups"])
        .await;

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["test-0", "staging-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    // Each group on its own is fine.
    for device in ["test-0", "staging-0"] {
        let (status, _) = h
            .request(
                Method::POST,
                "/api/management/v1/deployments",
                Some(&user),
                Some(TestHarness::deployment_body(&[device])),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // The admin's wildcard covers the whole batch at once.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(ADMIN),
            Some(TestHarness::deployment_body(&["test-0", "staging-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn deployment_naming_unknown_device_is_405() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["test-0", "ghost"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn regrouped_device_is_covered_on_the_next_decision() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["staging-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = h
        .request(
            Method::PUT,
            "/api/management/v1/devices/staging-0/group",
            Some(ADMIN),
            Some(json!({"group": "test"})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["staging-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

// ============================================================================
// Device visibility
// ============================================================================

#[tokio::test]
async fn device_list_is_filtered_per_caller() {
    let h = TestHarness::new().await;

    h.create_role("view-test", json!([group_permission("VIEW_DEVICE", "test")]))
        .await;
    let scoped = h.create_user("viewer@example.com", &["view-test"]).await;
    let unprivileged = h.create_user("nobody@example.com", &[]).await;

    let (status, body) = h
        .request(
            Method::GET,
            "/api/management/v1/devices",
            Some(&scoped),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let devices = body.as_array().unwrap();
    assert_eq!(devices.len(), 5);
    assert!(devices.iter().all(|d| d["group"] == "test"));

    // No grants: empty list, not an error.
    let (status, body) = h
        .request(
            Method::GET,
            "/api/management/v1/devices",
            Some(&unprivileged),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    // The admin's wildcard reaches every device, grouped or not.
    let (status, body) = h
        .request(Method::GET, "/api/management/v1/devices", Some(ADMIN), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 56);
}

#[tokio::test]
async fn unknown_device_is_hidden_from_scoped_callers() {
    let h = TestHarness::new().await;

    h.create_role(
        "configure-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["configure-test"]).await;

    // Scoped caller: denied and nonexistent look identical.
    let (status, _) = h
        .request(
            Method::PUT,
            "/api/management/v1/device-configurations/ghost",
            Some(&user),
            Some(json!({"timezone": "UTC"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Wildcard caller would see everything anyway, so gets an honest 404.
    let (status, _) = h
        .request(
            Method::PUT,
            "/api/management/v1/device-configurations/ghost",
            Some(ADMIN),
            Some(json!({"timezone": "UTC"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Device configurations
// ============================================================================

#[tokio::test]
async fn configuration_lifecycle_inside_scope() {
    let h = TestHarness::new().await;

    h.create_role(
        "configure-test",
        json!([
            group_permission("CREATE_DEPLOYMENT", "test"),
            group_permission("VIEW_DEVICE", "test"),
        ]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["configure-test"]).await;

    let (status, _) = h
        .request(
            Method::PUT,
            "/api/management/v1/device-configurations/test-0",
            Some(&user),
            Some(json!({"timezone": "UTC", "poll_interval": 30})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = h
        .request(
            Method::POST,
            "/api/management/v1/device-configurations/test-0/deploy",
            Some(&user),
            Some(json!({"retries": 1})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["deployment_id"].as_str().is_some());

    let (status, body) = h
        .request(
            Method::GET,
            "/api/management/v1/device-configurations/test-0",
            Some(&user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configuration"]["timezone"], "UTC");
}

#[tokio::test]
async fn configuration_outside_scope_is_403() {
    let h = TestHarness::new().await;

    h.create_role(
        "configure-test",
        json!([
            group_permission("CREATE_DEPLOYMENT", "test"),
            group_permission("VIEW_DEVICE", "test"),
        ]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["configure-test"]).await;

    // Seed a configuration for a production device as the admin.
    let (status, _) = h
        .request(
            Method::PUT,
            "/api/management/v1/device-configurations/production-0",
            Some(ADMIN),
            Some(json!({"timezone": "UTC"})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h
        .request(
            Method::PUT,
            "/api/management/v1/device-configurations/production-0",
            Some(&user),
            Some(json!({"timezone": "CET"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/device-configurations/production-0/deploy",
            Some(&user),
            Some(json!({"retries": 0})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h
        .request(
            Method::GET,
            "/api/management/v1/device-configurations/production-0",
            Some(&user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// User management
// ============================================================================

#[tokio::test]
async fn role_reassignment_applies_on_the_next_request() {
    let h = TestHarness::new().await;

    h.create_role(
        "deploy-test",
        json!([group_permission("CREATE_DEPLOYMENT", "test")]),
    )
    .await;
    h.create_role(
        "deploy-staging",
        json!([group_permission("CREATE_DEPLOYMENT", "staging")]),
    )
    .await;
    let user = h.create_user("dev@example.com", &["deploy-test"]).await;

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["staging-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = h
        .request(
            Method::PUT,
            &format!("/api/management/v1/users/{}", user),
            Some(ADMIN),
            Some(json!({"roles": ["deploy-staging"]})),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["staging-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // The old grant is gone.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(&user),
            Some(TestHarness::deployment_body(&["test-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn tenant_isolation_hides_foreign_devices() {
    let h = TestHarness::new().await;

    // A device under another tenant, same id shape.
    h.state
        .devices
        .insert(Device {
            id: "other-0".to_string(),
            tenant_id: TenantId::new("other-org"),
            group: Some("test".to_string()),
        })
        .await;

    let (status, body) = h
        .request(Method::GET, "/api/management/v1/devices", Some(ADMIN), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["id"] != "other-0"));

    // Even the admin's wildcard stops at the tenant boundary.
    let (status, _) = h
        .request(
            Method::POST,
            "/api/management/v1/deployments",
            Some(ADMIN),
            Some(TestHarness::deployment_body(&["other-0"])),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
