//! Middleware layer for the API server
//!
//! This module provides middleware components for:
//! - Principal resolution from the Authorization header
//! - Request logging and tracing
//! - CORS configuration
//! - Request ID tracking

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use fleetgate_authz::Principal;

use crate::{error::ApiError, state::AppState};

/// Request ID header name
pub const X_REQUEST_ID: &str = "x-request-id";

/// Configure CORS middleware
///
/// This allows cross-origin requests from any origin with common HTTP methods.
/// In production, you should restrict allowed origins to known domains.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(X_REQUEST_ID),
        ])
        .expose_headers([HeaderName::from_static(X_REQUEST_ID)])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Request ID middleware
///
/// Generates or extracts a unique request ID for tracking requests through
/// the system. The request ID is added to all log messages and returned in
/// the response headers.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    response.headers_mut().insert(
        X_REQUEST_ID,
        HeaderValue::from_str(&request_id.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("invalid-uuid")),
    );

    response
}

/// Request logging middleware
///
/// Logs all incoming requests with method, URI, and response status.
/// Includes request ID for correlation.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<Uuid>()
        .copied()
        .unwrap_or_else(Uuid::new_v4);

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Incoming request"
    );

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status();
    match status.as_u16() {
        500..=599 => error!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = elapsed.as_millis() as u64,
            "Request completed"
        ),
        400..=499 => warn!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = elapsed.as_millis() as u64,
            "Request completed"
        ),
        _ => info!(
            request_id = %request_id,
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            duration_ms = elapsed.as_millis() as u64,
            "Request completed"
        ),
    }

    response
}

/// Identity middleware
///
/// Resolves the caller from `Authorization: Bearer <user-id>` and attaches
/// the resulting [`Principal`] (identity, tenant, role names) to the request
/// extensions. Role names are resolved to permissions later, per decision,
/// so a role edited after login is picked up on the next request.
///
/// Token verification is delegated to the identity provider upstream of this
/// gateway; here the bearer token has already been reduced to a user id.
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if path == "/health" || path.starts_with("/api-docs") {
        return Ok(next.run(request).await);
    }

    let request_id = request
        .extensions()
        .get::<Uuid>()
        .copied()
        .unwrap_or_else(Uuid::new_v4);

    let subject = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match subject {
        Some(id) if !id.is_empty() => match state.users.find(id).await {
            Some(user) => {
                let principal = Principal::new(user.id, user.tenant_id).with_roles(user.roles);
                request.extensions_mut().insert(principal);
                Ok(next.run(request).await)
            }
            None => {
                warn!(
                    request_id = %request_id,
                    subject = %id,
                    "Unknown principal"
                );
                Err(ApiError::Unauthorized("unknown principal".to_string()))
            }
        },
        _ => {
            warn!(
                request_id = %request_id,
                path = %path,
                "Missing credentials"
            );
            Err(ApiError::Unauthorized("missing credentials".to_string()))
        }
    }
}
