//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// Policy outcomes are never errors; `authorize` returns a `Decision` for
/// every deny. Errors are reserved for malformed administrative input and
/// store faults.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed permission definition, rejected at role-creation time
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// Malformed role definition
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// A principal references a role that no longer exists
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Role store backend failure
    #[error("Role store error: {0}")]
    Store(String),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
