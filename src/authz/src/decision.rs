//! Authorization decision types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Action, ResourceId};

/// Outcome of an authorization check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Unique decision identifier
    pub id: String,

    /// Whether the request is allowed
    pub allowed: bool,

    /// Why the decision came out the way it did
    pub reason: DecisionReason,

    /// Decision timestamp
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    fn new(allowed: bool, reason: DecisionReason) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            allowed,
            reason,
            timestamp: Utc::now(),
        }
    }

    pub fn allow(reason: DecisionReason) -> Self {
        Self::new(true, reason)
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self::new(false, reason)
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Reason attached to a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionReason {
    /// A permission in the effective set covered the request
    PermissionMatch { role: String, action: Action },

    /// No permission in the effective set matched; the default deny
    NoMatchingPermission,

    /// A batch member fell outside the single permitted scope
    ScopeViolation { resource: ResourceId },

    /// The target's scope could not be resolved; never an implicit allow
    UnresolvedTarget { resource: ResourceId },

    /// The principal references a role that no longer exists
    StaleRoleReference { role: String },

    /// The target belongs to a different tenant than the principal
    TenantMismatch,
}
