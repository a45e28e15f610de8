//! Authorization request and decision types

use crate::types::{PrincipalId, Resource, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status carried by every blocking denial of the pipeline
pub const UNAUTHORIZED: u16 = 401;

/// Target of an intercepted call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Instance already loaded by the hosting framework
    Instance(Resource),

    /// Raw id argument of the call
    Id(ResourceId),

    /// Call without an addressable instance (e.g. `create`, `find`)
    #[default]
    None,
}

/// One intercepted call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Principal behind the session token, if any
    #[serde(default)]
    pub principal: Option<PrincipalId>,

    /// Dotted operation name, e.g. `Post.update`
    pub operation: String,

    /// Instance the operation applies to
    #[serde(default)]
    pub target: Target,
}

impl AuthRequest {
    /// Anonymous request without a target
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            principal: None,
            operation: operation.into(),
            target: Target::None,
        }
    }

    pub fn with_principal(mut self, principal: impl Into<PrincipalId>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn on_instance(mut self, resource: Resource) -> Self {
        self.target = Target::Instance(resource);
        self
    }

    pub fn on_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.target = Target::Id(id.into());
        self
    }
}

/// Why a call was allowed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowReason {
    /// Principal holds the admin role
    AdminBypass { role: String },

    /// Matched role grants the operation
    Granted { role: String, operation: String },
}

impl fmt::Display for AllowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdminBypass { role } => write!(f, "Principal holds the {} role.", role),
            Self::Granted { role, operation } => {
                write!(f, "{} has the permission of {}.", role, operation)
            }
        }
    }
}

/// Conditions that let a call proceed without a granted role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftDenial {
    /// No principal behind the request (guest access only)
    NotLoggedIn,

    /// No instance to scope a role to
    NoModelInstance,

    /// Principal shares no role with the instance (guest access only)
    NoMatchedRoles,

    /// Unexpected failure swallowed because `failOpen` is set
    LookupFailed { error: String },
}

impl fmt::Display for SoftDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => f.write_str("User not logged in."),
            Self::NoModelInstance => f.write_str("No model instance."),
            Self::NoMatchedRoles => f.write_str("No matched roles."),
            Self::LookupFailed { error } => write!(f, "Authorization lookup failed: {}", error),
        }
    }
}

/// Why a call was blocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NotLoggedIn,
    NoMatchedRoles,
    PermissionDenied { role: String, operation: String },
    /// Unexpected failure while deciding
    Failure { error: String, status: u16 },
}

impl DenyReason {
    pub fn status(&self) -> u16 {
        match self {
            Self::Failure { status, .. } => *status,
            _ => UNAUTHORIZED,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => f.write_str("User not logged in."),
            Self::NoMatchedRoles => f.write_str("No matched roles."),
            Self::PermissionDenied { role, operation } => {
                write!(f, "\"{}\" cannot access \"{}\".", role, operation)
            }
            Self::Failure { error, .. } => f.write_str(error),
        }
    }
}

/// Terminal outcome of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Call continues, authorized
    Allow(AllowReason),

    /// Call continues without a granted role
    Proceed(SoftDenial),

    /// Call is blocked
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Whether the call must be blocked
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// Status to report for a blocked call
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Deny(reason) => Some(reason.status()),
            _ => None,
        }
    }

    /// Human-readable explanation
    pub fn message(&self) -> String {
        match self {
            Self::Allow(reason) => reason.to_string(),
            Self::Proceed(reason) => reason.to_string(),
            Self::Deny(reason) => reason.to_string(),
        }
    }

    /// Short label: `allow`, `proceed` or `deny`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Allow(_) => "allow",
            Self::Proceed(_) => "proceed",
            Self::Deny(_) => "deny",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message_names_role_and_operation() {
        let decision = Decision::Deny(DenyReason::PermissionDenied {
            role: "editor".to_string(),
            operation: "Post.update".to_string(),
        });

        assert!(decision.is_blocking());
        assert_eq!(decision.status(), Some(401));
        assert_eq!(decision.message(), "\"editor\" cannot access \"Post.update\".");
        assert_eq!(decision.kind(), "deny");
    }

    #[test]
    fn test_non_blocking_outcomes_carry_no_status() {
        let allow = Decision::Allow(AllowReason::Granted {
            role: "editor".to_string(),
            operation: "Post.update".to_string(),
        });
        assert!(allow.is_allowed());
        assert_eq!(allow.status(), None);
        assert_eq!(allow.message(), "editor has the permission of Post.update.");

        let proceed = Decision::Proceed(SoftDenial::NoModelInstance);
        assert!(!proceed.is_allowed());
        assert!(!proceed.is_blocking());
        assert_eq!(proceed.status(), None);
    }

    #[test]
    fn test_failure_status() {
        let decision = Decision::Deny(DenyReason::Failure {
            error: "Store error: timeout".to_string(),
            status: 500,
        });
        assert_eq!(decision.status(), Some(500));
        assert_eq!(decision.message(), "Store error: timeout");
    }

    #[test]
    fn test_request_builders() {
        let request = AuthRequest::new("Post.update").with_principal("u1").on_id("p1");
        assert_eq!(request.principal.as_deref(), Some("u1"));
        assert_eq!(request.target, Target::Id("p1".to_string()));

        let anonymous = AuthRequest::new("Post.find");
        assert_eq!(anonymous.target, Target::None);
    }
}
