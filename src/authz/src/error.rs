//! Error types for the authorization engine

use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model registry rejected a declaration
    #[error("Invalid registry: {0}")]
    InvalidRegistry(String),

    /// Principal referenced by the request does not exist
    #[error("Principal not found: {0}")]
    PrincipalNotFound(String),

    /// Resource instance does not exist
    #[error("Resource not found: {model}#{id}")]
    ResourceNotFound { model: String, id: String },

    /// Role record does not exist
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Persistence collaborator failure
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// HTTP-equivalent status for a hard failure surfaced to the caller
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PrincipalNotFound(_) => 401,
            Self::ResourceNotFound { .. } => 404,
            Self::InvalidInput(_) => 400,
            _ => 500,
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthzError::PrincipalNotFound("u1".into()).status_code(), 401);
        assert_eq!(
            AuthzError::ResourceNotFound { model: "Post".into(), id: "7".into() }.status_code(),
            404
        );
        assert_eq!(AuthzError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(AuthzError::Store("timeout".into()).status_code(), 500);
    }

    #[test]
    fn test_resource_not_found_display() {
        let err = AuthzError::ResourceNotFound { model: "Post".into(), id: "42".into() };
        assert_eq!(err.to_string(), "Resource not found: Post#42");
    }
}
