//! Authorization configuration loading and validation
//!
//! Read once when the binding is attached. Field names follow the option
//! names hosts already use (`userModelName`, `guestAccess`, ...):
//!
//! ```toml
//! userModelName = "user"
//! roleModelName = "role"
//! adminRoleName = "admin"
//! dataSourcesName = "db"
//! guestAccess = false
//! ```

use crate::acl::ACL_HASH_KEY;
use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable overriding `guestAccess`
pub const ENV_GUEST_ACCESS: &str = "AUTHZ_GUEST_ACCESS";

/// Environment variable overriding `adminRoleName`
pub const ENV_ADMIN_ROLE: &str = "AUTHZ_ADMIN_ROLE";

/// Environment variable overriding `failOpen`
pub const ENV_FAIL_OPEN: &str = "AUTHZ_FAIL_OPEN";

/// Static authorization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizationConfig {
    /// Model holding principals
    ///
    /// Informational: principals are read through the `PrincipalStore` handed
    /// to the binding. Reported when the binding is attached.
    pub user_model_name: String,

    /// Model holding role records; names the scoped role relation
    pub role_model_name: String,

    /// Role name that bypasses every check
    pub admin_role_name: String,

    /// Data source the models are attached to
    ///
    /// Informational, like `user_model_name`: storage is chosen through
    /// `Collaborators`.
    pub data_sources_name: String,

    /// Let unauthenticated and unmatched requests fall through instead of failing
    pub guest_access: bool,

    /// Let unexpected lookup failures fall through instead of failing
    pub fail_open: bool,

    /// Re-save the matched role on every decision that reaches the ACL lookup
    pub touch_matched_role: bool,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            user_model_name: "user".to_string(),
            role_model_name: "role".to_string(),
            admin_role_name: "admin".to_string(),
            data_sources_name: "db".to_string(),
            guest_access: false,
            fail_open: false,
            touch_matched_role: true,
        }
    }
}

impl AuthorizationConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| AuthzError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AuthzError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        debug!("Loaded authorization config from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Apply `AUTHZ_*` environment overrides
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_GUEST_ACCESS) {
            self.guest_access = parse_flag(ENV_GUEST_ACCESS, &value)?;
        }
        if let Some(value) = lookup(ENV_FAIL_OPEN) {
            self.fail_open = parse_flag(ENV_FAIL_OPEN, &value)?;
        }
        if let Some(value) = lookup(ENV_ADMIN_ROLE) {
            self.admin_role_name = value;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("userModelName", &self.user_model_name),
            ("roleModelName", &self.role_model_name),
            ("adminRoleName", &self.admin_role_name),
            ("dataSourcesName", &self.data_sources_name),
        ];

        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(AuthzError::Config(format!("{} cannot be empty", field)));
            }
        }

        if self.admin_role_name == ACL_HASH_KEY {
            return Err(AuthzError::Config(format!(
                "adminRoleName cannot be the reserved key '{}'",
                ACL_HASH_KEY
            )));
        }

        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthzError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
