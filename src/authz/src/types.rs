//! Core authorization types

use crate::acl::Acl;
use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique principal identifier
pub type PrincipalId = String;

/// Unique role identifier
pub type RoleId = String;

/// Unique resource instance identifier
pub type ResourceId = String;

/// Replace every `.` of a dotted operation name with `_` to form its ACL key
pub fn normalize_operation(string_name: &str) -> String {
    string_name.replace('.', "_")
}

/// Principal (the authenticated identity behind a request)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Principal identifier
    pub id: PrincipalId,

    /// Assigned roles (order is irrelevant)
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl Principal {
    /// Create a principal without roles
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            role_ids: Vec::new(),
        }
    }

    /// Assign a role to the principal
    pub fn with_role(mut self, role_id: impl Into<RoleId>) -> Self {
        self.role_ids.push(role_id.into());
        self
    }
}

/// Role record carrying an ACL map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier
    pub id: RoleId,

    /// Role name, unique within the system
    pub name: String,

    /// Operation grants plus the schema fingerprint
    #[serde(default)]
    pub acl: Acl,
}

impl Role {
    /// Create a role with an empty ACL
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            acl: Acl::default(),
        }
    }

    /// Replace the ACL map
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = acl;
        self
    }
}

/// Instance of a protected model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Model (type) name, e.g. "Post"
    pub model: String,

    /// Instance identifier
    pub id: ResourceId,

    /// Roles scoped to this instance, in enumeration order
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

impl Resource {
    /// Create a resource instance without scoped roles
    pub fn new(model: impl Into<String>, id: impl Into<ResourceId>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
            role_ids: Vec::new(),
        }
    }

    /// Scope a role to this instance
    pub fn with_role(mut self, role_id: impl Into<RoleId>) -> Self {
        self.role_ids.push(role_id.into());
        self
    }
}

/// Operation descriptor: a (model, method) pair
///
/// The method part may itself be dotted (`prototype.update`), so the
/// descriptor splits a string name at its first `.` only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Model the operation is exposed on
    pub model: String,

    /// Method name relative to the model
    pub method: String,
}

impl Operation {
    /// Create an operation descriptor
    pub fn new(model: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            method: method.into(),
        }
    }

    /// Parse a dotted string name such as `Post.prototype.update`
    pub fn parse(string_name: &str) -> Result<Self> {
        match string_name.split_once('.') {
            Some((model, method)) if !model.is_empty() && !method.is_empty() => {
                Ok(Self::new(model, method))
            }
            _ => Err(AuthzError::InvalidInput(format!(
                "Operation '{}' is not of the form Model.method",
                string_name
            ))),
        }
    }

    /// Dotted string name, e.g. `Post.update`
    pub fn string_name(&self) -> String {
        format!("{}.{}", self.model, self.method)
    }

    /// Normalized ACL key, e.g. `Post_update`
    pub fn acl_key(&self) -> String {
        normalize_operation(&self.string_name())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.model, self.method)
    }
}
