//! Persistence collaborator interfaces
//!
//! The engine never owns principals, roles or resources; it reads and writes
//! them through these traits. Every call is a suspension point and is made
//! fresh per request, with no caching on this side.

use crate::error::Result;
use crate::types::{Principal, Resource, Role};
use async_trait::async_trait;

/// Principal lookup
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Find a principal by id
    async fn find_principal(&self, id: &str) -> Result<Option<Principal>>;

    /// Roles assigned to a principal
    async fn principal_roles(&self, principal: &Principal) -> Result<Vec<Role>>;
}

/// Resource instance lookup
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Find an instance of `model` by id
    async fn find_resource(&self, model: &str, id: &str) -> Result<Option<Resource>>;

    /// Roles scoped to an instance, in enumeration order
    async fn resource_roles(&self, resource: &Resource) -> Result<Vec<Role>>;
}

/// Role record persistence
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Get a role by id
    async fn find_role(&self, id: &str) -> Result<Option<Role>>;

    /// Find a role by its unique name
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Persist a role record, inserting or replacing by id
    async fn save_role(&self, role: Role) -> Result<Role>;

    /// List every role record
    async fn list_roles(&self) -> Result<Vec<Role>>;
}
