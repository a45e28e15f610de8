//! In-memory directory implementing every collaborator trait
//!
//! Backs tests, benchmarks and the standalone decision server. Writes through
//! [`RoleStore::save_role`] are counted per role so callers can observe
//! touches and migrations.

use crate::error::Result;
use crate::store::{PrincipalStore, ResourceStore, RoleStore};
use crate::types::{Principal, PrincipalId, Resource, ResourceId, Role, RoleId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Initial directory contents, usually read from a JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub principals: Vec<Principal>,

    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl DirectorySeed {
    /// Read a seed from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Principals, roles and resources held in memory
#[derive(Default)]
pub struct InMemoryDirectory {
    principals: Arc<RwLock<HashMap<PrincipalId, Principal>>>,
    roles: Arc<RwLock<BTreeMap<RoleId, Role>>>,
    resources: Arc<RwLock<HashMap<(String, ResourceId), Resource>>>,
    save_counts: Arc<RwLock<HashMap<RoleId, usize>>>,
}

impl InMemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory holding the seed's records as-is
    ///
    /// Roles are stored raw, without running any save hook.
    pub async fn from_seed(seed: DirectorySeed) -> Self {
        let directory = Self::new();
        for principal in seed.principals {
            directory.insert_principal(principal).await;
        }
        for role in seed.roles {
            directory.insert_role(role).await;
        }
        for resource in seed.resources {
            directory.insert_resource(resource).await;
        }
        directory
    }

    pub async fn insert_principal(&self, principal: Principal) {
        let mut principals = self.principals.write().await;
        principals.insert(principal.id.clone(), principal);
    }

    pub async fn insert_resource(&self, resource: Resource) {
        let mut resources = self.resources.write().await;
        resources.insert((resource.model.clone(), resource.id.clone()), resource);
    }

    /// Store a role record directly, without counting a save
    pub async fn insert_role(&self, role: Role) {
        let mut roles = self.roles.write().await;
        roles.insert(role.id.clone(), role);
    }

    /// `save_role` writes per role id
    pub async fn save_counts(&self) -> HashMap<RoleId, usize> {
        self.save_counts.read().await.clone()
    }

    /// Number of `save_role` writes for one role
    pub async fn save_count(&self, role_id: &str) -> usize {
        self.save_counts.read().await.get(role_id).copied().unwrap_or(0)
    }

    /// Number of `save_role` writes across every role
    pub async fn total_saves(&self) -> usize {
        self.save_counts.read().await.values().sum()
    }

    async fn roles_by_id(&self, ids: &[RoleId]) -> Vec<Role> {
        let roles = self.roles.read().await;
        ids.iter().filter_map(|id| roles.get(id).cloned()).collect()
    }
}

#[async_trait]
impl PrincipalStore for InMemoryDirectory {
    async fn find_principal(&self, id: &str) -> Result<Option<Principal>> {
        let principals = self.principals.read().await;
        Ok(principals.get(id).cloned())
    }

    async fn principal_roles(&self, principal: &Principal) -> Result<Vec<Role>> {
        Ok(self.roles_by_id(&principal.role_ids).await)
    }
}

#[async_trait]
impl ResourceStore for InMemoryDirectory {
    async fn find_resource(&self, model: &str, id: &str) -> Result<Option<Resource>> {
        let resources = self.resources.read().await;
        Ok(resources.get(&(model.to_string(), id.to_string())).cloned())
    }

    async fn resource_roles(&self, resource: &Resource) -> Result<Vec<Role>> {
        Ok(self.roles_by_id(&resource.role_ids).await)
    }
}

#[async_trait]
impl RoleStore for InMemoryDirectory {
    async fn find_role(&self, id: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.get(id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.values().find(|r| r.name == name).cloned())
    }

    async fn save_role(&self, role: Role) -> Result<Role> {
        {
            let mut roles = self.roles.write().await;
            roles.insert(role.id.clone(), role.clone());
        }
        *self.save_counts.write().await.entry(role.id.clone()).or_insert(0) += 1;
        Ok(role)
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.values().cloned().collect())
    }
}
