//! Role resolution for principals and resource instances

use crate::error::{AuthzError, Result};
use crate::store::{PrincipalStore, ResourceStore};
use crate::types::{Resource, Role};
use std::sync::Arc;
use tracing::debug;

/// A resource either already loaded or addressed by id
#[derive(Debug, Clone, Copy)]
pub enum ResourceRef<'a> {
    /// Instance loaded by the caller
    Instance(&'a Resource),

    /// Instance to be looked up
    Id { model: &'a str, id: &'a str },
}

/// Loads role sets through the persistence collaborators
///
/// Every call is a fresh read.
#[derive(Clone)]
pub struct RoleResolver {
    principals: Arc<dyn PrincipalStore>,
    resources: Arc<dyn ResourceStore>,
}

impl RoleResolver {
    pub fn new(principals: Arc<dyn PrincipalStore>, resources: Arc<dyn ResourceStore>) -> Self {
        Self { principals, resources }
    }

    /// Roles assigned to a principal
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::PrincipalNotFound`] if no principal has this id.
    pub async fn principal_roles(&self, principal_id: &str) -> Result<Vec<Role>> {
        let principal = self
            .principals
            .find_principal(principal_id)
            .await?
            .ok_or_else(|| AuthzError::PrincipalNotFound(principal_id.to_string()))?;

        let roles = self.principals.principal_roles(&principal).await?;
        debug!(principal = %principal_id, roles = roles.len(), "Loaded principal roles");
        Ok(roles)
    }

    /// Roles scoped to a resource instance, in enumeration order
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::ResourceNotFound`] if an id does not resolve.
    pub async fn resource_roles(&self, resource: ResourceRef<'_>) -> Result<Vec<Role>> {
        let roles = match resource {
            ResourceRef::Instance(instance) => self.resources.resource_roles(instance).await?,
            ResourceRef::Id { model, id } => {
                let instance = self
                    .resources
                    .find_resource(model, id)
                    .await?
                    .ok_or_else(|| AuthzError::ResourceNotFound {
                        model: model.to_string(),
                        id: id.to_string(),
                    })?;
                self.resources.resource_roles(&instance).await?
            }
        };

        debug!(roles = roles.len(), "Loaded resource roles");
        Ok(roles)
    }
}
