//! Interception binding
//!
//! Attaches the decision pipeline in front of every operation of every
//! protected model and routes every role write through the ACL synchronizer.
//! Hosts call [`AuthorizationBinding::before_operation`] from their own
//! request lifecycle; `Ok(_)` means continue, `Err(HookError)` means fail
//! the call with the carried status.

use crate::config::AuthorizationConfig;
use crate::engine::{AuthRequest, Decision, DecisionEngine, Target};
use crate::error::{AuthzError, Result};
use crate::registry::ModelRegistry;
use crate::repository::RoleRepository;
use crate::resolver::RoleResolver;
use crate::store::{PrincipalStore, ResourceStore, RoleStore};
use crate::sync::AclSynchronizer;
use crate::types::{Operation, PrincipalId, Resource, ResourceId};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Persistence collaborators the binding reads and writes through
#[derive(Clone)]
pub struct Collaborators {
    pub principals: Arc<dyn PrincipalStore>,
    pub resources: Arc<dyn ResourceStore>,
    pub roles: Arc<dyn RoleStore>,
}

impl Collaborators {
    /// Use one backend for principals, resources and roles
    pub fn from_directory<D>(directory: Arc<D>) -> Self
    where
        D: PrincipalStore + ResourceStore + RoleStore + 'static,
    {
        Self {
            principals: directory.clone(),
            resources: directory.clone(),
            roles: directory,
        }
    }
}

/// Association between a protected model and the role model
///
/// A resource has many scoped roles (`relation_name`); each scoped role
/// belongs to one resource through `foreign_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedRoleRelation {
    pub model: String,
    pub role_model: String,
    pub relation_name: String,
    pub foreign_key: String,
}

impl ScopedRoleRelation {
    pub fn new(model: &str, role_model: &str) -> Self {
        Self {
            model: model.to_string(),
            role_model: role_model.to_string(),
            relation_name: format!("{}s", role_model),
            foreign_key: format!("{}Id", model),
        }
    }
}

/// State of one intercepted call, as seen by the hook
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Principal id behind the session token
    pub principal: Option<PrincipalId>,

    /// Dotted operation name, e.g. `Post.prototype.updateAttributes`
    pub method_string: String,

    /// Instance already loaded by the host
    pub instance: Option<Resource>,

    /// Raw `id` argument of the call
    pub id: Option<ResourceId>,

    /// Response status set by the hook on denial
    pub response_status: Option<u16>,
}

impl OperationContext {
    pub fn new(method_string: impl Into<String>) -> Self {
        Self {
            method_string: method_string.into(),
            ..Default::default()
        }
    }

    pub fn with_principal(mut self, principal: impl Into<PrincipalId>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn with_instance(mut self, instance: Resource) -> Self {
        self.instance = Some(instance);
        self
    }

    pub fn with_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Build the pipeline request; a loaded instance wins over the id
    pub fn to_request(&self) -> AuthRequest {
        let target = match (&self.instance, &self.id) {
            (Some(instance), _) => Target::Instance(instance.clone()),
            (None, Some(id)) => Target::Id(id.clone()),
            (None, None) => Target::None,
        };

        AuthRequest {
            principal: self.principal.clone(),
            operation: self.method_string.clone(),
            target,
        }
    }
}

/// Error handed back to the host for a blocked call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    pub message: String,
    pub status: u16,
}

/// Pre-operation hook of one protected model
#[derive(Clone)]
pub struct ModelGuard {
    engine: DecisionEngine,
}

impl ModelGuard {
    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Decide the call in `ctx`, recording the status on denial
    pub async fn before_operation(&self, ctx: &mut OperationContext) -> std::result::Result<Decision, HookError> {
        let decision = self.engine.decide(&ctx.to_request()).await;

        match decision.status() {
            Some(status) => {
                ctx.response_status = Some(status);
                Err(HookError {
                    message: decision.message(),
                    status,
                })
            }
            None => Ok(decision),
        }
    }
}

/// Guards for every protected model plus the shared role save path
pub struct AuthorizationBinding {
    config: Arc<AuthorizationConfig>,
    registry: Arc<ModelRegistry>,
    roles: RoleRepository,
    guards: HashMap<String, ModelGuard>,
    relations: Vec<ScopedRoleRelation>,
}

impl AuthorizationBinding {
    /// Attach guards to every protected model of the registry
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the registry
    /// declares no protected model.
    pub fn attach(
        config: AuthorizationConfig,
        registry: Arc<ModelRegistry>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;

        if registry.protected_models().next().is_none() {
            return Err(AuthzError::InvalidRegistry(
                "No protected model to attach to".to_string(),
            ));
        }

        let config = Arc::new(config);
        let synchronizer = AclSynchronizer::new(registry.clone(), config.admin_role_name.clone());
        let roles = RoleRepository::new(collaborators.roles.clone(), synchronizer);
        let resolver = RoleResolver::new(collaborators.principals.clone(), collaborators.resources.clone());

        let mut guards = HashMap::new();
        let mut relations = Vec::new();

        for model in registry.protected_models() {
            let relation = ScopedRoleRelation::new(model.name(), &config.role_model_name);
            debug!(
                model = %model.name(),
                relation = %relation.relation_name,
                foreign_key = %relation.foreign_key,
                "Declared scoped role relation"
            );
            relations.push(relation);

            let engine = DecisionEngine::new(model.name(), config.clone(), resolver.clone(), roles.clone());
            guards.insert(model.name().to_string(), ModelGuard { engine });
        }

        info!(
            models = guards.len(),
            user_model = %config.user_model_name,
            role_model = %config.role_model_name,
            data_source = %config.data_sources_name,
            guest_access = config.guest_access,
            "Authorization attached"
        );

        Ok(Self {
            config,
            registry,
            roles,
            guards,
            relations,
        })
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Role save path with the ACL pre-save hook
    pub fn roles(&self) -> &RoleRepository {
        &self.roles
    }

    pub fn guard(&self, model: &str) -> Option<&ModelGuard> {
        self.guards.get(model)
    }

    pub fn relations(&self) -> &[ScopedRoleRelation] {
        &self.relations
    }

    /// Whether calls of `method_string` are intercepted
    pub fn intercepts(&self, method_string: &str) -> bool {
        Operation::parse(method_string)
            .map(|op| self.guards.contains_key(&op.model))
            .unwrap_or(false)
    }

    /// Hook for any intercepted call, dispatched by the operation's model
    ///
    /// Calls on models that are not protected continue untouched.
    pub async fn before_operation(&self, ctx: &mut OperationContext) -> std::result::Result<Option<Decision>, HookError> {
        let guard = Operation::parse(&ctx.method_string)
            .ok()
            .and_then(|op| self.guards.get(&op.model));

        match guard {
            Some(guard) => guard.before_operation(ctx).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;

    fn registry() -> Arc<ModelRegistry> {
        Arc::new(
            ModelRegistry::builder()
                .protected("Post", ["find", "prototype.update"])
                .unprotected("Tag", ["find"])
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_relation_naming() {
        let relation = ScopedRoleRelation::new("Post", "role");
        assert_eq!(relation.relation_name, "roles");
        assert_eq!(relation.foreign_key, "PostId");
    }

    #[test]
    fn test_context_prefers_instance_over_id() {
        let ctx = OperationContext::new("Post.prototype.update")
            .with_principal("u1")
            .with_instance(Resource::new("Post", "p1"))
            .with_id("p2");

        let request = ctx.to_request();
        assert_eq!(request.target, Target::Instance(Resource::new("Post", "p1")));

        let by_id = OperationContext::new("Post.prototype.update").with_id("p2").to_request();
        assert_eq!(by_id.target, Target::Id("p2".to_string()));
    }

    #[test]
    fn test_attach_only_protected_models() {
        let directory = Arc::new(InMemoryDirectory::new());
        let binding = AuthorizationBinding::attach(
            AuthorizationConfig::default(),
            registry(),
            Collaborators::from_directory(directory),
        )
        .unwrap();

        assert!(binding.guard("Post").is_some());
        assert!(binding.guard("Tag").is_none());
        assert!(binding.intercepts("Post.find"));
        assert!(!binding.intercepts("Tag.find"));
        assert_eq!(binding.relations(), &[ScopedRoleRelation::new("Post", "role")]);
    }

    #[test]
    fn test_attach_keeps_informational_names() {
        let config = AuthorizationConfig {
            user_model_name: "account".to_string(),
            data_sources_name: "mongo".to_string(),
            ..Default::default()
        };
        let directory = Arc::new(InMemoryDirectory::new());
        let binding =
            AuthorizationBinding::attach(config, registry(), Collaborators::from_directory(directory)).unwrap();

        assert_eq!(binding.config().user_model_name, "account");
        assert_eq!(binding.config().data_sources_name, "mongo");
        assert!(binding.guard("Post").is_some());
    }

    #[test]
    fn test_attach_requires_protected_model() {
        let registry = Arc::new(ModelRegistry::builder().unprotected("Tag", ["find"]).build().unwrap());
        let directory = Arc::new(InMemoryDirectory::new());

        let result = AuthorizationBinding::attach(
            AuthorizationConfig::default(),
            registry,
            Collaborators::from_directory(directory),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unprotected_calls_pass_through() {
        let directory = Arc::new(InMemoryDirectory::new());
        let binding = AuthorizationBinding::attach(
            AuthorizationConfig::default(),
            registry(),
            Collaborators::from_directory(directory),
        )
        .unwrap();

        let mut ctx = OperationContext::new("Tag.find");
        assert_eq!(binding.before_operation(&mut ctx).await, Ok(None));
        assert_eq!(ctx.response_status, None);
    }

    #[tokio::test]
    async fn test_denial_sets_response_status() {
        let directory = Arc::new(InMemoryDirectory::new());
        let binding = AuthorizationBinding::attach(
            AuthorizationConfig::default(),
            registry(),
            Collaborators::from_directory(directory),
        )
        .unwrap();

        let mut ctx = OperationContext::new("Post.find");
        let err = binding.before_operation(&mut ctx).await.unwrap_err();

        assert_eq!(err.status, 401);
        assert_eq!(err.message, "User not logged in.");
        assert_eq!(ctx.response_status, Some(401));
    }
}
