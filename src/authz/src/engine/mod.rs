//! Decision pipeline
//!
//! Runs one intercepted call through sequential stages, each of which either
//! continues with a value or ends the pipeline with a [`Decision`]:
//!
//! ```text
//! login → principal roles → admin bypass → resource roles → role match → touch → ACL lookup
//!   ↓            ↓               ↓               ↓              ↓                    ↓
//! Deny/Proceed  error          Allow          Proceed       Deny/Proceed        Allow/Deny
//! ```
//!
//! Only the three soft conditions (not logged in, no model instance, no
//! matched roles) let a call through without a grant. Any other failure is a
//! hard denial unless `failOpen` is configured.

pub mod decision;

pub use decision::{
    AllowReason, AuthRequest, Decision, DenyReason, SoftDenial, Target, UNAUTHORIZED,
};

use crate::config::AuthorizationConfig;
use crate::error::{AuthzError, Result};
use crate::repository::RoleRepository;
use crate::resolver::{ResourceRef, RoleResolver};
use crate::types::{normalize_operation, Operation, Role};

use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Unwrap a stage result, returning its decision when it ends the pipeline
macro_rules! stage {
    ($flow:expr) => {
        match $flow {
            ControlFlow::Continue(value) => value,
            ControlFlow::Break(decision) => return Ok(decision),
        }
    };
}

/// Decides calls on one protected model
#[derive(Clone)]
pub struct DecisionEngine {
    model: String,
    config: Arc<AuthorizationConfig>,
    resolver: RoleResolver,
    roles: RoleRepository,
}

impl DecisionEngine {
    pub fn new(
        model: impl Into<String>,
        config: Arc<AuthorizationConfig>,
        resolver: RoleResolver,
        roles: RoleRepository,
    ) -> Self {
        Self {
            model: model.into(),
            config,
            resolver,
            roles,
        }
    }

    /// Protected model this engine guards
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// Role save path, shared with the binding
    pub fn roles(&self) -> &RoleRepository {
        &self.roles
    }

    /// Decide a call
    ///
    /// Never fails: unexpected errors become a blocking [`DenyReason::Failure`]
    /// carrying the error's status, or a [`SoftDenial::LookupFailed`] when
    /// `failOpen` is set.
    pub async fn decide(&self, request: &AuthRequest) -> Decision {
        let decision = match self.evaluate(request).await {
            Ok(decision) => decision,
            Err(e) if self.config.fail_open => {
                warn!(operation = %request.operation, "Authorization failed open: {}", e);
                Decision::Proceed(SoftDenial::LookupFailed { error: e.to_string() })
            }
            Err(e) => {
                warn!(operation = %request.operation, "Authorization failed: {}", e);
                Decision::Deny(DenyReason::Failure {
                    status: e.status_code(),
                    error: e.to_string(),
                })
            }
        };

        info!(
            principal = request.principal.as_deref().unwrap_or("-"),
            operation = %request.operation,
            decision = decision.kind(),
            "{}",
            decision.message()
        );

        decision
    }

    /// Run the pipeline, surfacing unexpected failures as errors
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::InvalidInput`] when the operation does not belong
    /// to this engine's model, or any collaborator error.
    pub async fn evaluate(&self, request: &AuthRequest) -> Result<Decision> {
        let operation = Operation::parse(&request.operation)?;
        if operation.model != self.model {
            return Err(AuthzError::InvalidInput(format!(
                "Operation '{}' is not exposed by model '{}'",
                request.operation, self.model
            )));
        }

        let principal_id = stage!(self.check_login(request));

        let principal_roles = self.resolver.principal_roles(principal_id).await?;
        stage!(self.admin_bypass(&principal_roles));

        let resource = stage!(self.resource_ref(request));
        let resource_roles = self.resolver.resource_roles(resource).await?;

        let matched = stage!(self.match_role(&principal_roles, &resource_roles));
        let matched = self.touch(matched).await;

        Ok(self.check_permission(&matched, &request.operation))
    }

    fn check_login<'r>(&self, request: &'r AuthRequest) -> ControlFlow<Decision, &'r str> {
        match request.principal.as_deref() {
            Some(id) => ControlFlow::Continue(id),
            None => ControlFlow::Break(self.refuse(SoftDenial::NotLoggedIn, DenyReason::NotLoggedIn)),
        }
    }

    fn admin_bypass(&self, roles: &[Role]) -> ControlFlow<Decision> {
        match roles.iter().find(|r| r.name == self.config.admin_role_name) {
            Some(admin) => {
                debug!(role = %admin.name, "Admin role bypasses ACL checks");
                ControlFlow::Break(Decision::Allow(AllowReason::AdminBypass {
                    role: admin.name.clone(),
                }))
            }
            None => ControlFlow::Continue(()),
        }
    }

    fn resource_ref<'r>(&'r self, request: &'r AuthRequest) -> ControlFlow<Decision, ResourceRef<'r>> {
        match &request.target {
            Target::Instance(resource) => ControlFlow::Continue(ResourceRef::Instance(resource)),
            Target::Id(id) => ControlFlow::Continue(ResourceRef::Id { model: &self.model, id }),
            Target::None => ControlFlow::Break(Decision::Proceed(SoftDenial::NoModelInstance)),
        }
    }

    /// First resource role, in resource order, that the principal also holds
    fn match_role(&self, principal_roles: &[Role], resource_roles: &[Role]) -> ControlFlow<Decision, Role> {
        let matched = resource_roles
            .iter()
            .find_map(|scoped| principal_roles.iter().find(|held| held.id == scoped.id));

        match matched {
            Some(role) => {
                debug!(role = %role.name, "Matched role");
                ControlFlow::Continue(role.clone())
            }
            None => ControlFlow::Break(self.refuse(SoftDenial::NoMatchedRoles, DenyReason::NoMatchedRoles)),
        }
    }

    /// Re-save the matched role, returning the persisted record
    ///
    /// A failed touch is logged and the loaded record is used as-is.
    async fn touch(&self, role: Role) -> Role {
        if !self.config.touch_matched_role {
            return role;
        }

        match self.roles.touch(&role).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(role = %role.name, "Failed to touch matched role: {}", e);
                role
            }
        }
    }

    fn check_permission(&self, role: &Role, operation: &str) -> Decision {
        if role.acl.is_granted(&normalize_operation(operation)) {
            Decision::Allow(AllowReason::Granted {
                role: role.name.clone(),
                operation: operation.to_string(),
            })
        } else {
            Decision::Deny(DenyReason::PermissionDenied {
                role: role.name.clone(),
                operation: operation.to_string(),
            })
        }
    }

    /// Soft or hard refusal depending on guest access
    fn refuse(&self, soft: SoftDenial, hard: DenyReason) -> Decision {
        if self.config.guest_access {
            Decision::Proceed(soft)
        } else {
            Decision::Deny(hard)
        }
    }
}
