//! # Modelguard Authorization Engine
//!
//! Request-time authorization for protected models, driven by per-role ACL
//! maps that keep themselves in sync with the set of protected operations.
//!
//! ## Features
//!
//! - **Explicit model registry** declaring protected models and their operations
//! - **Schema fingerprint** (base64 SHA-256) detecting operation set changes
//! - **Self-migrating ACLs**: default-deny on role creation, migrate-on-write after changes
//! - **Decision pipeline**: login check, admin bypass, instance-scoped role matching, ACL lookup
//! - **Guest access** turning missing logins and unmatched roles into fallthroughs
//! - **HTTP decision service** for hosts that cannot link the crate
//!
//! ## Example
//!
//! ```rust
//! use modelguard_authz::{
//!     AuthorizationBinding, AuthorizationConfig, Collaborators, InMemoryDirectory,
//!     ModelRegistry, OperationContext, Principal, Resource, Role,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(
//!     ModelRegistry::builder()
//!         .protected("Post", ["find", "update"])
//!         .build()?,
//! );
//! let directory = Arc::new(InMemoryDirectory::new());
//! let binding = AuthorizationBinding::attach(
//!     AuthorizationConfig::default(),
//!     registry,
//!     Collaborators::from_directory(directory.clone()),
//! )?;
//!
//! // New roles start with every operation denied
//! let mut editor = binding.roles().create(Role::new("r1", "editor")).await?;
//! editor.acl.grant("Post_update")?;
//! binding.roles().update(editor).await?;
//!
//! directory.insert_principal(Principal::new("alice").with_role("r1")).await;
//! directory.insert_resource(Resource::new("Post", "p1").with_role("r1")).await;
//!
//! let mut ctx = OperationContext::new("Post.update").with_principal("alice").with_id("p1");
//! let decision = binding.before_operation(&mut ctx).await?;
//! assert!(decision.map(|d| d.is_allowed()).unwrap_or(false));
//! # Ok(())
//! # }
//! ```

pub mod acl;
pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod http;
pub mod memory;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use acl::{Acl, AclMigration, ACL_HASH_KEY};
pub use binding::{AuthorizationBinding, Collaborators, HookError, ModelGuard, OperationContext, ScopedRoleRelation};
pub use config::AuthorizationConfig;
pub use engine::{AllowReason, AuthRequest, Decision, DecisionEngine, DenyReason, SoftDenial, Target};
pub use error::{AuthzError, Result};
pub use fingerprint::{compute_default_acl, compute_fingerprint, Fingerprint};
pub use memory::{DirectorySeed, InMemoryDirectory};
pub use registry::{ModelDeclaration, ModelDescriptor, ModelRegistry, ModelRegistryBuilder};
pub use repository::{MigrationSummary, RoleRepository};
pub use resolver::{ResourceRef, RoleResolver};
pub use store::{PrincipalStore, ResourceStore, RoleStore};
pub use sync::{AclSynchronizer, SyncOutcome};
pub use types::{normalize_operation, Operation, Principal, PrincipalId, Resource, ResourceId, Role, RoleId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
