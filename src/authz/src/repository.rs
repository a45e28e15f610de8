//! Role record save path
//!
//! [`RoleRepository`] is the only way this crate writes role records: every
//! write runs the [`AclSynchronizer`] pre-save hook before reaching the
//! [`RoleStore`].

use crate::error::{AuthzError, Result};
use crate::store::RoleStore;
use crate::sync::{AclSynchronizer, SyncOutcome};
use crate::types::{Role, RoleId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a maintenance migration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Role records inspected
    pub examined: usize,

    /// Roles whose ACL was migrated
    pub migrated: Vec<RoleId>,

    /// Admin roles skipped
    pub skipped_admin: usize,
}

/// Role persistence with the ACL pre-save hook applied
#[derive(Clone)]
pub struct RoleRepository {
    store: Arc<dyn RoleStore>,
    synchronizer: AclSynchronizer,
}

impl RoleRepository {
    pub fn new(store: Arc<dyn RoleStore>, synchronizer: AclSynchronizer) -> Self {
        Self { store, synchronizer }
    }

    pub fn synchronizer(&self) -> &AclSynchronizer {
        &self.synchronizer
    }

    pub async fn find(&self, id: &str) -> Result<Option<Role>> {
        self.store.find_role(id).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.store.find_role_by_name(name).await
    }

    /// Create a role record; its ACL is replaced by the default map
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::InvalidInput`] if the id or the name is already taken.
    pub async fn create(&self, role: Role) -> Result<Role> {
        if role.name.trim().is_empty() {
            return Err(AuthzError::InvalidInput("Role name cannot be empty".to_string()));
        }
        if self.store.find_role(&role.id).await?.is_some() {
            return Err(AuthzError::InvalidInput(format!(
                "Role '{}' already exists",
                role.id
            )));
        }
        if self.store.find_role_by_name(&role.name).await?.is_some() {
            return Err(AuthzError::InvalidInput(format!(
                "Role name '{}' is already taken",
                role.name
            )));
        }

        self.write(role, true).await
    }

    /// Update an existing role record, migrating a stale ACL
    pub async fn update(&self, role: Role) -> Result<Role> {
        if self.store.find_role(&role.id).await?.is_none() {
            return Err(AuthzError::RoleNotFound(role.id));
        }

        self.write(role, false).await
    }

    /// Insert or update depending on whether the record exists
    pub async fn save(&self, role: Role) -> Result<Role> {
        let is_new = self.store.find_role(&role.id).await?.is_none();
        if is_new {
            self.create(role).await
        } else {
            self.write(role, false).await
        }
    }

    /// Re-save a role record unchanged
    ///
    /// Goes through the regular update path, so a stale ACL is migrated.
    pub async fn touch(&self, role: &Role) -> Result<Role> {
        debug!(role = %role.name, "Touching role record");
        self.update(role.clone()).await
    }

    /// Migrate every stale role record
    ///
    /// Explicit maintenance counterpart of the lazy migrate-on-write hook; run
    /// it after deploying a changed operation set.
    pub async fn migrate_stale_roles(&self) -> Result<MigrationSummary> {
        let roles = self.store.list_roles().await?;
        let mut summary = MigrationSummary {
            examined: roles.len(),
            ..Default::default()
        };

        for role in roles {
            if self.synchronizer.is_admin(&role) {
                summary.skipped_admin += 1;
                continue;
            }
            if !self.synchronizer.needs_migration(&role) {
                continue;
            }

            let id = role.id.clone();
            self.write(role, false).await?;
            summary.migrated.push(id);
        }

        if summary.migrated.is_empty() {
            debug!(examined = summary.examined, "All role ACLs are current");
        } else {
            info!(
                examined = summary.examined,
                migrated = summary.migrated.len(),
                "Migrated stale role ACLs"
            );
        }

        Ok(summary)
    }

    async fn write(&self, mut role: Role, is_new: bool) -> Result<Role> {
        let outcome = self.synchronizer.before_save(&mut role, is_new);
        if outcome == SyncOutcome::AdminSkipped && is_new {
            warn!(role = %role.name, "Admin role created without an ACL; access is implicit");
        }

        self.store.save_role(role).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use crate::registry::ModelRegistry;

    fn repository(methods: &[&str], store: Arc<InMemoryDirectory>) -> RoleRepository {
        let registry = Arc::new(
            ModelRegistry::builder()
                .protected("Post", methods.iter().copied())
                .build()
                .unwrap(),
        );
        RoleRepository::new(store, AclSynchronizer::new(registry, "admin"))
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let store = Arc::new(InMemoryDirectory::new());
        let repo = repository(&["find"], store.clone());

        repo.create(Role::new("r1", "editor")).await.unwrap();

        assert!(repo.create(Role::new("r1", "other")).await.is_err());
        assert!(repo.create(Role::new("r2", "editor")).await.is_err());
        assert!(repo.create(Role::new("r3", " ")).await.is_err());
    }

    #[tokio::test]
    async fn test_update_unknown_role() {
        let store = Arc::new(InMemoryDirectory::new());
        let repo = repository(&["find"], store);

        let result = repo.update(Role::new("ghost", "editor")).await;
        assert!(matches!(result, Err(AuthzError::RoleNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let store = Arc::new(InMemoryDirectory::new());
        let repo = repository(&["find"], store.clone());

        let created = repo.save(Role::new("r1", "editor")).await.unwrap();
        assert_eq!(created.acl.len(), 1);

        let mut edited = created.clone();
        edited.acl.grant("Post_find").unwrap();
        let saved = repo.save(edited).await.unwrap();
        assert!(saved.acl.is_granted("Post_find"));
        assert_eq!(store.save_count("r1").await, 2);
    }

    #[tokio::test]
    async fn test_migrate_stale_roles() {
        let store = Arc::new(InMemoryDirectory::new());
        let old = repository(&["find"], store.clone());
        old.create(Role::new("r1", "editor")).await.unwrap();
        old.create(Role::new("r2", "viewer")).await.unwrap();
        store.insert_role(Role::new("r0", "admin")).await;

        let new = repository(&["find", "update"], store.clone());
        let summary = new.migrate_stale_roles().await.unwrap();

        assert_eq!(summary.examined, 3);
        assert_eq!(summary.migrated, vec!["r1", "r2"]);
        assert_eq!(summary.skipped_admin, 1);

        let editor = store.find_role("r1").await.unwrap().unwrap();
        assert_eq!(editor.acl.operations().count(), 2);

        let again = new.migrate_stale_roles().await.unwrap();
        assert!(again.migrated.is_empty());
    }
}
