//! ACL record synchronizer
//!
//! Runs before a role record is persisted. New roles receive a fully
//! populated default-deny ACL; existing roles whose stored fingerprint no
//! longer matches the registry are migrated in place. Records carrying the
//! admin role name are never touched.

use crate::acl::AclMigration;
use crate::fingerprint::{compute_default_acl, compute_fingerprint, Fingerprint};
use crate::registry::ModelRegistry;
use crate::types::Role;
use std::sync::Arc;
use tracing::{debug, info};

/// What the pre-save hook did to a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New record received the default ACL
    Populated,

    /// Stale record was migrated to the current operation set
    Migrated(AclMigration),

    /// Record already matched the current fingerprint
    Current,

    /// Admin record, left as supplied
    AdminSkipped,
}

impl SyncOutcome {
    /// Whether the ACL was rewritten
    pub fn changed_acl(&self) -> bool {
        matches!(self, Self::Populated | Self::Migrated(_))
    }
}

/// Pre-save hook keeping role ACLs aligned with the registry
#[derive(Debug, Clone)]
pub struct AclSynchronizer {
    registry: Arc<ModelRegistry>,
    admin_role_name: String,
}

impl AclSynchronizer {
    pub fn new(registry: Arc<ModelRegistry>, admin_role_name: impl Into<String>) -> Self {
        Self {
            registry,
            admin_role_name: admin_role_name.into(),
        }
    }

    /// Fingerprint of the registry's current operation set
    pub fn fingerprint(&self) -> Fingerprint {
        compute_fingerprint(&self.registry)
    }

    pub fn is_admin(&self, role: &Role) -> bool {
        role.name == self.admin_role_name
    }

    /// Whether saving `role` would rewrite its ACL
    pub fn needs_migration(&self, role: &Role) -> bool {
        !self.is_admin(role) && role.acl.is_stale(&self.fingerprint())
    }

    /// Apply the pre-save rules to `role`
    ///
    /// `is_new` is true when the record is being created rather than updated.
    pub fn before_save(&self, role: &mut Role, is_new: bool) -> SyncOutcome {
        if self.is_admin(role) {
            debug!(role = %role.name, "Skipping ACL sync for admin role");
            return SyncOutcome::AdminSkipped;
        }

        if is_new {
            role.acl = compute_default_acl(&self.registry);
            info!(role = %role.name, operations = role.acl.len(), "Populated default role ACL");
            return SyncOutcome::Populated;
        }

        let current = self.fingerprint();
        if !role.acl.is_stale(&current) {
            return SyncOutcome::Current;
        }

        let fresh = compute_default_acl(&self.registry);
        let migration = role.acl.migrate_to(&fresh);

        info!(
            role = %role.name,
            added = migration.added.len(),
            removed = migration.removed.len(),
            "Migrated role ACL to current operation set"
        );

        SyncOutcome::Migrated(migration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::Acl;

    fn registry(methods: &[&str]) -> Arc<ModelRegistry> {
        Arc::new(
            ModelRegistry::builder()
                .protected("Post", methods.iter().copied())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_new_role_gets_default_acl_overwriting_input() {
        let sync = AclSynchronizer::new(registry(&["find", "update"]), "admin");
        let supplied: Acl = serde_json::from_value(serde_json::json!({"Post_update": true, "Bogus_op": true})).unwrap();
        let mut role = Role::new("r1", "editor").with_acl(supplied);

        let outcome = sync.before_save(&mut role, true);

        assert_eq!(outcome, SyncOutcome::Populated);
        assert_eq!(role.acl.operations().collect::<Vec<_>>(), vec!["Post_find", "Post_update"]);
        assert!(!role.acl.is_granted("Post_update"));
        assert_eq!(role.acl.fingerprint(), Some(&sync.fingerprint()));
    }

    #[test]
    fn test_stale_role_is_migrated() {
        let old = AclSynchronizer::new(registry(&["find", "legacy"]), "admin");
        let mut role = Role::new("r1", "editor");
        old.before_save(&mut role, true);
        role.acl.grant("Post_find").unwrap();
        role.acl.grant("Post_legacy").unwrap();

        let new = AclSynchronizer::new(registry(&["find", "update"]), "admin");
        assert!(new.needs_migration(&role));

        let outcome = new.before_save(&mut role, false);

        match outcome {
            SyncOutcome::Migrated(migration) => {
                assert_eq!(migration.added, vec!["Post_update"]);
                assert_eq!(migration.removed, vec!["Post_legacy"]);
            }
            other => panic!("expected migration, got {:?}", other),
        }
        assert!(role.acl.is_granted("Post_find"));
        assert!(!role.acl.is_granted("Post_update"));
        assert_eq!(role.acl.fingerprint(), Some(&new.fingerprint()));
        assert!(!new.needs_migration(&role));
    }

    #[test]
    fn test_current_role_left_alone() {
        let sync = AclSynchronizer::new(registry(&["find"]), "admin");
        let mut role = Role::new("r1", "editor");
        sync.before_save(&mut role, true);
        role.acl.grant("Post_find").unwrap();
        let before = role.clone();

        assert_eq!(sync.before_save(&mut role, false), SyncOutcome::Current);
        assert_eq!(role, before);
    }

    #[test]
    fn test_admin_role_never_touched() {
        let sync = AclSynchronizer::new(registry(&["find"]), "admin");
        let mut role = Role::new("r0", "admin");

        assert_eq!(sync.before_save(&mut role, true), SyncOutcome::AdminSkipped);
        assert!(role.acl.is_empty());
        assert_eq!(sync.before_save(&mut role, false), SyncOutcome::AdminSkipped);
        assert!(role.acl.fingerprint().is_none());
        assert!(!sync.needs_migration(&role));
    }
}
