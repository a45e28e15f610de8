//! Per-role ACL map
//!
//! An [`Acl`] maps normalized operation names to a grant flag and carries the
//! fingerprint of the operation set it was built from. It persists as a single
//! flat object, the fingerprint living under the reserved [`ACL_HASH_KEY`]:
//!
//! ```json
//! { "Post_create": false, "Post_update": true, "aclHash": "q1Lk…=" }
//! ```

use crate::error::{AuthzError, Result};
use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved ACL key holding the schema fingerprint
pub const ACL_HASH_KEY: &str = "aclHash";

/// Operation grants of a role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(rename = "aclHash", default, skip_serializing_if = "Option::is_none")]
    hash: Option<Fingerprint>,

    #[serde(flatten)]
    entries: BTreeMap<String, bool>,
}

/// Keys touched by a migration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclMigration {
    /// Operations introduced with a default deny
    pub added: Vec<String>,

    /// Retired operations dropped from the map
    pub removed: Vec<String>,
}

impl AclMigration {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl Acl {
    pub(crate) fn from_parts(entries: BTreeMap<String, bool>, hash: Fingerprint) -> Self {
        Self {
            hash: Some(hash),
            entries,
        }
    }

    /// Fingerprint stamped at the last population or migration
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.hash.as_ref()
    }

    /// Whether this map was built from a different operation set
    pub fn is_stale(&self, current: &Fingerprint) -> bool {
        self.hash.as_ref() != Some(current)
    }

    /// Whether the operation behind `key` is granted
    ///
    /// Missing keys are denied.
    pub fn is_granted(&self, key: &str) -> bool {
        self.entries.get(key).copied().unwrap_or(false)
    }

    /// Grant an operation already present in the map
    pub fn grant(&mut self, key: &str) -> Result<()> {
        self.set(key, true)
    }

    /// Revoke an operation already present in the map
    pub fn revoke(&mut self, key: &str) -> Result<()> {
        self.set(key, false)
    }

    fn set(&mut self, key: &str, value: bool) -> Result<()> {
        match self.entries.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AuthzError::InvalidInput(format!(
                "Operation '{}' is not part of this ACL",
                key
            ))),
        }
    }

    /// Normalized operation keys, excluding the fingerprint
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Operation/grant pairs, excluding the fingerprint
    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bring this map in line with a freshly computed default map
    ///
    /// Retired keys are removed, new keys are added denied, surviving keys
    /// keep their value and the fingerprint is replaced by `fresh`'s.
    pub fn migrate_to(&mut self, fresh: &Acl) -> AclMigration {
        let mut migration = AclMigration::default();

        self.entries.retain(|key, _| {
            let keep = fresh.entries.contains_key(key);
            if !keep {
                migration.removed.push(key.clone());
            }
            keep
        });

        for key in fresh.entries.keys() {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), false);
                migration.added.push(key.clone());
            }
        }

        self.hash = fresh.hash.clone();
        migration
    }
}
