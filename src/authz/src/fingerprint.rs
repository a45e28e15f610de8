//! Schema fingerprint of the protected operation set
//!
//! The fingerprint is the base64 SHA-256 digest of every protected operation's
//! dotted string name, concatenated without separators in registry order. Two
//! ACL maps carrying the same fingerprint were built from the same key set.

use crate::acl::Acl;
use crate::registry::ModelRegistry;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Base64-encoded SHA-256 digest identifying an operation set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already encoded fingerprint (e.g. read back from storage)
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of the registry's current protected operation set
pub fn compute_fingerprint(registry: &ModelRegistry) -> Fingerprint {
    let mut hasher = Sha256::new();

    for operation in registry.protected_operations() {
        hasher.update(operation.string_name().as_bytes());
    }

    Fingerprint(STANDARD.encode(hasher.finalize()))
}

/// Default-deny ACL for every protected operation, stamped with the fingerprint
pub fn compute_default_acl(registry: &ModelRegistry) -> Acl {
    let mut hasher = Sha256::new();
    let mut entries = BTreeMap::new();

    for operation in registry.protected_operations() {
        let string_name = operation.string_name();
        hasher.update(string_name.as_bytes());
        entries.insert(operation.acl_key(), false);
    }

    Acl::from_parts(entries, Fingerprint(STANDARD.encode(hasher.finalize())))
}
