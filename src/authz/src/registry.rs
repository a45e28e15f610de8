//! Explicit registry of models and their exposed operations
//!
//! Built once at start-up and shared by reference. The registry is the single
//! source of the operation set: declaration order of models and of operations
//! within a model is the enumeration order used for fingerprinting.

use crate::error::{AuthzError, Result};
use crate::types::Operation;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Serializable model declaration, e.g. a `[[models]]` table of a config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDeclaration {
    pub name: String,

    #[serde(default = "default_protected")]
    pub protected: bool,

    /// Method names relative to the model
    #[serde(default)]
    pub operations: Vec<String>,
}

fn default_protected() -> bool {
    true
}

/// A model known to the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    name: String,
    protected: bool,
    operations: Vec<Operation>,
}

impl ModelDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the model carries the protected marker
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Exposed operations in declaration order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }
}

/// Ordered, validated set of model descriptors
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Build a registry from declarations, keeping their order
    pub fn from_declarations(declarations: Vec<ModelDeclaration>) -> Result<Self> {
        declarations
            .into_iter()
            .fold(Self::builder(), |builder, d| builder.declare(d.name, d.protected, d.operations))
            .build()
    }

    /// All models in declaration order
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.model(name).map(ModelDescriptor::is_protected).unwrap_or(false)
    }

    /// Models carrying the protected marker, in declaration order
    pub fn protected_models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter().filter(|m| m.protected)
    }

    /// Operations of every protected model, in enumeration order
    pub fn protected_operations(&self) -> impl Iterator<Item = &Operation> {
        self.protected_models().flat_map(|m| m.operations.iter())
    }
}

/// Builder collecting model declarations
#[derive(Debug, Default)]
pub struct ModelRegistryBuilder {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistryBuilder {
    /// Declare a protected model with its method names (e.g. `find`, `prototype.update`)
    pub fn protected<I, S>(self, name: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(name.into(), true, methods)
    }

    /// Declare a model that is not subject to authorization
    pub fn unprotected<I, S>(self, name: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(name.into(), false, methods)
    }

    fn declare<I, S>(mut self, name: String, protected: bool, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let operations = methods
            .into_iter()
            .map(|method| Operation::new(name.clone(), method))
            .collect();

        self.models.push(ModelDescriptor {
            name,
            protected,
            operations,
        });
        self
    }

    /// Validate the declarations and freeze them
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::InvalidRegistry`] if:
    /// - a model name is empty, contains `.`, or is declared twice
    /// - a method name is empty or declared twice on the same model
    /// - two protected operations normalize to the same ACL key
    pub fn build(self) -> Result<ModelRegistry> {
        let mut names = HashSet::new();
        let mut keys: HashMap<String, String> = HashMap::new();

        for model in &self.models {
            if model.name.is_empty() || model.name.contains('.') {
                return Err(AuthzError::InvalidRegistry(format!(
                    "Invalid model name '{}'",
                    model.name
                )));
            }
            if !names.insert(model.name.as_str()) {
                return Err(AuthzError::InvalidRegistry(format!(
                    "Model '{}' declared twice",
                    model.name
                )));
            }

            let mut methods = HashSet::new();
            for operation in &model.operations {
                if operation.method.is_empty() {
                    return Err(AuthzError::InvalidRegistry(format!(
                        "Model '{}' declares an empty method name",
                        model.name
                    )));
                }
                if !methods.insert(operation.method.as_str()) {
                    return Err(AuthzError::InvalidRegistry(format!(
                        "Operation '{}' declared twice",
                        operation
                    )));
                }

                if !model.protected {
                    continue;
                }

                // keys always contain `_`, so they never shadow the fingerprint key
                let key = operation.acl_key();
                if let Some(previous) = keys.insert(key.clone(), operation.string_name()) {
                    return Err(AuthzError::InvalidRegistry(format!(
                        "Operations '{}' and '{}' both normalize to '{}'",
                        previous, operation, key
                    )));
                }
            }
        }

        debug!(
            models = self.models.len(),
            protected_operations = keys.len(),
            "Model registry built"
        );

        Ok(ModelRegistry { models: self.models })
    }
}
