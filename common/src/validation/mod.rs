pub mod provider;

use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{Error, Result};

// 重新导出常用的类型
pub use provider::{
    DirectorySchemaProvider, NamedSchema, SchemaProvider, StaticSchemaProvider, SCHEMA_FILE_SUFFIX,
};

/// Name of the built-in schema every service configuration must satisfy.
pub const SERVICE_SCHEMA: &str = "service";

const SERVICE_SCHEMA_DOCUMENT: &str = include_str!("../../schemas/service.schema.json");

/// Compiled JSON schemas, keyed by name.
///
/// Always holds the built-in `service` schema; further schemas come from a
/// [`SchemaProvider`]. Schemas compile once, when they are registered.
pub struct ConfigValidator {
    schemas: HashMap<String, Validator>,
}

impl std::fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.schemas.keys().collect();
        names.sort();
        f.debug_struct("ConfigValidator").field("schemas", &names).finish()
    }
}

impl ConfigValidator {
    /// Validator holding only the built-in service schema.
    pub fn new() -> Result<Self> {
        let document: Value = serde_json::from_str(SERVICE_SCHEMA_DOCUMENT)?;
        let mut validator = Self {
            schemas: HashMap::new(),
        };
        validator.register(SERVICE_SCHEMA, &document)?;
        Ok(validator)
    }

    /// Built-in schema plus everything `provider` supplies.
    ///
    /// A provider cannot replace the built-in `service` schema; such an entry
    /// is skipped with a warning.
    pub fn with_provider(provider: &dyn SchemaProvider) -> Result<Self> {
        let mut validator = Self::new()?;
        for schema in provider.schemas()? {
            if schema.name == SERVICE_SCHEMA {
                warn!("Ignoring provided schema '{}': the name is reserved", schema.name);
                continue;
            }
            validator.register(&schema.name, &schema.document)?;
        }
        Ok(validator)
    }

    pub fn register(&mut self, name: &str, document: &Value) -> Result<()> {
        let compiled = jsonschema::draft7::new(document).map_err(|e| Error::Schema {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Registered schema: {}", name);
        self.schemas.insert(name.to_string(), compiled);
        Ok(())
    }

    /// Checks a service configuration against the built-in schema.
    ///
    /// Returns `false` on any violation, logging each one.
    pub fn validate(&self, config: &Value) -> bool {
        match self.validate_named(SERVICE_SCHEMA, config) {
            Ok(violations) if violations.is_empty() => true,
            Ok(violations) => {
                for violation in &violations {
                    warn!("Configuration violation: {}", violation);
                }
                false
            }
            Err(e) => {
                warn!("Configuration could not be validated: {}", e);
                false
            }
        }
    }

    /// Every violation of schema `name` by `value`; empty when valid.
    pub fn validate_named(&self, name: &str, value: &Value) -> Result<Vec<String>> {
        let schema = self
            .schemas
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("schema '{}'", name)))?;

        Ok(schema
            .iter_errors(value)
            .map(|e| e.to_string().replace('\n', " "))
            .collect())
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}
