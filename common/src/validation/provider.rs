use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Error, Result};

/// File-name suffix marking a schema document on disk.
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// A JSON schema document together with the name it is registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSchema {
    pub name: String,
    pub document: Value,
}

impl NamedSchema {
    pub fn new(name: impl Into<String>, document: Value) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

/// Supplies named schemas to the validator at startup.
pub trait SchemaProvider: Send + Sync {
    fn schemas(&self) -> Result<Vec<NamedSchema>>;
}

/// In-memory schemas, mostly for tests and for binaries that embed them.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaProvider {
    schemas: Vec<NamedSchema>,
}

impl StaticSchemaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, document: Value) -> Self {
        self.schemas.push(NamedSchema::new(name, document));
        self
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn schemas(&self) -> Result<Vec<NamedSchema>> {
        Ok(self.schemas.clone())
    }
}

/// Reads every `*.schema.json` file in one directory (not recursive).
///
/// `orders.schema.json` is registered as `orders`. Other files are ignored.
#[derive(Debug, Clone)]
pub struct DirectorySchemaProvider {
    dir: PathBuf,
}

impl DirectorySchemaProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn schema_name(path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        file_name
            .strip_suffix(SCHEMA_FILE_SUFFIX)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

impl SchemaProvider for DirectorySchemaProvider {
    fn schemas(&self) -> Result<Vec<NamedSchema>> {
        let mut schemas = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = Self::schema_name(&path) else {
                continue;
            };

            let text = fs::read_to_string(&path)?;
            let document = serde_json::from_str(&text).map_err(|e| Error::Schema {
                name: name.clone(),
                reason: format!("{}: {}", path.display(), e),
            })?;

            debug!("Loaded schema {} from {}", name, path.display());
            schemas.push(NamedSchema::new(name, document));
        }

        // 目录遍历顺序不稳定，按名称排序
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schemas)
    }
}
