use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::configs::{LogConfig, ServiceDescriptor};
use crate::service_register_center::typos::{ServiceEndpoint, ServiceIdentity};
use crate::{Error, Result};

/// Config file used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "./config/service.yaml";

/// Prefix of environment variables that override file values, e.g. `SERVICE__PORT=9000`.
pub const ENV_PREFIX: &str = "SERVICE";

/// Hostname announced to a registry when the config does not set one.
pub const DEFAULT_HOSTNAME: &str = "localhost";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub guid: String,
    pub name: String,
    pub domain: String,
    pub port: u16,
    pub version: String,
    #[serde(default)]
    pub hostname: Option<String>,
    /// 挂载路由的前缀，同时作为注册信息上报
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default, rename = "self-registry")]
    pub self_registry: bool,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_prefix() -> String {
    "/".to_string()
}

/// Top-level keys that are always strings, whatever the source parsed them as.
const STRING_FIELDS: [&str; 6] = ["guid", "name", "domain", "version", "hostname", "prefix"];

// 环境变量开启了类型推断，`SERVICE__VERSION=2` 会被解析成数字
fn restore_string_fields(raw: &mut Value) {
    let Some(map) = raw.as_object_mut() else {
        return;
    };
    for key in STRING_FIELDS {
        if let Some(value) = map.get_mut(key) {
            if value.is_number() || value.is_boolean() {
                *value = Value::String(value.to_string());
            }
        }
    }
}

impl AppConfig {
    /// Loads the merged, unvalidated configuration tree.
    ///
    /// Sources in increasing priority: the config file (format picked from the
    /// extension, YAML when unknown) and `SERVICE__*` environment variables.
    /// The tree is returned as raw JSON so the schema check runs before any
    /// typed conversion. Environment values are type-inferred, so the identity
    /// fields (`guid`, `name`, `domain`, `version`, `hostname`, `prefix`) are
    /// turned back into strings when a source parsed them as numbers or bools.
    pub fn load_raw(file_path: Option<&str>) -> std::result::Result<Value, ConfigError> {
        let path = file_path.unwrap_or(DEFAULT_CONFIG_PATH);
        let format = if path.ends_with(".json") {
            FileFormat::Json
        } else if path.ends_with(".toml") {
            FileFormat::Toml
        } else {
            FileFormat::Yaml
        };

        let mut builder = Config::builder();

        // 默认路径允许缺失，显式指定的路径必须存在
        let required = file_path.is_some();
        if required || Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).format(format).required(required));
        }

        // 读取环境变量 (最高优先级)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut raw = builder.build()?.try_deserialize::<Value>()?;
        restore_string_fields(&mut raw);
        Ok(raw)
    }

    /// Converts a tree that already passed schema validation into the typed config.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::ConfigurationInvalid(e.to_string()))
    }

    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity {
            guid: self.guid.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    /// Where this process says it can be reached.
    pub fn self_endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint {
            hostname: self
                .hostname
                .clone()
                .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
            port: self.port,
        }
    }
}

/// Shared handle over the current configuration.
///
/// Readers take a cheap snapshot with [`ConfigHandle::current`] and never hold
/// the lock across an await point. Writers swap in a whole new config.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<AppConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    pub fn current(&self) -> Arc<AppConfig> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, config: AppConfig) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(config);
    }
}
