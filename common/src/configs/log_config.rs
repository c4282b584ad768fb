use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    pub components: Option<HashMap<String, String>>, // 其他组件的日志级别
    pub format: Option<String>,                       // 日志输出格式: plain或json
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: None,
            format: None,
        }
    }
}

impl LogConfig {
    /// Pulls the `log` section out of an unvalidated config tree.
    ///
    /// Logging has to be up before the schema check runs, so a missing or
    /// malformed section falls back to the defaults instead of failing.
    pub fn from_raw(raw: &Value) -> Self {
        raw.get("log")
            .cloned()
            .and_then(|section| serde_json::from_value(section).ok())
            .unwrap_or_default()
    }

    pub fn level(&self) -> tracing::Level {
        match self.level.as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    // 获取特定组件的日志级别
    pub fn component_level(&self, component: &str) -> Option<&str> {
        self.components
            .as_ref()
            .and_then(|components| components.get(component).map(|s| s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_raw_reads_section() {
        let raw = json!({
            "log": { "level": "debug", "format": "json", "components": { "hyper": "warn" } }
        });
        let log = LogConfig::from_raw(&raw);
        assert_eq!(log.level(), tracing::Level::DEBUG);
        assert_eq!(log.format.as_deref(), Some("json"));
        assert_eq!(log.component_level("hyper"), Some("warn"));
    }

    #[test]
    fn from_raw_falls_back_to_defaults() {
        let log = LogConfig::from_raw(&json!({ "log": 42 }));
        assert_eq!(log.level, "info");
        assert!(log.components.is_none());

        let log = LogConfig::from_raw(&json!({}));
        assert_eq!(log.level(), tracing::Level::INFO);
    }
}
