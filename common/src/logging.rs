use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::configs::LogConfig;
use crate::{Error, Result};

// 日志输出格式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    // 普通文本格式
    Plain,
    // JSON格式，适合ELK等日志聚合系统
    Json,
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

/// Filter directives derived from the log section: the global level first,
/// then one `target=level` per configured component.
pub fn filter_directives(config: &LogConfig) -> String {
    let mut filter_parts = vec![config.level.clone()];

    if let Some(components) = &config.components {
        let mut components: Vec<_> = components.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_parts.push(format!("{}={}", component, level));
        }
    }

    filter_parts.join(",")
}

/// 从配置初始化日志系统
///
/// `RUST_LOG` overrides the configured directives, and `RUST_LOG_<COMPONENT>`
/// adds per-component levels on top. Fails if a global subscriber is already
/// installed.
pub fn init_from_config(config: &LogConfig) -> Result<()> {
    let env_filter = match env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(filter_directives(config)),
    };
    let env_filter = check_env_component_overrides(env_filter);

    let log_format = config
        .format
        .as_deref()
        .map(LogFormat::from)
        .unwrap_or(LogFormat::Plain);

    // 根据配置的输出格式选择日志输出方式
    let installed = match log_format {
        LogFormat::Plain => fmt()
            .with_env_filter(env_filter)
            .with_ansi(true)
            .with_thread_names(true)
            .try_init(),
        LogFormat::Json => fmt()
            .with_env_filter(env_filter)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_thread_names(true)
            .try_init(),
    };
    installed.map_err(|e| Error::Internal(format!("failed to install log subscriber: {}", e)))?;

    info!("Logging initialized, level: {}, format: {:?}", config.level, log_format);
    Ok(())
}

/// 检查环境变量中是否有组件特定的日志级别覆盖
fn check_env_component_overrides(mut env_filter: EnvFilter) -> EnvFilter {
    let common_components = ["tower_http", "hyper", "axum", "reqwest"];

    for component in &common_components {
        let env_var_name = format!("RUST_LOG_{}", component.to_uppercase());
        if let Ok(level) = env::var(&env_var_name) {
            // 尝试添加指令，如果解析失败则忽略
            if let Ok(directive) = format!("{}={}", component, level).parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }

    env_filter
}
