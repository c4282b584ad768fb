mod manifest;

pub use manifest::{HandlerFuture, RouteDescriptor, RouteHandler, RouteManifest, RouteProvider};

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, on, MethodFilter};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use common::config::ConfigHandle;
use common::validation::ConfigValidator;
use common::{Error, Result};

use crate::context::{RequestContext, REQUEST_ID_HEADER};

pub const HEALTH_PATH: &str = "/health";

/// Normalizes a service prefix: `None` for the root, otherwise a path with
/// one leading slash and no trailing slash.
pub fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// 路由构建器
///
/// Mounts route descriptors under the configured prefix. Every handler gets
/// a fresh [`RequestContext`] built from the configuration current at request
/// time.
pub struct RouterBuilder {
    config: ConfigHandle,
    schemas: Arc<ConfigValidator>,
    prefix: Option<String>,
    router: Router,
    mounted: HashSet<(Method, String)>,
}

impl RouterBuilder {
    /// Fails with [`Error::InvalidRoute`] when the configured prefix is not a
    /// mountable path.
    pub fn new(config: ConfigHandle, schemas: Arc<ConfigValidator>) -> Result<Self> {
        let prefix = normalize_prefix(&config.current().prefix);
        if let Some(prefix) = &prefix {
            check_prefix(prefix)?;
        }
        let mut mounted = HashSet::new();
        // 根前缀下健康检查路径被占用
        if prefix.is_none() {
            mounted.insert((Method::GET, HEALTH_PATH.to_string()));
        }

        Ok(Self {
            config,
            schemas,
            prefix,
            router: Router::new(),
            mounted,
        })
    }

    /// Mounts every route the provider offers.
    pub fn mount(mut self, provider: &dyn RouteProvider) -> Result<Self> {
        for descriptor in provider.routes() {
            self = self.mount_route(descriptor)?;
        }
        Ok(self)
    }

    fn mount_route(mut self, descriptor: RouteDescriptor) -> Result<Self> {
        let RouteDescriptor {
            method,
            path,
            handler,
        } = descriptor;

        check_path(&path)?;
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| Error::InvalidRoute(format!("unsupported method {} for {}", method, path)))?;
        if !self.mounted.insert((method.clone(), path.clone())) {
            return Err(Error::InvalidRoute(format!("{} {} is already mounted", method, path)));
        }

        info!(
            "Mounting route: {} {}{}",
            method,
            self.prefix.as_deref().unwrap_or(""),
            path
        );

        let config = self.config.clone();
        let schemas = self.schemas.clone();
        let endpoint = move |request: Request| {
            let handler = handler.clone();
            let ctx = RequestContext::attach(&config.current(), schemas.clone(), &request);
            async move {
                let request_id = ctx.request_id.clone();
                let mut response = handler(ctx, request).await;
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                response
            }
        };

        self.router = self.router.route(&path, on(filter, endpoint));
        Ok(self)
    }

    /// Finishes the router: nests the mounted routes under the prefix and adds
    /// the health check at the root.
    pub fn build(self) -> Router {
        let app = match &self.prefix {
            Some(prefix) => Router::new().nest(prefix, self.router),
            None => self.router,
        };

        app.route(HEALTH_PATH, get(health_check))
            .layer(TraceLayer::new_for_http())
    }
}

/// Checks a prefix taken from configuration. Captures are allowed, a
/// catch-all is not.
pub fn check_prefix(prefix: &str) -> Result<()> {
    check_path(prefix)?;
    if prefix.contains("{*") {
        return Err(Error::InvalidRoute(format!("prefix cannot hold a catch-all: {}", prefix)));
    }
    Ok(())
}

fn check_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::InvalidRoute(format!("path must start with '/': {}", path)));
    }

    let segments: Vec<&str> = path.split('/').collect();
    for (index, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(Error::InvalidRoute(format!(
                "use {{param}} or {{*rest}} captures instead of ':' or '*': {}",
                path
            )));
        }
        check_captures(segment).map_err(|reason| {
            Error::InvalidRoute(format!("{} in {}", reason, path))
        })?;
        if segment.contains("{*") && (index + 1 != segments.len() || !segment.starts_with("{*")) {
            return Err(Error::InvalidRoute(format!(
                "a catch-all must be the whole last segment: {}",
                path
            )));
        }
    }
    Ok(())
}

// 花括号必须成对且不能嵌套或为空
fn check_captures(segment: &str) -> std::result::Result<(), &'static str> {
    let mut open: Option<usize> = None;
    for (i, c) in segment.char_indices() {
        match (c, open) {
            ('{', None) => open = Some(i),
            ('{', Some(_)) => return Err("nested '{'"),
            ('}', None) => return Err("unmatched '}'"),
            ('}', Some(start)) => {
                let name = segment[start + 1..i].trim_start_matches('*');
                if name.is_empty() {
                    return Err("empty capture");
                }
                open = None;
            }
            _ => {}
        }
    }
    match open {
        Some(_) => Err("unclosed '{'"),
        None => Ok(()),
    }
}

/// 健康检查处理函数
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
