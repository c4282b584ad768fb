use axum::extract::Request;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::RequestContext;

pub type HandlerFuture = BoxFuture<'static, Response>;

/// Type-erased route handler. The context is attached before it runs.
pub type RouteHandler = Arc<dyn Fn(RequestContext, Request) -> HandlerFuture + Send + Sync>;

/// One route to mount: method, path relative to the service prefix, handler.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    pub path: String,
    pub handler: RouteHandler,
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RouteDescriptor {
    pub fn new<F, Fut, R>(method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        let handler: RouteHandler = Arc::new(move |ctx, req| {
            let fut = handler(ctx, req);
            Box::pin(async move { fut.await.into_response() })
        });

        Self {
            method,
            path: path.into(),
            handler,
        }
    }
}

/// Handler-discovery seam: whatever knows the service's controllers.
pub trait RouteProvider: Send + Sync {
    fn routes(&self) -> Vec<RouteDescriptor>;
}

/// Explicit, build-time list of routes.
#[derive(Clone, Default, Debug)]
pub struct RouteManifest {
    routes: Vec<RouteDescriptor>,
}

impl RouteManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F, Fut, R>(mut self, method: Method, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        self.routes.push(RouteDescriptor::new(method, path, handler));
        self
    }

    pub fn merge(mut self, other: RouteManifest) -> Self {
        self.routes.extend(other.routes);
        self
    }
}

impl From<Vec<RouteDescriptor>> for RouteManifest {
    fn from(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }
}

impl RouteProvider for RouteManifest {
    fn routes(&self) -> Vec<RouteDescriptor> {
        self.routes.clone()
    }
}
