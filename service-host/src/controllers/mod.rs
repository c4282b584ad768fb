mod echo;
mod info;

use axum::http::Method;

use crate::router::RouteManifest;

/// Routes shipped with the host binary.
pub fn manifest() -> RouteManifest {
    RouteManifest::new()
        .route(Method::GET, "/info", info::info)
        .route(Method::POST, "/echo", echo::echo)
}
