use axum::extract::Request;
use axum::Json;
use serde_json::{json, Value};

use crate::context::RequestContext;

/// 返回服务身份信息
pub async fn info(ctx: RequestContext, _request: Request) -> Json<Value> {
    Json(json!({
        "guid": ctx.identity.guid,
        "name": ctx.identity.name,
        "version": ctx.identity.version,
        "request_id": ctx.request_id,
        "received_at": ctx.received_at.to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http;
    use common::config::AppConfig;
    use common::validation::ConfigValidator;
    use std::sync::Arc;

    #[tokio::test]
    async fn info_reports_identity() {
        let config = AppConfig::from_value(json!({
            "guid": "6f1c2a9e-3b4d-4e5f-8a7b-9c0d1e2f3a4b",
            "name": "inventory",
            "domain": "warehouse",
            "port": 8080,
            "version": "3.1.4",
        }))
        .unwrap();
        let request = http::Request::builder()
            .uri("/info")
            .header("x-request-id", "abc")
            .body(axum::body::Body::empty())
            .unwrap();
        let ctx = RequestContext::attach(&config, Arc::new(ConfigValidator::new().unwrap()), &request);

        let Json(body) = info(ctx, request).await;
        assert_eq!(body["name"], "inventory");
        assert_eq!(body["version"], "3.1.4");
        assert_eq!(body["guid"], "6f1c2a9e-3b4d-4e5f-8a7b-9c0d1e2f3a4b");
        assert_eq!(body["request_id"], "abc");
    }
}
