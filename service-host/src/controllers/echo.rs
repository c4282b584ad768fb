use axum::body::to_bytes;
use axum::extract::Request;
use axum::Json;
use serde_json::{json, Value};

use common::{Error, Result};

use crate::context::RequestContext;

/// Largest body the echo endpoint reads.
const MAX_ECHO_BODY: usize = 64 * 1024;

/// Schema applied to echo payloads when one is registered under this name.
pub const ECHO_SCHEMA: &str = "echo";

pub async fn echo(ctx: RequestContext, request: Request) -> Result<Json<Value>> {
    let bytes = to_bytes(request.into_body(), MAX_ECHO_BODY)
        .await
        .map_err(|e| Error::BadRequest(format!("unreadable body: {}", e)))?;
    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::BadRequest(format!("body is not JSON: {}", e)))?;

    if ctx.has_schema(ECHO_SCHEMA) {
        ctx.check(ECHO_SCHEMA, &payload)?;
    }

    Ok(Json(json!({
        "request_id": ctx.request_id,
        "service": ctx.identity.name,
        "payload": payload,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http;
    use axum::body::Body;
    use common::config::AppConfig;
    use common::validation::{ConfigValidator, StaticSchemaProvider};
    use std::sync::Arc;

    fn config() -> AppConfig {
        AppConfig::from_value(json!({
            "guid": "6f1c2a9e-3b4d-4e5f-8a7b-9c0d1e2f3a4b",
            "name": "inventory",
            "domain": "warehouse",
            "port": 8080,
            "version": "3.1.4",
        }))
        .unwrap()
    }

    fn call(validator: ConfigValidator, body: &str) -> (RequestContext, Request) {
        let request = http::Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from(body.to_string()))
            .unwrap();
        let ctx = RequestContext::attach(&config(), Arc::new(validator), &request);
        (ctx, request)
    }

    #[tokio::test]
    async fn echoes_json_payload() {
        let (ctx, request) = call(ConfigValidator::new().unwrap(), r#"{"sku":"A-1","qty":3}"#);
        let Json(body) = echo(ctx, request).await.unwrap();
        assert_eq!(body["payload"], json!({"sku": "A-1", "qty": 3}));
        assert_eq!(body["service"], "inventory");
    }

    #[tokio::test]
    async fn rejects_non_json_body() {
        let (ctx, request) = call(ConfigValidator::new().unwrap(), "not json");
        assert!(matches!(echo(ctx, request).await, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn registered_echo_schema_is_enforced() {
        let provider = StaticSchemaProvider::new().with(
            ECHO_SCHEMA,
            json!({
                "type": "object",
                "required": ["sku"],
                "properties": {"sku": {"type": "string"}}
            }),
        );
        let validator = ConfigValidator::with_provider(&provider).unwrap();

        let (ctx, request) = call(validator, r#"{"qty":3}"#);
        match echo(ctx, request).await {
            Err(Error::BadRequest(message)) => assert!(message.contains("sku")),
            other => panic!("expected BadRequest, got {:?}", other.map(|Json(v)| v)),
        }
    }
}
