use axum::extract::Request;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use common::config::AppConfig;
use common::service_register_center::ServiceIdentity;
use common::validation::ConfigValidator;
use common::{Error, Result};

/// Header carrying the request id in and out of the service.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context handed to every mounted handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: ServiceIdentity,
    pub request_id: String,
    pub received_at: DateTime<Utc>,
    schemas: Arc<ConfigValidator>,
}

impl RequestContext {
    /// Builds the context for `request` from the current configuration.
    ///
    /// The caller's `x-request-id` is kept when present, otherwise a fresh
    /// UUID is assigned.
    pub fn attach(config: &AppConfig, schemas: Arc<ConfigValidator>, request: &Request) -> Self {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            identity: config.identity(),
            request_id,
            received_at: Utc::now(),
            schemas,
        }
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.has_schema(name)
    }

    /// Checks `value` against the named schema, failing with every violation.
    pub fn check(&self, schema: &str, value: &Value) -> Result<()> {
        let violations = self.schemas.validate_named(schema, value)?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::BadRequest(violations.join("; ")))
        }
    }
}
