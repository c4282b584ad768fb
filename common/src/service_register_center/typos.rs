// 导入 serde 用于序列化和反序列化
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::configs::ServiceDescriptor;
use crate::{Error, Result};

/// 服务身份信息
///
/// Identifies this process to a registry. Built from configuration and never
/// mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub guid: String,
    pub name: String,
    pub version: String,
}

/// 服务地址
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceEndpoint {
    pub hostname: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Plain-HTTP URL for `path` on this endpoint.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.hostname, self.port, path)
    }
}

impl std::fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// A configured registry that self-registration may target.
///
/// Candidates are ranked by priority alone; see [`RegistryCandidate::cmp_priority`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistryCandidate {
    pub endpoint: ServiceEndpoint,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: i64,
}

impl RegistryCandidate {
    /// Returns a candidate only for descriptors tagged as a registry.
    pub fn from_descriptor(descriptor: &ServiceDescriptor) -> Option<Self> {
        descriptor.is_registry().then(|| Self {
            endpoint: ServiceEndpoint::new(descriptor.hostname.clone(), descriptor.port),
            kind: descriptor.kind.clone(),
            priority: descriptor.priority,
        })
    }

    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

/// 服务注册请求
///
/// Serializes flat onto the wire as
/// `{guid, name, version, prefix, hostname, port}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    #[serde(flatten)]
    pub identity: ServiceIdentity,
    pub prefix: String,
    #[serde(flatten)]
    pub endpoint: ServiceEndpoint,
}

impl RegistrationRequest {
    /// Builds the request from a configuration snapshot.
    ///
    /// Fails when the snapshot no longer carries a usable identity, which can
    /// happen if the configuration was swapped at runtime after startup
    /// validation.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Uuid::parse_str(&config.guid)
            .map_err(|e| Error::BadRequest(format!("guid '{}' is not a UUID: {}", config.guid, e)))?;
        if config.name.trim().is_empty() {
            return Err(Error::BadRequest("service name is empty".to_string()));
        }

        Ok(Self {
            identity: config.identity(),
            prefix: config.prefix.clone(),
            endpoint: config.self_endpoint(),
        })
    }
}

/// 注册结果分类
///
/// Result of a single registration attempt; drives the retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The registry answered inside the success band.
    Success,
    /// The registry answered, but outside the success band.
    Rejected { status: u16, body: String },
    /// No answer: connection refused or the attempt deadline passed.
    ConnectionFailed(String),
    /// Anything else, including a request that could not be built.
    UnknownError(String),
}

impl RegistrationOutcome {
    /// Only an unreachable registry is worth polling again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistrationOutcome::ConnectionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> AppConfig {
        AppConfig::from_value(json!({
            "guid": "{6f1c1b0e-2d5a-4c8e-9a57-0b1f2c3d4e5f}",
            "name": "svc1",
            "domain": "svc1.local",
            "port": 8080,
            "version": "1.0.0",
            "prefix": "/svc1"
        }))
        .unwrap()
    }

    #[test]
    fn request_serializes_flat_wire_body() {
        let request = RegistrationRequest::from_config(&config()).unwrap();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "guid": "{6f1c1b0e-2d5a-4c8e-9a57-0b1f2c3d4e5f}",
                "name": "svc1",
                "version": "1.0.0",
                "prefix": "/svc1",
                "hostname": "localhost",
                "port": 8080
            })
        );
    }

    #[test]
    fn request_construction_fails_on_bad_guid() {
        let mut config = config();
        config.guid = "not-a-uuid".to_string();
        assert!(RegistrationRequest::from_config(&config).is_err());
    }

    #[test]
    fn every_guid_the_schema_accepts_builds_a_request() {
        let validator = crate::validation::ConfigValidator::new().unwrap();
        for guid in [
            "{6f1c1b0e-2d5a-4c8e-9a57-0b1f2c3d4e5f}",
            "6F1C1B0E-2D5A-4C8E-9A57-0B1F2C3D4E5F",
            "{6f1c1b0e-2d5a-4c8e-9a57-0b1f2c3d4e5f",
            "6f1c1b0e-2d5a-4c8e-9a57-0b1f2c3d4e5f}",
        ] {
            let raw = json!({
                "guid": guid,
                "name": "svc1",
                "domain": "svc1.local",
                "port": 8080,
                "version": "1.0.0"
            });
            let accepted = validator.validate(&raw);
            let buildable = RegistrationRequest::from_config(&AppConfig::from_value(raw).unwrap()).is_ok();
            assert_eq!(accepted, buildable, "validator and request builder disagree on {}", guid);
        }
    }

    #[test]
    fn only_registry_descriptors_become_candidates() {
        let descriptor = ServiceDescriptor {
            kind: "cache".to_string(),
            hostname: "c1".to_string(),
            port: 6379,
            priority: 10,
            name: None,
        };
        assert!(RegistryCandidate::from_descriptor(&descriptor).is_none());

        let descriptor = ServiceDescriptor {
            kind: "registry".to_string(),
            ..descriptor
        };
        let candidate = RegistryCandidate::from_descriptor(&descriptor).unwrap();
        assert_eq!(candidate.endpoint, ServiceEndpoint::new("c1", 6379));
        assert_eq!(candidate.priority, 10);
    }

    #[test]
    fn only_connection_failures_are_retryable() {
        assert!(RegistrationOutcome::ConnectionFailed("refused".into()).is_retryable());
        assert!(!RegistrationOutcome::Success.is_retryable());
        assert!(!RegistrationOutcome::Rejected { status: 409, body: String::new() }.is_retryable());
        assert!(!RegistrationOutcome::UnknownError("boom".into()).is_retryable());
    }
}
