use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::service_register_center::typos::{
    RegistrationOutcome, RegistrationRequest, RegistryCandidate,
};
use crate::service_register_center::ServiceRegister;
use crate::Result;

/// Path of the registration endpoint on a catalog registry.
pub const REGISTER_PATH: &str = "/v1/catalog/register";

/// Hard deadline for a single registration attempt.
pub const REGISTRATION_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Inclusive band of statuses that count as a successful registration.
pub const SUCCESS_STATUS_MIN: u16 = 200;
pub const SUCCESS_STATUS_MAX: u16 = 304;

/// Catalog registry client speaking plain HTTP/JSON.
#[derive(Debug, Clone)]
pub struct Catalog {
    client: Client,
}

impl Catalog {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REGISTRATION_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        // 3xx 必须原样分类，不能自动跟随重定向
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

/// Maps a received status onto an outcome.
pub fn classify_status(status: u16, body: String) -> RegistrationOutcome {
    if (SUCCESS_STATUS_MIN..=SUCCESS_STATUS_MAX).contains(&status) {
        RegistrationOutcome::Success
    } else {
        RegistrationOutcome::Rejected { status, body }
    }
}

/// Maps a transport failure (no response at all) onto an outcome.
///
/// Refused connections and expired deadlines mean the registry is not
/// reachable right now; everything else is unexpected.
pub fn classify_transport_error(error: &reqwest::Error) -> RegistrationOutcome {
    if error.is_connect() || error.is_timeout() {
        RegistrationOutcome::ConnectionFailed(error.to_string())
    } else {
        RegistrationOutcome::UnknownError(error.to_string())
    }
}

#[async_trait]
impl ServiceRegister for Catalog {
    async fn register(
        &self,
        target: &RegistryCandidate,
        request: &RegistrationRequest,
    ) -> RegistrationOutcome {
        let url = target.endpoint.url(REGISTER_PATH);

        debug!(
            "Registering service: {} ({}) with {}",
            request.identity.name, request.endpoint, url
        );

        let response = match self.client.post(&url).json(request).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status().as_u16();
        // 响应体只用于诊断，读取失败不影响分类
        let body = response.text().await.unwrap_or_default();
        classify_status(status, body)
    }
}
