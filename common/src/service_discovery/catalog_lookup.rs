use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::service_discovery::service_fetcher::{CatalogEntry, ServiceFetcher};
use crate::service_register_center::typos::{RegistryCandidate, ServiceEndpoint};
use crate::{Error, Result};

/// Path prefix of the catalog lookup endpoint; the service name follows.
pub const CATALOG_SERVICE_PATH: &str = "/v1/catalog/service";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves other services through the selected registry.
///
/// Built from the same selection result as self-registration but used only
/// for consuming services, never for announcing this one.
#[derive(Debug, Clone)]
pub struct CatalogLookup {
    client: Client,
    registry: ServiceEndpoint,
}

impl CatalogLookup {
    pub fn new(registry: &RegistryCandidate) -> Result<Self> {
        let client = Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            registry: registry.endpoint.clone(),
        })
    }

    pub fn registry(&self) -> &ServiceEndpoint {
        &self.registry
    }

    /// Convenience wrapper over [`ServiceFetcher::fetch`] returning only addresses.
    pub async fn endpoints(&self, service_name: &str) -> Result<Vec<ServiceEndpoint>> {
        let entries = self.fetch(service_name).await?;
        Ok(entries.iter().map(CatalogEntry::endpoint).collect())
    }
}

#[async_trait]
impl ServiceFetcher for CatalogLookup {
    async fn fetch(&self, service_name: &str) -> Result<Vec<CatalogEntry>> {
        let url = self
            .registry
            .url(&format!("{}/{}", CATALOG_SERVICE_PATH, service_name));

        debug!("Looking up service {} at {}", service_name, url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(service_name.to_string()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Failed to look up service {}: HTTP {}: {}", service_name, status, error_text);
            return Err(Error::Internal(format!("HTTP {}: {}", status, error_text)));
        }

        let entries: Vec<CatalogEntry> = response.json().await?;

        if entries.is_empty() {
            debug!("No instances registered for service: {}", service_name);
        } else {
            info!("Found {} instance(s) of service: {}", entries.len(), service_name);
        }

        Ok(entries)
    }
}
