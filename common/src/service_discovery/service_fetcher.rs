// 导入必要的依赖
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service_register_center::typos::ServiceEndpoint;
use crate::Result;

/// An entry as returned by a registry catalog lookup.
///
/// Mirrors the registration wire body; fields a registry leaves out fall back
/// to their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    #[serde(default)]
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub prefix: String,
    pub hostname: String,
    pub port: u16,
}

impl CatalogEntry {
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(self.hostname.clone(), self.port)
    }
}

/// 服务获取器特征
///
/// 定义了从服务注册中心获取服务信息的接口
#[async_trait]
pub trait ServiceFetcher: Send + Sync {
    /// All registered instances of the service called `service_name`.
    async fn fetch(&self, service_name: &str) -> Result<Vec<CatalogEntry>>;
}
