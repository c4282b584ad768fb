use axum_server::Handle;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use common::config::{AppConfig, ConfigHandle};
use common::service_discovery::CatalogLookup;
use common::service_register_center::{
    select_registry, service_register_center, RegistrationDriver, RegistrationTask, ServiceRegister,
    REGISTRATION_RETRY_DELAY,
};
use common::validation::{ConfigValidator, SchemaProvider};
use common::{Error, Result};

use crate::router::{check_prefix, normalize_prefix, RouteManifest, RouteProvider, RouterBuilder};

/// How long in-flight requests may finish after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A validated service, ready to start.
pub struct ServiceHost {
    config: ConfigHandle,
    schemas: Arc<ConfigValidator>,
    routes: RouteManifest,
    registry: Option<Arc<dyn ServiceRegister>>,
    retry_delay: Duration,
}

impl ServiceHost {
    /// Validates the raw configuration tree and prepares the host.
    ///
    /// Any schema violation fails with [`Error::ConfigurationInvalid`]; nothing
    /// is bound or contacted in that case.
    pub fn from_value(
        raw: Value,
        schemas: &dyn SchemaProvider,
        routes: &dyn RouteProvider,
    ) -> Result<Self> {
        let validator = ConfigValidator::with_provider(schemas)?;
        if !validator.validate(&raw) {
            return Err(Error::ConfigurationInvalid(
                "configuration does not satisfy the service schema".to_string(),
            ));
        }
        let config = AppConfig::from_value(raw)?;
        if let Some(prefix) = normalize_prefix(&config.prefix) {
            check_prefix(&prefix).map_err(|e| Error::ConfigurationInvalid(e.to_string()))?;
        }
        info!(
            "Configuration accepted: {} {} ({} schemas)",
            config.name,
            config.version,
            validator.schema_count()
        );

        Ok(Self {
            config: ConfigHandle::new(config),
            schemas: Arc::new(validator),
            routes: RouteManifest::from(routes.routes()),
            registry: None,
            retry_delay: REGISTRATION_RETRY_DELAY,
        })
    }

    /// Uses `registry` instead of the default catalog client.
    pub fn with_registry(mut self, registry: Arc<dyn ServiceRegister>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Starts the transport, mounts routes, then kicks off self-registration.
    ///
    /// Returns once the listener is bound. Registration runs in the background
    /// and never delays or fails startup.
    pub async fn start(self) -> Result<RunningService> {
        let config = self.config.current();
        let registry = if config.self_registry {
            match self.registry {
                Some(registry) => Some(registry),
                None => Some(service_register_center()?),
            }
        } else {
            None
        };

        // 挂载路由
        let app = RouterBuilder::new(self.config.clone(), self.schemas.clone())?
            .mount(&self.routes)?
            .build();

        // 启动传输层
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let handle = Handle::new();
        let server_handle = handle.clone();
        let server = tokio::spawn(async move {
            axum_server::bind(addr)
                .handle(server_handle)
                .serve(app.into_make_service())
                .await
        });

        let local_addr = match handle.listening().await {
            Some(local_addr) => local_addr,
            None => {
                return Err(match server.await {
                    Ok(Err(e)) => Error::IO(e),
                    Ok(Ok(())) => Error::Internal("server stopped before listening".to_string()),
                    Err(e) => Error::Internal(format!("server task failed: {}", e)),
                })
            }
        };
        info!("{} listening on {}", config.name, local_addr);

        let target = select_registry(&config.services);

        // 服务自注册，不阻塞启动
        let registration = match registry {
            Some(registry) => Some(
                RegistrationDriver::new(registry, self.config.clone(), target.clone())
                    .with_retry_delay(self.retry_delay)
                    .spawn(),
            ),
            None => {
                info!("Self-registration disabled");
                None
            }
        };

        let lookup = match &target {
            Some(candidate) => Some(CatalogLookup::new(candidate)?),
            None => {
                if !config.self_registry {
                    warn!("No registry service configured, running without registry integration");
                }
                None
            }
        };

        Ok(RunningService {
            local_addr,
            handle,
            server,
            registration,
            lookup,
            config: self.config,
        })
    }
}

/// A started service.
pub struct RunningService {
    local_addr: SocketAddr,
    handle: Handle,
    server: JoinHandle<std::io::Result<()>>,
    registration: Option<RegistrationTask>,
    lookup: Option<CatalogLookup>,
    config: ConfigHandle,
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registration(&self) -> Option<&RegistrationTask> {
        self.registration.as_ref()
    }

    pub fn registration_mut(&mut self) -> Option<&mut RegistrationTask> {
        self.registration.as_mut()
    }

    /// Catalog lookup client for the selected registry, if any.
    pub fn lookup(&self) -> Option<&CatalogLookup> {
        self.lookup.as_ref()
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Stops pending registration attempts and drains the server.
    pub async fn shutdown(self) -> Result<()> {
        if let Some(registration) = &self.registration {
            registration.abort();
        }
        info!("Shutting down {}", self.config.current().name);
        self.handle.graceful_shutdown(Some(SHUTDOWN_GRACE));

        match self.server.await {
            Ok(result) => result.map_err(Error::from),
            Err(e) => Err(Error::Internal(format!("server task failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use common::service_register_center::{RegistrationState, Resolution};
    use common::validation::StaticSchemaProvider;
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::context::RequestContext;

    const GUID: &str = "{6f1c2a9e-3b4d-4e5f-8a7b-9c0d1e2f3a4b}";

    fn raw(self_registry: bool, services: Value) -> Value {
        json!({
            "guid": GUID,
            "name": "svc1",
            "domain": "svc1.local",
            "port": 0,
            "version": "1.0.0",
            "hostname": "127.0.0.1",
            "prefix": "/svc1",
            "self-registry": self_registry,
            "services": services,
        })
    }

    fn routes() -> RouteManifest {
        RouteManifest::new().route(Method::GET, "/hello", |ctx: RequestContext, _req| async move {
            format!("hello from {}", ctx.identity.name)
        })
    }

    fn host(raw: Value) -> Result<ServiceHost> {
        ServiceHost::from_value(raw, &StaticSchemaProvider::new(), &routes())
    }

    fn url(service: &RunningService, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", service.local_addr().port(), path)
    }

    #[test]
    fn missing_guid_fails_construction() {
        let mut value = raw(false, json!([]));
        value.as_object_mut().unwrap().remove("guid");
        assert!(matches!(host(value), Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn short_name_fails_construction() {
        let mut value = raw(false, json!([]));
        value["name"] = json!("ab");
        assert!(matches!(host(value), Err(Error::ConfigurationInvalid(_))));
    }

    #[test]
    fn unmountable_prefix_fails_construction() {
        for prefix in ["/:v1", "/{*rest}", "/a{"] {
            let mut value = raw(false, json!([]));
            value["prefix"] = json!(prefix);
            assert!(
                matches!(host(value), Err(Error::ConfigurationInvalid(_))),
                "{}",
                prefix
            );
        }
    }

    #[tokio::test]
    async fn serves_prefixed_routes_and_health() {
        let service = host(raw(false, json!([]))).unwrap().start().await.unwrap();
        assert!(service.registration().is_none());
        assert!(service.lookup().is_none());
        assert_eq!(service.config().current().prefix, "/svc1");

        let hello = reqwest::get(url(&service, "/svc1/hello")).await.unwrap();
        assert_eq!(hello.status(), 200);
        assert_eq!(hello.text().await.unwrap(), "hello from svc1");

        let health = reqwest::get(url(&service, "/health")).await.unwrap();
        assert_eq!(health.status(), 200);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn registers_with_highest_priority_registry() {
        let low = MockServer::start_async().await;
        let high = MockServer::start_async().await;
        let low_mock = low
            .mock_async(|when, then| {
                when.method(POST).path("/v1/catalog/register");
                then.status(200);
            })
            .await;
        let high_mock = high
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/catalog/register")
                    .json_body(json!({
                        "guid": GUID,
                        "name": "svc1",
                        "version": "1.0.0",
                        "prefix": "/svc1",
                        "hostname": "127.0.0.1",
                        "port": 0,
                    }));
                then.status(200);
            })
            .await;

        let services = json!([
            {"type": "registry", "hostname": "127.0.0.1", "port": low.port(), "priority": 1},
            {"type": "database", "hostname": "127.0.0.1", "port": 5432, "priority": 99},
            {"type": "registry", "hostname": "127.0.0.1", "port": high.port(), "priority": 5},
        ]);
        let mut service = host(raw(true, services)).unwrap().start().await.unwrap();

        let resolution = service.registration_mut().unwrap().resolved().await;
        assert_eq!(resolution, Some(Resolution::Registered));
        high_mock.assert_async().await;
        assert_eq!(low_mock.hits_async().await, 0);
        assert_eq!(service.lookup().unwrap().registry().port, high.port());

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn startup_does_not_wait_for_unreachable_registry() {
        // 保留端口后立即释放，保证连接被拒绝
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let services = json!([{"type": "registry", "hostname": "127.0.0.1", "port": port, "priority": 1}]);
        let service = host(raw(true, services)).unwrap().start().await.unwrap();

        let health = reqwest::get(url(&service, "/health")).await.unwrap();
        assert_eq!(health.status(), 200);

        let mut state = service.registration().unwrap().subscribe();
        let scheduled = state
            .wait_for(|s| matches!(s, RegistrationState::ScheduledRetry { .. }))
            .await
            .unwrap()
            .clone();
        assert_eq!(scheduled, RegistrationState::ScheduledRetry { attempt: 1 });

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_registration_leaves_service_running() {
        let registry = MockServer::start_async().await;
        let mock = registry
            .mock_async(|when, then| {
                when.method(POST).path("/v1/catalog/register");
                then.status(409).body("guid already registered");
            })
            .await;
        let services = json!([{"type": "registry", "hostname": "127.0.0.1", "port": registry.port()}]);
        let mut service = host(raw(true, services)).unwrap().start().await.unwrap();

        let resolution = service.registration_mut().unwrap().resolved().await;
        assert_eq!(resolution, Some(Resolution::Rejected));
        mock.assert_hits_async(1).await;

        let hello = reqwest::get(url(&service, "/svc1/hello")).await.unwrap();
        assert_eq!(hello.status(), 200);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn self_registration_without_registry_is_disabled() {
        let services = json!([{"type": "cache", "hostname": "127.0.0.1", "port": 6379}]);
        let mut service = host(raw(true, services)).unwrap().start().await.unwrap();

        let resolution = service.registration_mut().unwrap().resolved().await;
        assert_eq!(resolution, Some(Resolution::Disabled));
        assert!(service.lookup().is_none());

        service.shutdown().await.unwrap();
    }
}
