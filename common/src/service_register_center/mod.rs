// 导入标准库和必要的依赖
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

// 声明子模块
pub mod catalog;
pub mod retry;
pub mod selector;
pub mod typos;

// 导入类型定义
pub use crate::service_register_center::catalog::Catalog;
pub use crate::service_register_center::retry::{
    RegistrationDriver, RegistrationState, RegistrationTask, Resolution, REGISTRATION_RETRY_DELAY,
};
pub use crate::service_register_center::selector::select_registry;
pub use crate::service_register_center::typos::{
    RegistrationOutcome, RegistrationRequest, RegistryCandidate, ServiceEndpoint, ServiceIdentity,
};

/// Client side of registry self-registration.
///
/// Implementations perform exactly one attempt per call and never fail: every
/// result, including transport errors, is folded into a
/// [`RegistrationOutcome`] so the retry driver can decide what to do next.
#[async_trait]
pub trait ServiceRegister: Send + Sync + Debug {
    /// Announces `request` to the registry at `target`.
    async fn register(
        &self,
        target: &RegistryCandidate,
        request: &RegistrationRequest,
    ) -> RegistrationOutcome;
}

/// Creates the default registry client.
pub fn service_register_center() -> Result<Arc<dyn ServiceRegister>> {
    Ok(Arc::new(Catalog::new()?))
}
