use serde::{Deserialize, Serialize};

/// Tag a `services` entry must carry to be considered as a registry target.
pub const REGISTRY_SERVICE_TYPE: &str = "registry";

/// One entry of the `services` list: an external service this process knows about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub name: Option<String>,
}

impl ServiceDescriptor {
    pub fn is_registry(&self) -> bool {
        self.kind == REGISTRY_SERVICE_TYPE
    }
}
