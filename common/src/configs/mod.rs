mod log_config;
mod service_config;

pub use log_config::*;
pub use service_config::*;
