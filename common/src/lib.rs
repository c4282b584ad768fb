pub mod config;
pub mod configs;
pub mod error;
pub mod logging;
pub mod service;
pub mod service_discovery;
pub mod service_register_center;
pub mod validation;

pub use error::{Error, Result};
