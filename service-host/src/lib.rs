pub mod context;
pub mod controllers;
pub mod host;
pub mod router;

pub use context::RequestContext;
pub use host::{RunningService, ServiceHost};
pub use router::{RouteDescriptor, RouteManifest, RouteProvider, RouterBuilder};
