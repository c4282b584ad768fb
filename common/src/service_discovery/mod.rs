pub mod catalog_lookup;
pub mod service_fetcher;

pub use catalog_lookup::CatalogLookup;
pub use service_fetcher::{CatalogEntry, ServiceFetcher};
