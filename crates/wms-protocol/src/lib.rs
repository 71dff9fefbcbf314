//! OGC WMS protocol support for reading QGIS Server capabilities.
//!
//! Supports:
//! - WMS 1.3.0 GetCapabilities / GetProjectSettings documents
//! - Request URL construction for GetProjectSettings and GetMap
//! - Fetching documents over HTTP behind the [`Fetcher`] trait

pub mod capabilities;
pub mod client;
pub mod error;
pub mod request;

pub use capabilities::{CapabilityDocument, Element};
pub use client::{Fetcher, HttpFetcher};
pub use error::{CapabilityError, CapabilityResult};
pub use request::{
    normalize_endpoint, project_settings_url, resolve_service_url, service_name,
    with_query_params, GetMapRequest, WMS_VERSION,
};
