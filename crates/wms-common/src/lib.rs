//! Common types and utilities shared across the themes generator crates.

pub mod bbox;
pub mod credentials;
pub mod error;

pub use bbox::{BoundingBox, GeoBbox, WGS84};
pub use credentials::Credentials;
pub use error::{FetchError, FetchResult};
