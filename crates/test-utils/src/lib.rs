//! Shared test utilities for the qwc-themes workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Sample GetProjectSettings documents
//! - A scripted in-memory [`wms_protocol::Fetcher`]
//! - Temporary asset directories for thumbnail tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, MockFetcher, TempAssets};
//! ```

pub mod assets;
pub mod fetcher;
pub mod fixtures;

pub use assets::TempAssets;
pub use fetcher::{MockFetcher, RecordedCall};
