//! QWC2 Themes Generator Library
//!
//! This crate turns a themes configuration plus the GetProjectSettings
//! responses of the configured QGIS Server projects into the `themes.json`
//! document read by the QWC2 web client.

pub mod config;
pub mod error;
pub mod generator;
pub mod groups;
pub mod ids;
pub mod layer_tree;
pub mod print;
pub mod theme;
pub mod thumbnail;

pub use config::{SourceConfig, SourceGroup, ThemesConfig};
pub use error::{ThemesError, ThemesResult};
pub use generator::{generate, GeneratorOptions, ThemesDocument};
pub use groups::{GroupRecord, GroupTreeBuilder};
pub use ids::ThemeIdAllocator;
pub use layer_tree::{LayerNode, LayerTreeBuilder, LayerTreeContext, LayerTreeOptions};
pub use theme::{AssemblerOptions, ThemeAssembler, ThemeRecord};
