//! The batch run: configuration in, themes document out.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use wms_protocol::Fetcher;

use crate::config::ThemesConfig;
use crate::groups::{GroupRecord, GroupTreeBuilder};
use crate::theme::{AssemblerOptions, ThemeAssembler, ThemeRecord};
use crate::thumbnail;

/// Where the run looks things up and writes thumbnails to.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Base for service URLs given as a path.
    pub host_url: String,
    /// Root of the client assets.
    pub assets_dir: PathBuf,
    /// Directory of the configuration file.
    pub config_dir: PathBuf,
}

/// The generated `themes.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemesDocument {
    pub themes: ThemesCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemesCollection {
    pub title: String,
    pub subdirs: Vec<GroupRecord>,
    pub items: Vec<ThemeRecord>,
    pub default_theme: Option<String>,
    pub default_map_crs: String,
    pub default_scales: Vec<u64>,
    pub default_print_scales: Option<Vec<u64>>,
    pub default_print_resolutions: Option<Vec<u32>>,
    pub default_print_grid: Option<Value>,
    pub default_search_providers: Option<Value>,
    pub default_background_layers: Option<Value>,
    pub background_layers: Vec<Map<String, Value>>,
    pub external_layers: Vec<Value>,
    pub theme_info_links: Option<Value>,
    pub plugin_data: Option<Value>,
}

impl ThemesDocument {
    /// Number of themes that were assembled and of error stubs.
    pub fn summary(&self) -> (usize, usize) {
        let mut themes: Vec<&ThemeRecord> = self.themes.items.iter().collect();
        for subdir in &self.themes.subdirs {
            themes.extend(subdir.themes());
        }
        let errors = themes.iter().filter(|theme| theme.is_error()).count();
        (themes.len() - errors, errors)
    }
}

/// Generate the themes document for `config`.
///
/// Individual themes that fail end up as error stubs; the run itself
/// always produces a document.
pub async fn generate(
    config: &ThemesConfig,
    fetcher: &dyn Fetcher,
    options: &GeneratorOptions,
) -> ThemesDocument {
    let assembler_options = AssemblerOptions {
        host_url: options.host_url.clone(),
        assets_dir: options.assets_dir.clone(),
        config_dir: options.config_dir.clone(),
        default_wms_version: config.default_wms_version.clone(),
        default_map_crs: config.default_map_crs.clone(),
    };

    let background_layers = config
        .themes
        .background_layers
        .iter()
        .map(|layer| resolve_background_thumbnail(layer, options))
        .collect();

    let mut builder = GroupTreeBuilder::new(ThemeAssembler::new(fetcher, &assembler_options));
    let root = builder.build(&config.themes.group, None).await;
    let default_theme = builder.default_theme().map(str::to_string);
    info!(
        default_theme = default_theme.as_deref().unwrap_or("<none>"),
        "Generated theme tree"
    );

    ThemesDocument {
        themes: ThemesCollection {
            title: "root".to_string(),
            subdirs: root.subdirs,
            items: root.items,
            default_theme,
            default_map_crs: config.default_map_crs.clone(),
            default_scales: config.default_scales.clone(),
            default_print_scales: config.default_print_scales.clone(),
            default_print_resolutions: config.default_print_resolutions.clone(),
            default_print_grid: config.default_print_grid.clone(),
            default_search_providers: config.default_search_providers.clone(),
            default_background_layers: config.default_background_layers.clone(),
            background_layers,
            external_layers: config.themes.external_layers.clone(),
            theme_info_links: config.theme_info_links.clone(),
            plugin_data: config.plugin_data.clone(),
        },
    }
}

/// Catalog entry with its `thumbnail` pointing at an existing asset or the
/// default image.
fn resolve_background_thumbnail(
    layer: &Map<String, Value>,
    options: &GeneratorOptions,
) -> Map<String, Value> {
    let mut layer = layer.clone();
    let file = layer
        .get("thumbnail")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let resolved = thumbnail::resolve_existing(&options.assets_dir, file);
    layer.insert("thumbnail".to_string(), Value::String(resolved));
    layer
}
