//! Themes configuration loading.
//!
//! The configuration file lists the map services to publish, grouped the
//! way they should appear in the client's theme switcher, plus the
//! defaults every theme falls back to. JSON is the usual format; files
//! ending in `.yaml`/`.yml` are read as YAML with the same schema.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use wms_common::Credentials;

use crate::error::{ThemesError, ThemesResult};

/// Root of the themes configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemesConfig {
    pub default_scales: Vec<u64>,
    pub default_print_scales: Option<Vec<u64>>,
    pub default_print_resolutions: Option<Vec<u32>>,
    pub default_print_grid: Option<Value>,
    #[serde(rename = "defaultWMSVersion", default = "default_wms_version")]
    pub default_wms_version: String,
    #[serde(default = "default_map_crs")]
    pub default_map_crs: String,
    pub default_search_providers: Option<Value>,
    pub default_background_layers: Option<Value>,
    pub theme_info_links: Option<Value>,
    pub plugin_data: Option<Value>,
    pub themes: ThemesRoot,
}

fn default_wms_version() -> String {
    wms_protocol::WMS_VERSION.to_string()
}

fn default_map_crs() -> String {
    "EPSG:3857".to_string()
}

impl ThemesConfig {
    /// Load from a JSON or YAML file, chosen by extension.
    pub fn load(path: &Path) -> ThemesResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ThemesError::config(path, e))?;
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            Self::from_yaml_str(&contents).map_err(|e| ThemesError::config(path, e))?
        } else {
            Self::from_json_str(&contents).map_err(|e| ThemesError::config(path, e))?
        };
        debug!(
            path = %path.display(),
            sources = config.themes.group.source_count(),
            "Loaded themes configuration"
        );
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }
}

/// The `themes` block: the root group plus the shared layer catalogs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemesRoot {
    #[serde(flatten)]
    pub group: SourceGroup,
    /// Background layer definitions, passed through to the client.
    #[serde(default)]
    pub background_layers: Vec<Map<String, Value>>,
    /// External layer definitions, passed through to the client.
    #[serde(default)]
    pub external_layers: Vec<Value>,
}

/// A named group of sources and nested groups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceGroup {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<SourceConfig>,
    #[serde(default)]
    pub groups: Vec<SourceGroup>,
}

impl SourceGroup {
    /// Number of sources in this group and all nested groups.
    pub fn source_count(&self) -> usize {
        self.items.len() + self.groups.iter().map(SourceGroup::source_count).sum::<usize>()
    }
}

/// One configured map service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub url: String,
    pub wms_basic_auth: Option<Credentials>,

    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub attribution: Option<String>,
    pub attribution_url: Option<String>,
    #[serde(default)]
    pub default: bool,

    pub scales: Option<Vec<u64>>,
    pub print_scales: Option<Vec<u64>>,
    pub print_resolutions: Option<Vec<u32>>,
    pub print_grid: Option<Value>,
    pub extent: Option<[f64; 4]>,
    pub tiled: Option<bool>,
    pub format: Option<String>,
    pub version: Option<String>,
    pub map_crs: Option<String>,
    pub additional_mouse_crs: Option<Vec<String>>,
    pub search_providers: Option<Value>,

    #[serde(default)]
    pub background_layers: Vec<BackgroundLayerRef>,
    #[serde(default)]
    pub external_layers: Vec<ExternalLayer>,
    /// Layer name to feature report template name.
    #[serde(default)]
    pub feature_report: HashMap<String, String>,

    #[serde(default)]
    pub print_label_blacklist: Vec<String>,
    pub default_print_layout: Option<String>,
    pub print_label_for_search_result: Option<String>,
    pub print_label_for_attribution: Option<String>,
    pub print_label_config: Option<Value>,
    pub watermark: Option<Value>,

    /// Groups at or below this tree level start collapsed. Negative or
    /// absent means every group starts expanded.
    pub collapse_layer_groups_below_level: Option<i32>,
    pub skip_empty_feature_attributes: Option<bool>,
    pub map_tips: Option<bool>,
    pub min_search_scale_denom: Option<u64>,
    pub config: Option<Value>,
    pub flags: Option<Value>,
    pub edit_config: Option<EditConfigSource>,

    pub legend_url: Option<String>,
    pub feature_info_url: Option<String>,
    pub print_url: Option<String>,
    pub extra_legend_parameters: Option<String>,
    pub extra_dxf_parameters: Option<String>,
    pub extra_print_parameters: Option<String>,

    pub theme_info_links: Option<Value>,
    pub plugin_data: Option<Value>,
}

/// Reference from a theme to an entry of the background layer catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundLayerRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_layer: Option<PrintLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Layer of the theme's own project used in place of a background layer
/// when printing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrintLayer {
    Name(String),
    ByScale(Vec<ScaledPrintLayer>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledPrintLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<u64>,
    pub name: String,
}

impl PrintLayer {
    /// Every project layer name this reference may print with.
    pub fn names(&self) -> Vec<&str> {
        match self {
            PrintLayer::Name(name) => vec![name.as_str()],
            PrintLayer::ByScale(layers) => layers.iter().map(|l| l.name.as_str()).collect(),
        }
    }
}

/// Link between an external layer definition and the internal layer it
/// replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLayer {
    pub name: String,
    pub internal_layer: String,
}

/// Edit form configuration, given inline or as a file path relative to the
/// configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EditConfigSource {
    File(String),
    Inline(Value),
}

impl EditConfigSource {
    /// The edit configuration, or `None` when a referenced file is missing
    /// or not valid JSON.
    pub fn resolve(&self, base_dir: &Path) -> Option<Value> {
        match self {
            EditConfigSource::Inline(value) => Some(value.clone()),
            EditConfigSource::File(relative) => {
                let path = base_dir.join(relative);
                let parsed = fs::read_to_string(&path)
                    .map_err(ThemesError::from)
                    .and_then(|contents| serde_json::from_str(&contents).map_err(ThemesError::from));
                match parsed {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Could not read edit config");
                        None
                    }
                }
            }
        }
    }
}
