//! Print layouts from the `ComposerTemplates` section of GetProjectSettings.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;
use wms_protocol::{CapabilityDocument, Element};

/// Suffix of a layout that holds the legend for the layout of the same
/// base name.
const LEGEND_SUFFIX: &str = "_legend";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<PrintMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atlas_coverage_layer: Option<String>,
    #[serde(rename = "atlas_pk", skip_serializing_if = "Option::is_none")]
    pub atlas_pk: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

/// The map frame of a print layout, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintMap {
    pub name: String,
    pub width: f64,
    pub height: f64,
}

/// Per-theme print settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintOptions<'a> {
    /// Label item names hidden from the client.
    pub label_blacklist: &'a [String],
    /// Layout preselected in the print dialog.
    pub default_layout: Option<&'a str>,
}

/// Print layouts, deduplicated by name.
///
/// A duplicate name keeps the position of its first occurrence and the
/// content of its last. `<name>_legend` layouts are folded into `<name>`
/// as its legend layout when `<name>` exists.
pub fn print_templates(doc: &CapabilityDocument, options: PrintOptions<'_>) -> Vec<PrintTemplate> {
    let Some(section) = doc.root().find("Capability/ComposerTemplates") else {
        return Vec::new();
    };

    let mut layouts: IndexMap<String, &Element> = IndexMap::new();
    for template in section.children_named("ComposerTemplate") {
        let name = template.attr("name").unwrap_or_default().to_string();
        layouts.insert(name, template);
    }

    layouts
        .iter()
        .filter(|(name, _)| !is_folded_legend(name, &layouts))
        .map(|(name, template)| {
            let legend_name = format!("{}{}", name, LEGEND_SUFFIX);
            let legend_layout = layouts.contains_key(&legend_name).then_some(legend_name);
            print_template(doc, name, template, legend_layout, options)
        })
        .collect()
}

fn is_folded_legend(name: &str, layouts: &IndexMap<String, &Element>) -> bool {
    name.strip_suffix(LEGEND_SUFFIX)
        .map_or(false, |base| layouts.contains_key(base))
}

fn print_template(
    doc: &CapabilityDocument,
    name: &str,
    template: &Element,
    legend_layout: Option<String>,
    options: PrintOptions<'_>,
) -> PrintTemplate {
    // first map frame only
    let map = template.child("ComposerMap").map(|map| PrintMap {
        name: map.attr("name").unwrap_or_default().to_string(),
        width: dimension_mm(map, "width"),
        height: dimension_mm(map, "height"),
    });

    let labels: Vec<String> = template
        .children_named("ComposerLabel")
        .filter_map(|label| label.attr("name"))
        .filter(|label| !options.label_blacklist.iter().any(|b| b == label))
        .map(str::to_string)
        .collect();

    let (atlas_coverage_layer, atlas_pk) = match atlas(doc, name, template) {
        Some((layer, pk)) => (Some(layer), Some(pk)),
        None => (None, None),
    };

    PrintTemplate {
        name: name.to_string(),
        map,
        labels: if labels.is_empty() { None } else { Some(labels) },
        legend_layout,
        atlas_coverage_layer,
        atlas_pk,
        default: options.default_layout == Some(name),
    }
}

fn dimension_mm(map: &Element, attr: &str) -> f64 {
    map.attr(attr)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0.0)
}

/// Coverage layer and its primary key attribute for an atlas layout.
fn atlas(doc: &CapabilityDocument, name: &str, template: &Element) -> Option<(String, String)> {
    if !template.flag("atlasEnabled").unwrap_or(false) {
        return None;
    }
    let coverage = template.attr("atlasCoverageLayer").unwrap_or_default();
    let pk = doc
        .find_layer(coverage)
        .and_then(|layer| layer.non_empty_value("PrimaryKey/PrimaryKeyAttribute"));
    match pk {
        Some(pk) => Some((coverage.to_string(), pk.to_string())),
        None => {
            warn!(
                template = %name,
                coverage_layer = %coverage,
                "Failed to determine primary key for atlas coverage layer"
            );
            None
        }
    }
}
