//! Normalization of the WMS layer hierarchy into the client's layer tree.
//!
//! QGIS Server reports every layer of a project, including attribute-only
//! tables and layers that only exist to be printed underneath a background
//! map. Those are dropped here, and groups left without children go with
//! them.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;
use wms_common::GeoBbox;
use wms_protocol::Element;

use crate::config::ExternalLayer;

/// Geometry types QGIS reports for layers without geometry.
const NON_SPATIAL_GEOMETRY_TYPES: [&str; 2] = ["WKBNoGeometry", "NoGeometry"];

/// Data URL prefixes marking a layer as a placeholder for an external layer.
const EXTERNAL_LAYER_PREFIXES: [&str; 2] = ["wms:", "wmts:"];

/// Name of the default style, preferred over declaration order.
const DEFAULT_STYLE: &str = "default";

/// Attribution block, serialized as `{"Title": ..., "OnlineResource": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attribution {
    pub title: String,
    pub online_resource: String,
}

/// One entry of the layer tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerNode {
    pub name: String,
    pub title: String,
    #[serde(flatten)]
    pub kind: LayerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayerKind {
    Leaf(LeafLayer),
    Group(GroupLayer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafLayer {
    pub visibility: bool,
    pub queryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Style name to style title, in declaration order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub opacity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scale: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<GeoBbox>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_report: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLayer {
    pub mutually_exclusive: bool,
    pub visibility: bool,
    pub expanded: bool,
    pub sublayers: Vec<LayerNode>,
}

/// A WMS dimension (usually time) declared on a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub units: String,
    pub name: String,
    pub multiple: bool,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_field_name: Option<String>,
}

impl LayerNode {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, LayerKind::Group(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafLayer> {
        match &self.kind {
            LayerKind::Leaf(leaf) => Some(leaf),
            LayerKind::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupLayer> {
        match &self.kind {
            LayerKind::Group(group) => Some(group),
            LayerKind::Leaf(_) => None,
        }
    }

    /// Children of a group; leaves have none.
    pub fn sublayers(&self) -> &[LayerNode] {
        match &self.kind {
            LayerKind::Group(group) => &group.sublayers,
            LayerKind::Leaf(_) => &[],
        }
    }

    pub fn into_sublayers(self) -> Vec<LayerNode> {
        match self.kind {
            LayerKind::Group(group) => group.sublayers,
            LayerKind::Leaf(_) => Vec::new(),
        }
    }

    /// Depth-first search for a node by name, including this one.
    pub fn find(&self, name: &str) -> Option<&LayerNode> {
        if self.name == name {
            return Some(self);
        }
        self.sublayers().iter().find_map(|child| child.find(name))
    }
}

/// Settings for one tree walk, taken from the source configuration.
#[derive(Debug, Clone, Default)]
pub struct LayerTreeOptions {
    /// Groups at this level or deeper start collapsed (root is level 1).
    pub collapse_below_level: Option<u32>,
    /// Layers reserved for print backdrops, left out with their subtree.
    pub print_exclusions: HashSet<String>,
    /// Layer name to feature report template.
    pub feature_reports: HashMap<String, String>,
}

/// What the tree walk collects besides the tree itself.
#[derive(Debug, Default)]
pub struct LayerTreeContext {
    /// Visible leaf layers in document order (top-most first).
    pub visible_layers: Vec<String>,
    /// Tree display name to layer name, for every retained node.
    pub title_names: HashMap<String, String>,
    /// Placeholder layers pointing at external services.
    pub external_layers: Vec<ExternalLayer>,
}

impl LayerTreeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer name for a display title, or `entry` itself when no layer has
    /// that title.
    pub fn resolve_title<'a>(&'a self, entry: &'a str) -> &'a str {
        self.title_names
            .get(entry)
            .map(String::as_str)
            .unwrap_or(entry)
    }
}

/// Walks a `Layer` element hierarchy and builds [`LayerNode`]s.
pub struct LayerTreeBuilder<'a> {
    options: &'a LayerTreeOptions,
}

impl<'a> LayerTreeBuilder<'a> {
    pub fn new(options: &'a LayerTreeOptions) -> Self {
        Self { options }
    }

    /// Build the node for `layer` at tree `level`, or `None` if it is
    /// omitted.
    pub fn build(&self, layer: &Element, level: u32, ctx: &mut LayerTreeContext) -> Option<LayerNode> {
        let name = layer.value("Name").to_string();
        if self.options.print_exclusions.contains(&name) {
            return None;
        }
        let title = layer.value("Title").to_string();

        let children: Vec<&Element> = layer.children_named("Layer").collect();
        let kind = if children.is_empty() {
            LayerKind::Leaf(self.build_leaf(layer, &name, ctx)?)
        } else {
            let sublayers: Vec<LayerNode> = children
                .into_iter()
                .filter_map(|child| self.build(child, level + 1, ctx))
                .collect();
            if sublayers.is_empty() {
                return None;
            }
            LayerKind::Group(GroupLayer {
                mutually_exclusive: layer.flag("mutuallyExclusive").unwrap_or(false),
                visibility: visibility(layer),
                expanded: layer
                    .flag("expanded")
                    .unwrap_or_else(|| !self.collapsed_at(level)),
                sublayers,
            })
        };

        let tree_name = layer.non_empty_value("TreeName").unwrap_or(&title).to_string();
        ctx.title_names.insert(tree_name, name.clone());

        Some(LayerNode { name, title, kind })
    }

    fn collapsed_at(&self, level: u32) -> bool {
        self.options
            .collapse_below_level
            .map(|below| level >= below)
            .unwrap_or(false)
    }

    fn build_leaf(&self, layer: &Element, name: &str, ctx: &mut LayerTreeContext) -> Option<LeafLayer> {
        let geometry_type = layer.attr("geometryType").filter(|g| !g.is_empty());
        if geometry_type.map_or(false, |g| NON_SPATIAL_GEOMETRY_TYPES.contains(&g)) {
            return None;
        }

        let visible = visibility(layer);
        if visible {
            ctx.visible_layers.push(name.to_string());
        }

        let queryable = layer.flag("queryable").unwrap_or(false);
        let display_field = if queryable {
            layer.attr("displayField").filter(|f| !f.is_empty()).map(str::to_string)
        } else {
            None
        };

        let mut data_url = layer.online_resource("DataURL").map(str::to_string);
        if let Some(url) = data_url.as_mut() {
            if EXTERNAL_LAYER_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
                ctx.external_layers.push(ExternalLayer {
                    name: std::mem::take(url),
                    internal_layer: name.to_string(),
                });
            }
        }

        let styles: IndexMap<String, String> = layer
            .children_named("Style")
            .map(|style| (style.value("Name").to_string(), style.value("Title").to_string()))
            .collect();
        let style = default_style(&styles);

        let (min_scale, max_scale) = match (
            scale_denominator(layer, "MinScaleDenominator"),
            scale_denominator(layer, "MaxScaleDenominator"),
        ) {
            (Some(min), Some(max)) => (Some(min), Some(max)),
            _ => (None, None),
        };

        Some(LeafLayer {
            visibility: visible,
            queryable,
            display_field,
            geometry_type: geometry_type.map(str::to_string),
            attribution: attribution(layer),
            abstract_: layer.non_empty_value("Abstract").map(str::to_string),
            data_url,
            metadata_url: layer.online_resource("MetadataURL").map(str::to_string),
            keywords: keywords(layer),
            style,
            styles: if styles.is_empty() { None } else { Some(styles) },
            opacity: opacity(layer),
            min_scale,
            max_scale,
            bbox: geographic_bbox(layer),
            dimensions: layer.children_named("Dimension").map(dimension).collect(),
            feature_report: self.options.feature_reports.get(name).cloned(),
        })
    }
}

/// `visibilityChecked` wins over the plain `visible` flag.
fn visibility(layer: &Element) -> bool {
    layer
        .flag("visibilityChecked")
        .or_else(|| layer.flag("visible"))
        .unwrap_or(false)
}

/// Opacity on a 0-255 scale from either a transparency percentage or an
/// opacity fraction. Fully opaque when neither parses.
fn opacity(layer: &Element) -> u8 {
    if let Some(transparency) = parse_attr(layer, "transparency") {
        let transparent = (transparency / 100.0 * 255.0).floor();
        return (255.0 - transparent).clamp(0.0, 255.0) as u8;
    }
    if let Some(fraction) = parse_attr(layer, "opacity") {
        return (fraction * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    255
}

fn parse_attr(layer: &Element, name: &str) -> Option<f64> {
    layer.attr(name).and_then(|v| v.trim().parse().ok())
}

fn scale_denominator(layer: &Element, path: &str) -> Option<u64> {
    layer
        .non_empty_value(path)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|v| v as u64)
}

fn default_style(styles: &IndexMap<String, String>) -> Option<String> {
    if styles.contains_key(DEFAULT_STYLE) {
        return Some(DEFAULT_STYLE.to_string());
    }
    styles.keys().next().cloned()
}

fn attribution(layer: &Element) -> Option<Attribution> {
    let element = layer.child("Attribution")?;
    Some(Attribution {
        title: element.value("Title").to_string(),
        online_resource: layer
            .online_resource("Attribution")
            .unwrap_or_default()
            .to_string(),
    })
}

fn keywords(layer: &Element) -> Option<String> {
    let list = layer.child("KeywordList")?;
    Some(
        list.children_named("Keyword")
            .map(Element::text)
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// `EX_GeographicBoundingBox` as `[west, south, east, north]`, labeled
/// EPSG:4326. The CRS-specific `BoundingBox` is not used since its axis
/// order depends on the CRS under WMS 1.3.0.
pub(crate) fn geographic_bbox(layer: &Element) -> Option<GeoBbox> {
    let bbox = layer.child("EX_GeographicBoundingBox")?;
    let coord = |path: &str| bbox.value(path).trim().parse::<f64>().ok();
    Some(GeoBbox::wgs84([
        coord("westBoundLongitude")?,
        coord("southBoundLatitude")?,
        coord("eastBoundLongitude")?,
        coord("northBoundLatitude")?,
    ]))
}

fn dimension(element: &Element) -> Dimension {
    let attr = |name: &str| element.attr(name).unwrap_or_default().to_string();
    let optional = |name: &str| element.attr(name).filter(|v| !v.is_empty()).map(str::to_string);
    Dimension {
        units: attr("units"),
        name: attr("name"),
        multiple: element.flag("multipleValues").unwrap_or(false),
        value: element
            .attr("default")
            .unwrap_or_else(|| element.text())
            .to_string(),
        field_name: optional("fieldName"),
        end_field_name: optional("endFieldName"),
    }
}
