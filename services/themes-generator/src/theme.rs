//! Assembly of one theme from a source configuration and the service's
//! GetProjectSettings response.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;
use wms_common::GeoBbox;
use wms_protocol::{
    normalize_endpoint, project_settings_url, resolve_service_url, service_name,
    CapabilityDocument, CapabilityError, Element, Fetcher,
};

use crate::config::{BackgroundLayerRef, ExternalLayer, SourceConfig};
use crate::error::ThemesResult;
use crate::ids::ThemeIdAllocator;
use crate::layer_tree::{
    geographic_bbox, Attribution, LayerNode, LayerTreeBuilder, LayerTreeContext, LayerTreeOptions,
};
use crate::print::{print_templates, PrintOptions, PrintTemplate};
use crate::thumbnail::{ThumbnailGenerator, ThumbnailRequest};

/// Message carried by the stub of a theme that could not be read.
pub const ERROR_MESSAGE: &str = "Could not read GetProjectSettings";

/// Keyword QGIS Server adds to every service.
const IMPLICIT_KEYWORD: &str = "infoMapAccessService";

/// Settings shared by every theme of a run.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    /// Base for service URLs given as a path.
    pub host_url: String,
    /// Root of the client assets (thumbnails live below it).
    pub assets_dir: PathBuf,
    /// Base for edit config files referenced by path.
    pub config_dir: PathBuf,
    pub default_wms_version: String,
    pub default_map_crs: String,
}

/// Service contact block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub person: String,
    pub organization: String,
    pub position: String,
    pub phone: String,
    pub email: String,
}

/// One entry of the client's theme list.
///
/// A theme that could not be read only carries `title` and `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_formats: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_formats: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<GeoBbox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_bbox: Option<GeoBbox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scales: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_scales: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_resolutions: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_grid: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sublayers: Option<Vec<LayerNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_layers: Option<Vec<ExternalLayer>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_layers: Option<Vec<BackgroundLayerRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_providers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_mouse_crs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_crs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print: Option<Vec<PrintTemplate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawing_order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_info_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_label_for_search_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_label_for_attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_label_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_empty_feature_attributes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_tips: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_search_scale_denom: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_legend_parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_dxf_parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_print_parameters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_info_links: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ThemeRecord {
    /// Placeholder for a theme whose service could not be read.
    pub fn error_stub() -> Self {
        Self {
            title: "Error".to_string(),
            error: Some(ERROR_MESSAGE.to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Builds [`ThemeRecord`]s, one source at a time.
pub struct ThemeAssembler<'a> {
    fetcher: &'a dyn Fetcher,
    options: &'a AssemblerOptions,
}

impl<'a> ThemeAssembler<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, options: &'a AssemblerOptions) -> Self {
        Self { fetcher, options }
    }

    /// Assemble the theme for `source`.
    ///
    /// Never fails: a service that cannot be fetched or parsed yields
    /// [`ThemeRecord::error_stub`], and no id is allocated for it.
    #[instrument(skip_all, fields(url = %source.url))]
    pub async fn assemble(&self, source: &SourceConfig, ids: &mut ThemeIdAllocator) -> ThemeRecord {
        match self.try_assemble(source, ids).await {
            Ok(theme) => theme,
            Err(e) => {
                warn!(error = %e, "Could not read WMS GetProjectSettings");
                ThemeRecord::error_stub()
            }
        }
    }

    async fn try_assemble(
        &self,
        source: &SourceConfig,
        ids: &mut ThemeIdAllocator,
    ) -> ThemesResult<ThemeRecord> {
        let service = resolve_service_url(&self.options.host_url, &source.url)?;
        let request_url = project_settings_url(&service);
        debug!(url = %request_url, "Requesting GetProjectSettings");

        let response = self
            .fetcher
            .fetch(&request_url, source.wms_basic_auth.as_ref())
            .await?;
        let doc = CapabilityDocument::from_bytes(&response)?;
        info!("Parsing WMS GetProjectSettings");

        let root = doc.root();
        let top_layer = doc.top_layer()?;
        let bbox = geographic_bbox(top_layer).ok_or_else(|| {
            CapabilityError::MissingElement("Capability/Layer/EX_GeographicBoundingBox".to_string())
        })?;

        let service_basename = service_name(&service);
        let id = ids.allocate(&service_basename);
        let title = source
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| root.non_empty_value("Service/Title"))
            .or_else(|| top_layer.non_empty_value("Title"))
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());

        let tree_options = layer_tree_options(source);
        let mut ctx = LayerTreeContext::new();
        let sublayers = LayerTreeBuilder::new(&tree_options)
            .build(top_layer, 1, &mut ctx)
            .map(LayerNode::into_sublayers)
            .unwrap_or_default();
        ctx.visible_layers.reverse();

        let mut external_layers = source.external_layers.clone();
        external_layers.append(&mut ctx.external_layers);

        let print = print_templates(
            &doc,
            PrintOptions {
                label_blacklist: &source.print_label_blacklist,
                default_layout: source.default_print_layout.as_deref(),
            },
        );

        let thumbnail_basename = if service_basename.is_empty() {
            id.as_str()
        } else {
            service_basename.as_str()
        };
        let thumbnail = ThumbnailGenerator::new(self.fetcher, &self.options.assets_dir)
            .resolve(&ThumbnailRequest {
                service: &service,
                credentials: source.wms_basic_auth.as_ref(),
                configured: source.thumbnail.as_deref(),
                basename: thumbnail_basename,
                top_layer,
                layers: &ctx.visible_layers,
            })
            .await;

        info!(id = %id, title = %title, layers = sublayers.len(), "Assembled theme");

        Ok(ThemeRecord {
            id: Some(id),
            name: Some(top_layer.value("Name").to_string()),
            title,
            description: source.description.clone(),
            url: Some(source.url.clone()),
            attribution: Some(Attribution {
                title: source.attribution.clone().unwrap_or_default(),
                online_resource: source.attribution_url.clone().unwrap_or_default(),
            }),
            abstract_: root.non_empty_value("Service/Abstract").map(str::to_string),
            keywords: Some(service_keywords(root)),
            online_resource: root.online_resource("Service").map(str::to_string),
            contact: contact(root),
            format: source.format.clone(),
            available_formats: Some(formats(root, "GetMap")),
            info_formats: Some(formats(root, "GetFeatureInfo")),
            tiled: source.tiled,
            version: Some(
                source
                    .version
                    .clone()
                    .unwrap_or_else(|| self.options.default_wms_version.clone()),
            ),
            initial_bbox: Some(GeoBbox::wgs84(source.extent.unwrap_or(bbox.bounds))),
            bbox: Some(bbox),
            scales: source.scales.clone(),
            print_scales: source.print_scales.clone(),
            print_resolutions: source.print_resolutions.clone(),
            print_grid: source.print_grid.clone(),
            sublayers: Some(sublayers),
            expanded: Some(true),
            external_layers: Some(external_layers),
            background_layers: Some(source.background_layers.clone()),
            search_providers: source.search_providers.clone(),
            additional_mouse_crs: source.additional_mouse_crs.clone(),
            map_crs: Some(
                source
                    .map_crs
                    .clone()
                    .unwrap_or_else(|| self.options.default_map_crs.clone()),
            ),
            print: if print.is_empty() { None } else { Some(print) },
            drawing_order: Some(drawing_order(root, &ctx)),
            legend_url: Some(endpoint(source.legend_url.as_deref(), root, "GetLegendGraphic", &service)),
            feature_info_url: Some(endpoint(
                source.feature_info_url.as_deref(),
                root,
                "GetFeatureInfo",
                &service,
            )),
            print_url: Some(endpoint(source.print_url.as_deref(), root, "GetPrint", &service)),
            print_label_for_search_result: source.print_label_for_search_result.clone(),
            print_label_for_attribution: source.print_label_for_attribution.clone(),
            print_label_config: source.print_label_config.clone(),
            watermark: source.watermark.clone(),
            skip_empty_feature_attributes: source.skip_empty_feature_attributes,
            map_tips: source.map_tips,
            min_search_scale_denom: source.min_search_scale_denom,
            config: source.config.clone(),
            flags: source.flags.clone(),
            edit_config: source
                .edit_config
                .as_ref()
                .and_then(|edit| edit.resolve(&self.options.config_dir)),
            extra_legend_parameters: source.extra_legend_parameters.clone(),
            extra_dxf_parameters: source.extra_dxf_parameters.clone(),
            extra_print_parameters: source.extra_print_parameters.clone(),
            theme_info_links: source.theme_info_links.clone(),
            plugin_data: source.plugin_data.clone(),
            thumbnail: Some(thumbnail),
            error: None,
        })
    }
}

fn layer_tree_options(source: &SourceConfig) -> LayerTreeOptions {
    LayerTreeOptions {
        collapse_below_level: source
            .collapse_layer_groups_below_level
            .and_then(|level| u32::try_from(level).ok()),
        print_exclusions: source
            .background_layers
            .iter()
            .filter_map(|layer| layer.print_layer.as_ref())
            .flat_map(|print_layer| print_layer.names())
            .map(str::to_string)
            .collect(),
        feature_reports: source.feature_report.clone(),
    }
}

/// Service keywords joined with ", ", without the implicit QGIS keyword.
fn service_keywords(root: &Element) -> String {
    root.find("Service/KeywordList")
        .map(|list| {
            list.children_named("Keyword")
                .map(Element::text)
                .filter(|keyword| *keyword != IMPLICIT_KEYWORD)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn contact(root: &Element) -> Option<Contact> {
    let info = root.find("Service/ContactInformation")?;
    Some(Contact {
        person: info.value("ContactPersonPrimary/ContactPerson").to_string(),
        organization: info.value("ContactPersonPrimary/ContactOrganization").to_string(),
        position: info.value("ContactPosition").to_string(),
        phone: info.value("ContactVoiceTelephone").to_string(),
        email: info.value("ContactElectronicMailAddress").to_string(),
    })
}

/// Output formats advertised for a request type.
fn formats(root: &Element, request: &str) -> Vec<String> {
    root.find(&format!("Capability/Request/{}", request))
        .map(|op| {
            op.children_named("Format")
                .map(|f| f.text().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Drawing order with display titles replaced by layer names. Empty when
/// the document declares none.
fn drawing_order(root: &Element, ctx: &LayerTreeContext) -> Vec<String> {
    let declared = root.value("Capability/LayerDrawingOrder");
    if declared.is_empty() {
        return Vec::new();
    }
    declared
        .split(',')
        .map(|entry| ctx.resolve_title(entry).to_string())
        .collect()
}

/// Endpoint for `request`: the configured override, else the GET URL the
/// document advertises, else the service URL itself.
fn endpoint(configured: Option<&str>, root: &Element, request: &str, service: &Url) -> String {
    let advertised = root.online_resource(&format!("Capability/Request/{}/DCPType/HTTP/Get", request));
    let url = configured
        .filter(|url| !url.is_empty())
        .or(advertised)
        .unwrap_or(service.as_str());
    normalize_endpoint(url)
}
