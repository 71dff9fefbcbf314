//! End-to-end tests of theme generation against scripted services.

use serde_json::{json, Value};
use test_utils::fixtures::{self, DEMO_PATH, PNG_BYTES, SERVICE_EXCEPTION};
use test_utils::{MockFetcher, TempAssets};
use themes_generator::{generate, GeneratorOptions, LayerNode, ThemeRecord, ThemesConfig, ThemesDocument};

// ============================================================================
// Helpers
// ============================================================================

fn options(assets: &TempAssets) -> GeneratorOptions {
    GeneratorOptions {
        host_url: "http://qgis.example.com".to_string(),
        assets_dir: assets.path().to_path_buf(),
        config_dir: assets.path().to_path_buf(),
    }
}

fn config(themes: Value) -> ThemesConfig {
    serde_json::from_value(json!({
        "defaultScales": [100000, 50000, 25000, 10000],
        "defaultPrintScales": [50000, 10000],
        "defaultPrintResolutions": [150, 300],
        "themes": themes
    }))
    .unwrap()
}

fn demo_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_capabilities(DEMO_PATH, fixtures::demo_project_settings())
        .with_map(DEMO_PATH, PNG_BYTES)
}

async fn run(themes: Value, fetcher: &MockFetcher, assets: &TempAssets) -> ThemesDocument {
    generate(&config(themes), fetcher, &options(assets)).await
}

fn sublayers(theme: &ThemeRecord) -> &[LayerNode] {
    theme.sublayers.as_deref().unwrap_or_default()
}

fn find<'a>(theme: &'a ThemeRecord, name: &str) -> Option<&'a LayerNode> {
    sublayers(theme).iter().find_map(|node| node.find(name))
}

// ============================================================================
// Theme assembly
// ============================================================================

#[tokio::test]
async fn test_demo_theme_metadata() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;

    let theme = &doc.themes.items[0];
    assert!(!theme.is_error());
    assert_eq!(theme.id.as_deref(), Some("demo"));
    assert_eq!(theme.name.as_deref(), Some("demo"));
    assert_eq!(theme.title, "Demo Project");
    assert_eq!(theme.url.as_deref(), Some("/ows/demo"));
    assert_eq!(theme.keywords.as_deref(), Some("demo, qwc2"));
    assert_eq!(theme.abstract_.as_deref(), Some("Sample project for tests"));
    assert_eq!(theme.online_resource.as_deref(), Some("http://qgis.example.com/ows/demo"));
    assert_eq!(theme.contact.as_ref().unwrap().person, "Jane Doe");
    assert_eq!(theme.version.as_deref(), Some("1.3.0"));
    assert_eq!(theme.map_crs.as_deref(), Some("EPSG:3857"));
    assert_eq!(theme.expanded, Some(true));
    assert_eq!(
        theme.available_formats,
        Some(vec!["image/jpeg".to_string(), "image/png".to_string()])
    );
    assert_eq!(theme.info_formats.as_ref().map(Vec::len), Some(3));

    let bbox = theme.bbox.as_ref().unwrap();
    assert_eq!(bbox.crs, "EPSG:4326");
    assert_eq!(bbox.bounds, [7.5, 46.5, 8.5, 47.5]);
    assert_eq!(theme.initial_bbox, theme.bbox);

    assert_eq!(theme.legend_url.as_deref(), Some("http://qgis.example.com/ows/demo?"));
    assert_eq!(theme.feature_info_url.as_deref(), Some("http://qgis.example.com/ows/demo?"));
    assert_eq!(theme.print_url.as_deref(), Some("http://qgis.example.com/ows/demo?map=demo&"));

    let request = &fetcher.calls_for("GetProjectSettings")[0];
    assert_eq!(request.url.path(), DEMO_PATH);
    assert_eq!(request.param("SERVICE").as_deref(), Some("WMS"));
    assert_eq!(request.param("VERSION").as_deref(), Some("1.3.0"));
}

#[tokio::test]
async fn test_source_overrides_win() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{
            "url": "/ows/demo",
            "title": "Custom title",
            "description": "About this map",
            "attribution": "Example",
            "attributionUrl": "https://example.com",
            "extent": [7.9, 46.9, 8.1, 47.1],
            "mapCrs": "EPSG:2056",
            "version": "1.1.1",
            "scales": [5000, 1000],
            "tiled": true,
            "legendUrl": "http://legend.example.com/wms",
            "printLabelForSearchResult": "search",
            "config": {"preserveExtentOnThemeSwitch": true}
        }]}),
        &fetcher,
        &assets,
    )
    .await;

    let theme = &doc.themes.items[0];
    assert_eq!(theme.title, "Custom title");
    assert_eq!(theme.description.as_deref(), Some("About this map"));
    assert_eq!(theme.attribution.as_ref().unwrap().title, "Example");
    assert_eq!(theme.attribution.as_ref().unwrap().online_resource, "https://example.com");
    assert_eq!(theme.initial_bbox.as_ref().unwrap().bounds, [7.9, 46.9, 8.1, 47.1]);
    assert_eq!(theme.bbox.as_ref().unwrap().bounds, [7.5, 46.5, 8.5, 47.5]);
    assert_eq!(theme.map_crs.as_deref(), Some("EPSG:2056"));
    assert_eq!(theme.version.as_deref(), Some("1.1.1"));
    assert_eq!(theme.scales, Some(vec![5000, 1000]));
    assert_eq!(theme.tiled, Some(true));
    assert_eq!(theme.legend_url.as_deref(), Some("http://legend.example.com/wms?"));
    assert_eq!(theme.print_label_for_search_result.as_deref(), Some("search"));
    assert_eq!(theme.config, Some(json!({"preserveExtentOnThemeSwitch": true})));
}

#[tokio::test]
async fn test_title_falls_back_to_top_layer() {
    let assets = TempAssets::new().unwrap();
    let xml = fixtures::project_settings("", fixtures::DEMO_LAYERS, "", "");
    let fetcher = MockFetcher::new().with_capabilities(DEMO_PATH, xml);
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;

    let theme = &doc.themes.items[0];
    assert_eq!(theme.title, "Demo top");
    assert_eq!(theme.drawing_order, Some(Vec::new()));
    assert_eq!(theme.print, None);
}

#[tokio::test]
async fn test_credentials_are_sent() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    run(
        json!({"items": [{"url": "/ows/demo", "wmsBasicAuth": {"username": "qgis", "password": "secret"}}]}),
        &fetcher,
        &assets,
    )
    .await;

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 2);
    for call in calls {
        assert_eq!(call.credentials.as_ref().map(|c| c.username.as_str()), Some("qgis"));
    }
}

#[tokio::test]
async fn test_service_query_parameters_survive() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    run(json!({"items": [{"url": "/ows/demo?token=abc"}]}), &fetcher, &assets).await;

    let request = &fetcher.calls_for("GetProjectSettings")[0];
    assert_eq!(request.param("token").as_deref(), Some("abc"));
    assert_eq!(request.param("REQUEST").as_deref(), Some("GetProjectSettings"));
}

// ============================================================================
// Layer tree
// ============================================================================

#[tokio::test]
async fn test_layer_tree_omissions() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;
    let theme = &doc.themes.items[0];

    // top layer itself is never exposed
    assert!(sublayers(theme).iter().all(|node| node.name != "demo"));
    assert!(find(theme, "statistics").is_none());
    assert!(find(theme, "lookup").is_none());
    assert!(find(theme, "tables").is_none());
    assert!(find(theme, "places").unwrap().is_group());
    assert!(find(theme, "print_bg").is_some());
}

#[tokio::test]
async fn test_print_layers_are_excluded() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{
            "url": "/ows/demo",
            "backgroundLayers": [{"name": "bluemarble", "printLayer": "print_bg"}]
        }]}),
        &fetcher,
        &assets,
    )
    .await;
    let theme = &doc.themes.items[0];

    assert!(find(theme, "print_bg").is_none());
    assert_eq!(theme.background_layers.as_ref().unwrap()[0].name, "bluemarble");
}

#[tokio::test]
async fn test_layer_opacity() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;
    let theme = &doc.themes.items[0];

    let opacity = |name: &str| find(theme, name).and_then(LayerNode::as_leaf).unwrap().opacity;
    assert_eq!(opacity("rivers"), 128);
    assert_eq!(opacity("countries"), 128);
    assert_eq!(opacity("cities"), 255);
}

#[tokio::test]
async fn test_leaf_details() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{"url": "/ows/demo", "featureReport": {"countries": "CountryReport"}}]}),
        &fetcher,
        &assets,
    )
    .await;
    let theme = &doc.themes.items[0];

    let cities = find(theme, "cities").and_then(LayerNode::as_leaf).unwrap();
    assert!(cities.visibility);
    assert_eq!(cities.display_field.as_deref(), Some("name"));
    assert_eq!(cities.style.as_deref(), Some("default"));
    assert_eq!(cities.keywords.as_deref(), Some("cities,places"));
    assert_eq!((cities.min_scale, cities.max_scale), (Some(1000), Some(250000)));
    assert_eq!(cities.metadata_url.as_deref(), Some("https://example.com/meta/cities"));

    let countries = find(theme, "countries").and_then(LayerNode::as_leaf).unwrap();
    assert_eq!(countries.feature_report.as_deref(), Some("CountryReport"));
    assert_eq!(countries.dimensions.len(), 1);
    assert_eq!(countries.dimensions[0].value, "2020-01-01");
    assert!(countries.dimensions[0].multiple);
    assert_eq!(countries.dimensions[0].end_field_name.as_deref(), Some("valid_to"));
}

#[tokio::test]
async fn test_external_layers_are_merged() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{
            "url": "/ows/demo",
            "externalLayers": [{"name": "wmts:https://tiles.example.com#ortho", "internalLayer": "ortho"}]
        }]}),
        &fetcher,
        &assets,
    )
    .await;
    let theme = &doc.themes.items[0];

    let external: Vec<&str> = theme
        .external_layers
        .as_ref()
        .unwrap()
        .iter()
        .map(|layer| layer.internal_layer.as_str())
        .collect();
    assert_eq!(external, vec!["ortho", "osm"]);
    let osm = find(theme, "osm").and_then(LayerNode::as_leaf).unwrap();
    assert_eq!(osm.data_url.as_deref(), Some(""));
}

#[tokio::test]
async fn test_collapsed_groups() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{"url": "/ows/demo", "collapseLayerGroupsBelowLevel": 1}]}),
        &fetcher,
        &assets,
    )
    .await;
    let places = find(&doc.themes.items[0], "places").and_then(LayerNode::as_group).unwrap();
    // explicit expanded="1" on the group wins
    assert!(places.expanded);
}

// ============================================================================
// Print templates and drawing order
// ============================================================================

#[tokio::test]
async fn test_print_templates() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{
            "url": "/ows/demo",
            "printLabelBlacklist": ["internal_ref"],
            "defaultPrintLayout": "A3 Portrait"
        }]}),
        &fetcher,
        &assets,
    )
    .await;
    let print = doc.themes.items[0].print.as_ref().unwrap();

    let names: Vec<&str> = print.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["A4 Landscape", "Report", "A3 Portrait"]);

    let a4 = &print[0];
    assert_eq!(a4.legend_layout.as_deref(), Some("A4 Landscape_legend"));
    assert_eq!(a4.labels, Some(vec!["title".to_string()]));
    assert_eq!(a4.atlas_coverage_layer.as_deref(), Some("countries"));
    assert_eq!(a4.atlas_pk.as_deref(), Some("fid"));
    let map = a4.map.as_ref().unwrap();
    assert_eq!((map.width, map.height), (277.0, 170.0));
    assert!(!a4.default);

    let report = &print[1];
    assert_eq!(report.map, None);
    assert_eq!(report.legend_layout, None);

    let a3 = &print[2];
    assert_eq!(a3.atlas_coverage_layer, None);
    assert!(a3.default);
}

#[tokio::test]
async fn test_drawing_order_uses_layer_names() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;

    assert_eq!(
        doc.themes.items[0].drawing_order,
        Some(vec![
            "countries".to_string(),
            "rivers".to_string(),
            "cities".to_string(),
            "Unknown layer".to_string(),
        ])
    );
}

// ============================================================================
// Thumbnails
// ============================================================================

#[tokio::test]
async fn test_thumbnail_is_generated() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;

    assert_eq!(doc.themes.items[0].thumbnail.as_deref(), Some("img/mapthumbs/demo.png"));
    assert!(assets.has_thumbnail("demo.png"));

    let get_map = &fetcher.calls_for("GetMap")[0];
    assert_eq!(get_map.param("WIDTH").as_deref(), Some("200"));
    assert_eq!(get_map.param("HEIGHT").as_deref(), Some("100"));
    assert_eq!(get_map.param("CRS").as_deref(), Some("EPSG:3857"));
    assert_eq!(get_map.param("BBOX").as_deref(), Some("775000,5900000,975000,6000000"));
    assert_eq!(get_map.param("LAYERS").as_deref(), Some("countries,cities"));
    assert_eq!(get_map.param("TRANSPARENT").as_deref(), Some("TRUE"));
}

#[tokio::test]
async fn test_existing_thumbnail_skips_fetch() {
    let assets = TempAssets::new().unwrap();
    assets.add_thumbnail("custom.jpg", b"jpg").unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [{"url": "/ows/demo", "thumbnail": "custom.jpg"}]}),
        &fetcher,
        &assets,
    )
    .await;

    assert_eq!(doc.themes.items[0].thumbnail.as_deref(), Some("img/mapthumbs/custom.jpg"));
    assert!(fetcher.calls_for("GetMap").is_empty());
}

#[tokio::test]
async fn test_failed_thumbnail_uses_default() {
    let assets = TempAssets::new().unwrap();
    let fetcher = MockFetcher::new()
        .with_capabilities(DEMO_PATH, fixtures::demo_project_settings())
        .with_status(DEMO_PATH, "GetMap", 500);
    let doc = run(
        json!({"items": [{"url": "/ows/demo", "thumbnail": "missing.jpg"}]}),
        &fetcher,
        &assets,
    )
    .await;

    let theme = &doc.themes.items[0];
    assert!(!theme.is_error());
    assert_eq!(theme.thumbnail.as_deref(), Some("img/mapthumbs/default.jpg"));
    assert_eq!(fetcher.calls_for("GetMap").len(), 1);
}

#[tokio::test]
async fn test_service_exception_as_thumbnail_uses_default() {
    let assets = TempAssets::new().unwrap();
    let fetcher = MockFetcher::new()
        .with_capabilities(DEMO_PATH, fixtures::demo_project_settings())
        .with_map(DEMO_PATH, SERVICE_EXCEPTION);
    let doc = run(json!({"items": [{"url": "/ows/demo"}]}), &fetcher, &assets).await;

    assert_eq!(doc.themes.items[0].thumbnail.as_deref(), Some("img/mapthumbs/default.jpg"));
    assert!(!assets.has_thumbnail("demo.png"));
}

#[tokio::test]
async fn test_background_catalog_thumbnails() {
    let assets = TempAssets::new().unwrap();
    assets.add_thumbnail("bluemarble.jpg", b"jpg").unwrap();
    let fetcher = MockFetcher::new();
    let doc = run(
        json!({
            "items": [],
            "backgroundLayers": [
                {"name": "bluemarble", "title": "Blue Marble", "thumbnail": "bluemarble.jpg"},
                {"name": "osm", "title": "OSM", "thumbnail": "osm.jpg"}
            ]
        }),
        &fetcher,
        &assets,
    )
    .await;

    let catalog = &doc.themes.background_layers;
    assert_eq!(catalog[0]["thumbnail"], "img/mapthumbs/bluemarble.jpg");
    assert_eq!(catalog[0]["title"], "Blue Marble");
    assert_eq!(catalog[1]["thumbnail"], "img/mapthumbs/default.jpg");
}

// ============================================================================
// Batch behaviour
// ============================================================================

#[tokio::test]
async fn test_failed_source_yields_error_stub() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher()
        .with_capabilities("/ows/exception", SERVICE_EXCEPTION)
        .with_status("/ows/gone", "GetProjectSettings", 404);
    let doc = run(
        json!({"items": [
            {"url": "/ows/unreachable"},
            {"url": "/ows/demo"},
            {"url": "/ows/exception"},
            {"url": "/ows/gone"}
        ]}),
        &fetcher,
        &assets,
    )
    .await;

    let items = &doc.themes.items;
    assert_eq!(items.len(), 4);
    for index in [0, 2, 3] {
        assert_eq!(items[index].title, "Error");
        assert_eq!(items[index].error.as_deref(), Some("Could not read GetProjectSettings"));
        assert_eq!(items[index].id, None);
    }
    assert!(!items[1].is_error());
    assert_eq!(items[1].id.as_deref(), Some("demo"));
    assert_eq!(doc.summary(), (1, 3));

    let stub = serde_json::to_value(&items[0]).unwrap();
    assert_eq!(stub, json!({"title": "Error", "error": "Could not read GetProjectSettings"}));
}

#[tokio::test]
async fn test_colliding_names_get_suffixes() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let themes = json!({
        "items": [{"url": "/ows/demo"}, {"url": "/ows/demo?map=copy"}],
        "groups": [{"title": "More", "items": [{"url": "http://qgis.example.com/ows/demo"}]}]
    });

    let doc = run(themes.clone(), &fetcher, &assets).await;
    let ids: Vec<Option<&str>> = doc.themes.items.iter().map(|t| t.id.as_deref()).collect();
    assert_eq!(ids, vec![Some("demo"), Some("demo1")]);
    assert_eq!(doc.themes.subdirs[0].items[0].id.as_deref(), Some("demo2"));

    // a second run starts from scratch
    let again = run(themes, &fetcher, &assets).await;
    assert_eq!(again.themes.items[0].id.as_deref(), Some("demo"));
}

#[tokio::test]
async fn test_group_ids_follow_traversal_order() {
    let assets = TempAssets::new().unwrap();
    let fetcher = MockFetcher::new();
    let doc = run(
        json!({
            "title": "ignored",
            "groups": [
                {"title": "A", "groups": [{"title": "A1"}, {"title": "A2"}]},
                {"title": "B"}
            ]
        }),
        &fetcher,
        &assets,
    )
    .await;

    let subdirs = &doc.themes.subdirs;
    assert_eq!(subdirs[0].id.as_deref(), Some("g1"));
    assert_eq!(subdirs[0].title, "A");
    assert_eq!(subdirs[0].subdirs[0].id.as_deref(), Some("g2"));
    assert_eq!(subdirs[0].subdirs[1].id.as_deref(), Some("g3"));
    assert_eq!(subdirs[1].id.as_deref(), Some("g4"));
    assert_eq!(doc.themes.title, "root");

    let value = serde_json::to_value(&doc).unwrap();
    assert!(value["themes"]["subdirs"][0].get("id").is_some());
    assert_eq!(value["themes"]["subdirs"][1]["items"], json!([]));
}

#[tokio::test]
async fn test_default_theme_selection() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();

    let doc = run(
        json!({"items": [
            {"url": "/ows/unreachable", "default": true},
            {"url": "/ows/demo"},
            {"url": "/ows/demo", "default": true},
            {"url": "/ows/demo", "default": true}
        ]}),
        &fetcher,
        &assets,
    )
    .await;
    assert_eq!(doc.themes.default_theme.as_deref(), Some("demo1"));

    let doc = run(
        json!({"items": [{"url": "/ows/unreachable"}, {"url": "/ows/demo"}]}),
        &fetcher,
        &assets,
    )
    .await;
    assert_eq!(doc.themes.default_theme.as_deref(), Some("demo"));

    let doc = run(json!({"items": [{"url": "/ows/unreachable"}]}), &fetcher, &assets).await;
    assert_eq!(doc.themes.default_theme, None);
}

#[tokio::test]
async fn test_edit_config_from_file() {
    let assets = TempAssets::new().unwrap();
    assets
        .write_file("edit/demo.json", r#"{"cities": {"layerName": "cities"}}"#)
        .unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({"items": [
            {"url": "/ows/demo", "editConfig": "edit/demo.json"},
            {"url": "/ows/demo", "editConfig": "edit/missing.json"},
            {"url": "/ows/demo", "editConfig": {"countries": {}}}
        ]}),
        &fetcher,
        &assets,
    )
    .await;

    let items = &doc.themes.items;
    assert_eq!(items[0].edit_config, Some(json!({"cities": {"layerName": "cities"}})));
    assert_eq!(items[1].edit_config, None);
    assert!(!items[1].is_error());
    assert_eq!(items[2].edit_config, Some(json!({"countries": {}})));
}

#[tokio::test]
async fn test_document_shape() {
    let assets = TempAssets::new().unwrap();
    let fetcher = demo_fetcher();
    let doc = run(
        json!({
            "items": [{"url": "/ows/demo"}],
            "externalLayers": [{"name": "wms:https://wms.example.com/osm#osm_auto", "type": "wms"}]
        }),
        &fetcher,
        &assets,
    )
    .await;

    let value = serde_json::to_value(&doc).unwrap();
    let themes = &value["themes"];
    assert_eq!(themes["defaultTheme"], "demo");
    assert_eq!(themes["defaultMapCrs"], "EPSG:3857");
    assert_eq!(themes["defaultScales"], json!([100000, 50000, 25000, 10000]));
    assert_eq!(themes["defaultPrintResolutions"], json!([150, 300]));
    assert_eq!(themes["externalLayers"][0]["type"], "wms");
    assert!(themes["defaultPrintGrid"].is_null());

    let theme = &themes["items"][0];
    assert_eq!(theme["sublayers"][0]["name"], "places");
    assert_eq!(theme["sublayers"][0]["sublayers"][0]["attribution"]["Title"], "Swisstopo");
    assert!(theme.get("error").is_none());
}
