//! Common test fixtures for themes generator tests.
//!
//! The sample documents mimic what QGIS Server returns for
//! `REQUEST=GetProjectSettings`, trimmed to the parts the generator reads.

/// Service URL path the sample project is published under.
pub const DEMO_PATH: &str = "/ows/demo";

/// A 1x1 PNG, enough for anything that only checks it is not XML.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// What QGIS Server answers for an unknown project.
pub const SERVICE_EXCEPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc">
 <ServiceException code="Server.Error">Project file error</ServiceException>
</ServiceExceptionReport>"#;

/// Sublayers of the sample project's top layer.
///
/// - `Places` group: `cities` (visible, queryable, two styles) and
///   `rivers` (hidden, 50% transparency)
/// - `countries`: visible, fractional opacity, a time dimension, atlas PK `fid`
/// - `statistics`: attribute-only table (`WKBNoGeometry`)
/// - `Tables` group holding only a `NoGeometry` layer
/// - `print_bg`: backdrop used by print background layers
/// - `osm`: data URL pointing at an external WMS
pub const DEMO_LAYERS: &str = r#"
   <Layer queryable="1" visible="1" expanded="1" mutuallyExclusive="0">
    <Name>places</Name>
    <Title>Places</Title>
    <Layer queryable="1" visible="1" displayField="name" geometryType="Point">
     <Name>cities</Name>
     <Title>Cities</Title>
     <Abstract>Populated places</Abstract>
     <KeywordList>
      <Keyword>cities</Keyword>
      <Keyword>places</Keyword>
     </KeywordList>
     <EX_GeographicBoundingBox>
      <westBoundLongitude>7.6</westBoundLongitude>
      <eastBoundLongitude>8.4</eastBoundLongitude>
      <southBoundLatitude>46.6</southBoundLatitude>
      <northBoundLatitude>47.4</northBoundLatitude>
     </EX_GeographicBoundingBox>
     <Attribution>
      <Title>Swisstopo</Title>
      <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="https://www.swisstopo.admin.ch"/>
     </Attribution>
     <MetadataURL type="FGDC">
      <Format>text/html</Format>
      <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="https://example.com/meta/cities"/>
     </MetadataURL>
     <Style>
      <Name>highlight</Name>
      <Title>Highlighted</Title>
     </Style>
     <Style>
      <Name>default</Name>
      <Title>Default</Title>
     </Style>
     <MinScaleDenominator>1000</MinScaleDenominator>
     <MaxScaleDenominator>250000</MaxScaleDenominator>
    </Layer>
    <Layer queryable="0" visible="0" transparency="50" geometryType="LineString">
     <Name>rivers</Name>
     <Title>Rivers</Title>
     <Style>
      <Name>blue</Name>
      <Title>Blue</Title>
     </Style>
    </Layer>
   </Layer>
   <Layer queryable="1" visible="1" opacity="0.5" displayField="name" geometryType="Polygon">
    <Name>countries</Name>
    <Title>Countries</Title>
    <PrimaryKey>
     <PrimaryKeyAttribute>fid</PrimaryKeyAttribute>
    </PrimaryKey>
    <Dimension name="time" units="ISO8601" multipleValues="1" default="2020-01-01" fieldName="valid_from" endFieldName="valid_to">2019-01-01/2021-01-01</Dimension>
   </Layer>
   <Layer queryable="1" visible="1" geometryType="WKBNoGeometry">
    <Name>statistics</Name>
    <Title>Statistics</Title>
   </Layer>
   <Layer queryable="0" visible="1">
    <Name>tables</Name>
    <Title>Tables</Title>
    <Layer queryable="1" visible="1" geometryType="NoGeometry">
     <Name>lookup</Name>
     <Title>Lookup</Title>
    </Layer>
   </Layer>
   <Layer queryable="0" visible="0" geometryType="Polygon">
    <Name>print_bg</Name>
    <Title>Print background</Title>
   </Layer>
   <Layer queryable="0" visible="0" geometryType="Unknown">
    <Name>osm</Name>
    <Title>OpenStreetMap</Title>
    <DataURL>
     <Format>text/plain</Format>
     <OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:type="simple" xlink:href="wms:https://wms.example.com/osm#osm_auto"/>
    </DataURL>
   </Layer>"#;

/// Print layouts of the sample project.
pub const DEMO_COMPOSER_TEMPLATES: &str = r#"
  <ComposerTemplates xsi:type="wms:_ExtendedCapabilities">
   <ComposerTemplate name="A4 Landscape" width="297" height="210" atlasEnabled="1" atlasCoverageLayer="countries">
    <ComposerMap name="map0" width="277" height="170"/>
    <ComposerLabel name="title"/>
    <ComposerLabel name="internal_ref"/>
   </ComposerTemplate>
   <ComposerTemplate name="A4 Landscape_legend" width="297" height="210">
    <ComposerLegend name="legend0"/>
   </ComposerTemplate>
   <ComposerTemplate name="Report" width="210" height="297">
   </ComposerTemplate>
   <ComposerTemplate name="A3 Portrait" width="297" height="420" atlasEnabled="1" atlasCoverageLayer="missing_layer">
    <ComposerMap name="map0" width="277" height="380"/>
    <ComposerLabel name="subtitle"/>
   </ComposerTemplate>
  </ComposerTemplates>"#;

/// Drawing order of the sample project: titles mixed with names, plus an
/// entry no layer answers to.
pub const DEMO_DRAWING_ORDER: &str = "Countries,rivers,Cities,Unknown layer";

/// The full sample GetProjectSettings response.
pub fn demo_project_settings() -> String {
    project_settings(
        "Demo Project",
        DEMO_LAYERS,
        DEMO_COMPOSER_TEMPLATES,
        DEMO_DRAWING_ORDER,
    )
}

/// A GetProjectSettings response with custom content.
///
/// `layers` become the children of the top layer (`Name` `demo`, title
/// `Demo top`). Pass an empty `service_title` to leave `Service/Title` out.
pub fn project_settings(
    service_title: &str,
    layers: &str,
    composer_templates: &str,
    drawing_order: &str,
) -> String {
    let title = if service_title.is_empty() {
        String::new()
    } else {
        format!("<Title>{}</Title>", service_title)
    };
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:sld="http://www.opengis.net/sld" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
 <Service>
  <Name>WMS</Name>
  {title}
  <Abstract>Sample project for tests</Abstract>
  <KeywordList>
   <Keyword vocabulary="ISO">infoMapAccessService</Keyword>
   <Keyword>demo</Keyword>
   <Keyword>qwc2</Keyword>
  </KeywordList>
  <OnlineResource xlink:type="simple" xlink:href="http://qgis.example.com/ows/demo"/>
  <ContactInformation>
   <ContactPersonPrimary>
    <ContactPerson>Jane Doe</ContactPerson>
    <ContactOrganization>Example GIS</ContactOrganization>
   </ContactPersonPrimary>
   <ContactPosition>Administrator</ContactPosition>
   <ContactVoiceTelephone>+41 00 000 00 00</ContactVoiceTelephone>
   <ContactElectronicMailAddress>gis@example.com</ContactElectronicMailAddress>
  </ContactInformation>
 </Service>
 <Capability>
  <Request>
   <GetCapabilities>
    <Format>text/xml</Format>
    <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="http://qgis.example.com/ows/demo?"/></Get></HTTP></DCPType>
   </GetCapabilities>
   <GetMap>
    <Format>image/jpeg</Format>
    <Format>image/png</Format>
    <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="http://qgis.example.com/ows/demo?"/></Get></HTTP></DCPType>
   </GetMap>
   <GetFeatureInfo>
    <Format>text/plain</Format>
    <Format>text/html</Format>
    <Format>text/xml</Format>
    <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="http://qgis.example.com/ows/demo?"/></Get></HTTP></DCPType>
   </GetFeatureInfo>
   <sld:GetLegendGraphic>
    <Format>image/png</Format>
    <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="http://qgis.example.com/ows/demo?"/></Get></HTTP></DCPType>
   </sld:GetLegendGraphic>
   <GetPrint>
    <Format>pdf</Format>
    <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="http://qgis.example.com/ows/demo?map=demo"/></Get></HTTP></DCPType>
   </GetPrint>
  </Request>
  <Exception>
   <Format>XML</Format>
  </Exception>
  {composer_templates}
  <LayerDrawingOrder>{drawing_order}</LayerDrawingOrder>
  <Layer queryable="1">
   <Name>demo</Name>
   <Title>Demo top</Title>
   <CRS>CRS:84</CRS>
   <CRS>EPSG:3857</CRS>
   <CRS>EPSG:4326</CRS>
   <EX_GeographicBoundingBox>
    <westBoundLongitude>7.5</westBoundLongitude>
    <eastBoundLongitude>8.5</eastBoundLongitude>
    <southBoundLatitude>46.5</southBoundLatitude>
    <northBoundLatitude>47.5</northBoundLatitude>
   </EX_GeographicBoundingBox>
   <BoundingBox CRS="EPSG:3857" minx="800000" miny="5900000" maxx="950000" maxy="6000000"/>
   <BoundingBox CRS="EPSG:4326" minx="46.5" miny="7.5" maxx="47.5" maxy="8.5"/>
   {layers}
  </Layer>
 </Capability>
</WMS_Capabilities>"#
    )
}

/// A document whose top layer is the given layer element, for exercising
/// the layer tree on its own.
pub fn single_layer_document(layer: &str) -> String {
    format!(
        r#"<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink"><Capability>{}</Capability></WMS_Capabilities>"#,
        layer
    )
}
