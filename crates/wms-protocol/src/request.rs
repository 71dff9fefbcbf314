//! WMS request URL construction.
//!
//! Service URLs configured for QGIS Server often already carry query
//! parameters (a `map=` project path, a routing token). Protocol parameters
//! are merged into the existing query instead of being appended blindly.

use url::Url;
use wms_common::{BoundingBox, FetchError};

/// WMS protocol version used for every request.
pub const WMS_VERSION: &str = "1.3.0";

/// Parse a configured service URL, resolving relative URLs against `host`.
pub fn resolve_service_url(host: &str, url: &str) -> Result<Url, FetchError> {
    let invalid = |url: &str, e: url::ParseError| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    };
    match Url::parse(url) {
        Ok(parsed) => Ok(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(host).map_err(|e| invalid(host, e))?;
            base.join(url).map_err(|e| invalid(url, e))
        }
        Err(e) => Err(invalid(url, e)),
    }
}

/// Return `url` with `params` set in its query string.
///
/// Existing parameters are kept in order unless one of `params` has the same
/// key (compared case-insensitively, as WMS servers do), in which case the
/// new value wins.
pub fn with_query_params(url: &Url, params: &[(&str, &str)]) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !params.iter().any(|(p, _)| p.eq_ignore_ascii_case(key)))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut merged = url.clone();
    {
        let mut pairs = merged.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs.extend_pairs(params.iter().copied());
    }
    merged
}

/// URL of the QGIS GetProjectSettings request for a service.
pub fn project_settings_url(service: &Url) -> Url {
    with_query_params(
        service,
        &[
            ("SERVICE", "WMS"),
            ("VERSION", WMS_VERSION),
            ("REQUEST", "GetProjectSettings"),
        ],
    )
}

/// Last non-empty path segment of a service URL, e.g. `demo` for
/// `http://localhost/ows/demo?map=x`. Empty when the path has none.
pub fn service_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or("")
        .to_string()
}

/// Make an endpoint URL end with exactly one query separator so the client
/// can append parameters directly.
pub fn normalize_endpoint(url: &str) -> String {
    let trimmed = url.trim_end_matches(|c| c == '?' || c == '&');
    if trimmed.contains('?') {
        format!("{}&", trimmed)
    } else {
        format!("{}?", trimmed)
    }
}

/// GetMap request parameters.
#[derive(Debug, Clone)]
pub struct GetMapRequest {
    /// Layers, bottom-most first
    pub layers: Vec<String>,
    /// Coordinate reference system of `bbox`
    pub crs: String,
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub transparent: bool,
}

impl GetMapRequest {
    /// Build the request URL against a service endpoint.
    pub fn to_url(&self, service: &Url) -> Url {
        let width = self.width.to_string();
        let height = self.height.to_string();
        let bbox = self.bbox.to_wms_string();
        let layers = self.layers.join(",");
        let transparent = if self.transparent { "TRUE" } else { "FALSE" };
        with_query_params(
            service,
            &[
                ("SERVICE", "WMS"),
                ("VERSION", WMS_VERSION),
                ("REQUEST", "GetMap"),
                ("FORMAT", self.format.as_str()),
                ("TRANSPARENT", transparent),
                ("STYLES", ""),
                ("WIDTH", width.as_str()),
                ("HEIGHT", height.as_str()),
                ("CRS", self.crs.as_str()),
                ("BBOX", bbox.as_str()),
                ("LAYERS", layers.as_str()),
            ],
        )
    }
}
