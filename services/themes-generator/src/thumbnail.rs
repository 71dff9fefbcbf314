//! Theme thumbnails.
//!
//! A theme uses its configured thumbnail when the file is present in the
//! assets directory. Otherwise a small GetMap image of the theme's visible
//! layers is requested and stored next to the configured ones.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use url::Url;
use wms_common::{BoundingBox, Credentials};
use wms_protocol::{Element, Fetcher, GetMapRequest};

use crate::error::{ThemesError, ThemesResult};

/// Thumbnail directory, relative to the assets root.
pub const THUMBNAIL_DIR: &str = "img/mapthumbs";

/// Used whenever no thumbnail can be produced.
pub const DEFAULT_THUMBNAIL: &str = "img/mapthumbs/default.jpg";

const WIDTH: u32 = 200;
const HEIGHT: u32 = 100;
const FORMAT: &str = "image/png";

/// CRS the capability document lists for clients that want lon/lat order.
const CRS84: &str = "CRS:84";

/// Client-relative path of a file in the thumbnail directory.
pub fn thumbnail_path(file: &str) -> String {
    format!("{}/{}", THUMBNAIL_DIR, file)
}

/// `img/mapthumbs/<file>` if it exists under `assets_dir`, else the default.
pub fn resolve_existing(assets_dir: &Path, file: &str) -> String {
    let relative = thumbnail_path(file);
    if !file.is_empty() && assets_dir.join(&relative).is_file() {
        relative
    } else {
        DEFAULT_THUMBNAIL.to_string()
    }
}

/// Everything needed to render a thumbnail for one theme.
pub struct ThumbnailRequest<'a> {
    /// WMS endpoint of the theme.
    pub service: &'a Url,
    pub credentials: Option<&'a Credentials>,
    /// Configured thumbnail file name.
    pub configured: Option<&'a str>,
    /// File name stem for a generated thumbnail.
    pub basename: &'a str,
    pub top_layer: &'a Element,
    /// Visible layers, bottom-most first.
    pub layers: &'a [String],
}

/// Produces theme thumbnails below an assets directory.
pub struct ThumbnailGenerator<'a> {
    fetcher: &'a dyn Fetcher,
    assets_dir: &'a Path,
}

impl<'a> ThumbnailGenerator<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, assets_dir: &'a Path) -> Self {
        Self {
            fetcher,
            assets_dir,
        }
    }

    /// Client path of the theme's thumbnail. Never fails: any problem
    /// yields [`DEFAULT_THUMBNAIL`].
    pub async fn resolve(&self, request: &ThumbnailRequest<'_>) -> String {
        if let Some(file) = request.configured.filter(|f| !f.is_empty()) {
            let relative = thumbnail_path(file);
            if self.assets_dir.join(&relative).is_file() {
                debug!(thumbnail = %relative, "Using configured thumbnail");
                return relative;
            }
        }

        match self.generate(request).await {
            Ok(relative) => relative,
            Err(e) => {
                warn!(service = %request.service, error = %e, "Could not generate thumbnail");
                DEFAULT_THUMBNAIL.to_string()
            }
        }
    }

    async fn generate(&self, request: &ThumbnailRequest<'_>) -> ThemesResult<String> {
        let Some((crs, extent)) = thumbnail_extent(request.top_layer) else {
            return Err(ThemesError::Thumbnail(
                "no projected CRS with a matching BoundingBox".to_string(),
            ));
        };

        let get_map = GetMapRequest {
            layers: request.layers.to_vec(),
            crs,
            bbox: extent.fit_aspect(f64::from(WIDTH) / f64::from(HEIGHT)),
            width: WIDTH,
            height: HEIGHT,
            format: FORMAT.to_string(),
            transparent: true,
        };
        let url = get_map.to_url(request.service);
        info!(url = %url, "Generating thumbnail");

        let image = self.fetcher.fetch(&url, request.credentials).await?;
        if looks_like_xml(&image) {
            return Err(ThemesError::Thumbnail(
                "GetMap returned XML instead of an image".to_string(),
            ));
        }

        let file = format!("{}.png", request.basename);
        let target = self.thumbnail_file(&file);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &image).await?;
        debug!(path = %target.display(), bytes = image.len(), "Wrote thumbnail");

        Ok(thumbnail_path(&file))
    }

    fn thumbnail_file(&self, file: &str) -> PathBuf {
        self.assets_dir.join(THUMBNAIL_DIR).join(file)
    }
}

/// First advertised CRS other than CRS:84 together with the top layer's
/// bounding box in that CRS.
fn thumbnail_extent(top_layer: &Element) -> Option<(String, BoundingBox)> {
    let crs = top_layer
        .children_named("CRS")
        .map(Element::text)
        .find(|crs| !crs.is_empty() && *crs != CRS84)?;
    let bbox = top_layer
        .children_named("BoundingBox")
        .find(|bbox| bbox.attr("CRS") == Some(crs))?;
    let coord = |name: &str| bbox.attr(name).and_then(|v| v.trim().parse::<f64>().ok());
    let extent = BoundingBox::new(coord("minx")?, coord("miny")?, coord("maxx")?, coord("maxy")?);
    Some((crs.to_string(), extent))
}

/// Service exceptions come back with HTTP 200 and an XML body.
fn looks_like_xml(body: &[u8]) -> bool {
    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .map_or(false, |b| *b == b'<')
}
