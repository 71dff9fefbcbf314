//! Extents of services, layers and thumbnail requests.

use serde::{Deserialize, Serialize};

/// CRS label attached to every geographic bounding box in the output.
pub const WGS84: &str = "EPSG:4326";

/// Axis-aligned extent in the units of whatever CRS it was read in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from an `[minx, miny, maxx, maxy]` extent array.
    pub fn from_extent(extent: [f64; 4]) -> Self {
        Self::new(extent[0], extent[1], extent[2], extent[3])
    }

    /// The `[minx, miny, maxx, maxy]` extent array.
    pub fn to_extent(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Centre point `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_y + self.max_y),
        )
    }

    /// Grow the box around its centre so that `width / height == ratio`.
    ///
    /// Wide boxes keep their width when they are already wider than the
    /// target ratio; everything else keeps its height.
    pub fn fit_aspect(&self, ratio: f64) -> BoundingBox {
        let mut width = self.width();
        let mut height = self.height();
        if width > height && width / height > ratio {
            height = width / ratio;
        } else {
            width = height * ratio;
        }
        let (cx, cy) = self.center();
        BoundingBox::new(
            cx - 0.5 * width,
            cy - 0.5 * height,
            cx + 0.5 * width,
            cy + 0.5 * height,
        )
    }

    /// Format as a WMS BBOX parameter: "minx,miny,maxx,maxy".
    pub fn to_wms_string(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Bounding box as exposed to the map client: `{"crs": ..., "bounds": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoBbox {
    pub crs: String,
    pub bounds: [f64; 4],
}

impl GeoBbox {
    /// Geographic box, always labeled EPSG:4326.
    pub fn wgs84(bounds: [f64; 4]) -> Self {
        Self {
            crs: WGS84.to_string(),
            bounds,
        }
    }
}

impl From<BoundingBox> for GeoBbox {
    fn from(bbox: BoundingBox) -> Self {
        GeoBbox::wgs84(bbox.to_extent())
    }
}
