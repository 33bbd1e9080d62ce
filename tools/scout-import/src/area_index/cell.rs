//! Quad-tree cell geometry
//!
//! Level `l` divides the globe into 2^l x 2^l equirectangular cells.
//! Cell (x, y) covers longitudes from -180 + x*w and latitudes from
//! -90 + y*h, with y growing northwards.

use serde::Serialize;

use crate::geo::GeoBox;

/// Deepest level the x/y coordinates of a cell can address
pub const MAX_SUPPORTED_LEVEL: u32 = 30;

/// Cell identifier (level, x, y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

/// Child position inside its parent, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    fn offset(self) -> (u32, u32) {
        match self {
            Quadrant::TopLeft => (0, 1),
            Quadrant::TopRight => (1, 1),
            Quadrant::BottomLeft => (0, 0),
            Quadrant::BottomRight => (1, 0),
        }
    }
}

impl CellId {
    pub const ROOT: CellId = CellId { level: 0, x: 0, y: 0 };

    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    pub fn parent(&self) -> Option<CellId> {
        (self.level > 0).then(|| CellId::new(self.level - 1, self.x / 2, self.y / 2))
    }

    pub fn child(&self, quadrant: Quadrant) -> CellId {
        let (dx, dy) = quadrant.offset();
        CellId::new(self.level + 1, self.x * 2 + dx, self.y * 2 + dy)
    }

    /// Area covered by the cell
    pub fn bounds(&self) -> GeoBox {
        let dim = CellDimension::at(self.level);
        let min_lon = -180.0 + self.x as f64 * dim.width;
        let min_lat = -90.0 + self.y as f64 * dim.height;
        GeoBox::new(min_lat, min_lon, min_lat + dim.height, min_lon + dim.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDimension {
    pub width: f64,
    pub height: f64,
}

impl CellDimension {
    pub fn at(level: u32) -> Self {
        let cells = (1u64 << level) as f64;
        Self {
            width: 360.0 / cells,
            height: 180.0 / cells,
        }
    }
}

/// Deepest level, at most `max_level`, whose cells are at least as large
/// as `bbox` in both dimensions
pub fn calculate_level(bbox: &GeoBox, max_level: u32) -> u32 {
    let (width, height) = (bbox.width(), bbox.height());
    (0..=max_level)
        .rev()
        .find(|&level| {
            let dim = CellDimension::at(level);
            width <= dim.width && height <= dim.height
        })
        .unwrap_or(0)
}

/// Cell at `level` holding the center of `bbox`
pub fn cell_for(bbox: &GeoBox, level: u32) -> CellId {
    let dim = CellDimension::at(level);
    let last = ((1u64 << level) - 1) as f64;
    let center = bbox.center();
    let x = ((center.lon + 180.0) / dim.width).floor().clamp(0.0, last);
    let y = ((center.lat + 90.0) / dim.height).floor().clamp(0.0, last);
    CellId::new(level, x as u32, y as u32)
}
