use geo::HaversineDistance;
use geo::Point;

/// Fixed-point scale used for coordinates on disk (1e-7 degrees).
pub const COORD_SCALE: f64 = 1e7;

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoCoord {
    pub lat: f64,
    pub lon: f64,
}

impl GeoCoord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Convert to the on-disk fixed-point representation
    pub fn to_fixed(self) -> (i32, i32) {
        (
            (self.lat * COORD_SCALE).round() as i32,
            (self.lon * COORD_SCALE).round() as i32,
        )
    }

    pub fn from_fixed(lat: i32, lon: i32) -> Self {
        Self {
            lat: lat as f64 / COORD_SCALE,
            lon: lon as f64 / COORD_SCALE,
        }
    }

    /// Equality at storage resolution.
    pub fn same_fixed(self, other: GeoCoord) -> bool {
        self.to_fixed() == other.to_fixed()
    }
}

/// Great-circle distance in meters
pub fn haversine_distance(a: GeoCoord, b: GeoCoord) -> f64 {
    let p1 = Point::new(a.lon, a.lat);
    let p2 = Point::new(b.lon, b.lat);
    p1.haversine_distance(&p2)
}

/// Distance of `p` to the segment `a`-`b`, in degrees (planar, lon/lat space).
pub fn distance_to_segment(p: GeoCoord, a: GeoCoord, b: GeoCoord) -> f64 {
    let dx = b.lon - a.lon;
    let dy = b.lat - a.lat;
    let len2 = dx * dx + dy * dy;

    if len2 == 0.0 {
        return ((p.lon - a.lon).powi(2) + (p.lat - a.lat).powi(2)).sqrt();
    }

    let t = (((p.lon - a.lon) * dx + (p.lat - a.lat) * dy) / len2).clamp(0.0, 1.0);
    let px = a.lon + t * dx;
    let py = a.lat + t * dy;
    ((p.lon - px).powi(2) + (p.lat - py).powi(2)).sqrt()
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl GeoBox {
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Whole-world box
    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// Bounding box of a set of coordinates; `None` when empty.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoCoord>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.lat, first.lon, first.lat, first.lon);
        for c in iter {
            bbox.include(c);
        }
        Some(bbox)
    }

    pub fn include(&mut self, c: GeoCoord) {
        self.min_lat = self.min_lat.min(c.lat);
        self.min_lon = self.min_lon.min(c.lon);
        self.max_lat = self.max_lat.max(c.lat);
        self.max_lon = self.max_lon.max(c.lon);
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn center(&self) -> GeoCoord {
        GeoCoord::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn intersects(&self, other: &GeoBox) -> bool {
        !(other.max_lon < self.min_lon
            || other.min_lon > self.max_lon
            || other.max_lat < self.min_lat
            || other.min_lat > self.max_lat)
    }

    pub fn is_valid(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lon <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance(GeoCoord::new(0.0, 0.0), GeoCoord::new(1.0, 0.0));
        // ~111.2 km
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn test_fixed_point_roundtrip_resolution() {
        let c = GeoCoord::new(50.8503396, 4.3517103);
        let (lat, lon) = c.to_fixed();
        assert_eq!(lat, 508_503_396);
        assert_eq!(lon, 43_517_103);
        assert!(GeoCoord::from_fixed(lat, lon).same_fixed(c));
    }

    #[test]
    fn test_distance_to_segment() {
        let a = GeoCoord::new(0.0, 0.0);
        let b = GeoCoord::new(0.0, 2.0);
        assert!((distance_to_segment(GeoCoord::new(1.0, 1.0), a, b) - 1.0).abs() < 1e-12);
        // Beyond the end, distance to the endpoint
        assert!((distance_to_segment(GeoCoord::new(0.0, 3.0), a, b) - 1.0).abs() < 1e-12);
        // Degenerate segment
        assert!((distance_to_segment(GeoCoord::new(3.0, 4.0), a, a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_bbox() {
        let bbox = GeoBox::from_coords(vec![
            GeoCoord::new(1.0, 2.0),
            GeoCoord::new(-1.0, 4.0),
            GeoCoord::new(0.5, 3.0),
        ])
        .unwrap();
        assert_eq!(bbox, GeoBox::new(-1.0, 2.0, 1.0, 4.0));
        assert_eq!(bbox.center(), GeoCoord::new(0.0, 3.0));
        assert!(bbox.intersects(&GeoBox::new(0.0, 3.5, 5.0, 5.0)));
        assert!(!bbox.intersects(&GeoBox::new(2.0, 3.0, 3.0, 4.0)));
        assert!(GeoBox::from_coords(Vec::new()).is_none());
    }
}
