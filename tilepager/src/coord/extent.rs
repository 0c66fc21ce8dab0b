use serde::{Deserialize, Serialize};

/// Axis aligned rectangle in the units of a tile profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoExtent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl GeoExtent {
    /// Creates an extent from its corners.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Returns the center point as `(x, y)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) * 0.5,
            (self.ymin + self.ymax) * 0.5,
        )
    }

    /// Half-open containment test.
    ///
    /// The minimum edges are inclusive and the maximum edges exclusive, so a
    /// point on a shared edge belongs to exactly one of two adjacent tiles.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x < self.xmax && y >= self.ymin && y < self.ymax
    }

    /// Like [`contains`](Self::contains), but a maximum edge lying on the
    /// matching edge of `bounds` is inclusive.
    ///
    /// Tiles of a profile partition its extent this way, including points on
    /// the east and north border.
    pub fn contains_within(&self, x: f64, y: f64, bounds: &GeoExtent) -> bool {
        let x_inside = x < self.xmax || (self.xmax >= bounds.xmax && x <= self.xmax);
        let y_inside = y < self.ymax || (self.ymax >= bounds.ymax && y <= self.ymax);
        x >= self.xmin && y >= self.ymin && x_inside && y_inside
    }

    /// Returns true if the two extents overlap with non-zero area.
    pub fn intersects(&self, other: &GeoExtent) -> bool {
        self.xmin < other.xmax
            && other.xmin < self.xmax
            && self.ymin < other.ymax
            && other.ymin < self.ymax
    }

    /// Half of the diagonal length.
    pub fn radius(&self) -> f64 {
        (self.width() * self.width() + self.height() * self.height()).sqrt() * 0.5
    }

    /// Grows this extent to include the given point.
    pub fn expand_to_include(&mut self, x: f64, y: f64) {
        self.xmin = self.xmin.min(x);
        self.ymin = self.ymin.min(y);
        self.xmax = self.xmax.max(x);
        self.ymax = self.ymax.max(y);
    }

    /// An inverted extent that becomes valid after the first `expand_to_include`.
    pub fn empty() -> Self {
        Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN)
    }

    pub fn is_valid(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_and_centroid() {
        let extent = GeoExtent::new(-10.0, 20.0, 30.0, 40.0);
        assert_eq!(extent.width(), 40.0);
        assert_eq!(extent.height(), 20.0);
        assert_eq!(extent.centroid(), (10.0, 30.0));
    }

    #[test]
    fn test_contains_is_half_open() {
        let extent = GeoExtent::new(0.0, 0.0, 10.0, 10.0);
        assert!(extent.contains(0.0, 0.0));
        assert!(extent.contains(5.0, 9.99));
        assert!(!extent.contains(10.0, 5.0));
        assert!(!extent.contains(5.0, 10.0));
    }

    #[test]
    fn test_contains_within_closes_outer_edges() {
        let bounds = GeoExtent::new(0.0, 0.0, 20.0, 20.0);
        let north_east = GeoExtent::new(10.0, 10.0, 20.0, 20.0);
        let south_west = GeoExtent::new(0.0, 0.0, 10.0, 10.0);

        assert!(north_east.contains_within(20.0, 20.0, &bounds));
        assert!(north_east.contains_within(20.0, 15.0, &bounds));
        assert!(!north_east.contains(20.0, 20.0));
        // Interior edges stay half-open.
        assert!(!south_west.contains_within(10.0, 5.0, &bounds));
        assert!(!south_west.contains_within(5.0, 10.0, &bounds));
        assert!(south_west.contains_within(0.0, 0.0, &bounds));
    }

    #[test]
    fn test_intersects() {
        let a = GeoExtent::new(0.0, 0.0, 10.0, 10.0);
        let b = GeoExtent::new(5.0, 5.0, 15.0, 15.0);
        let c = GeoExtent::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c), "touching edges do not overlap");
    }

    #[test]
    fn test_radius() {
        let extent = GeoExtent::new(0.0, 0.0, 6.0, 8.0);
        assert!((extent.radius() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_expand_from_empty() {
        let mut extent = GeoExtent::empty();
        assert!(!extent.is_valid());
        extent.expand_to_include(1.0, 2.0);
        extent.expand_to_include(-1.0, 4.0);
        assert!(extent.is_valid());
        assert_eq!(extent, GeoExtent::new(-1.0, 2.0, 1.0, 4.0));
    }
}
