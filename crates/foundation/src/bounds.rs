use crate::geo::GeoPoint;

/// Geographic bounding box.
///
/// Coordinates are stored `[lon, lat]`, matching the `[W,S,E,N]` ordering used
/// by event bounding boxes. Boxes never wrap the antimeridian.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl GeoBounds {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        GeoBounds { min, max }
    }

    pub fn from_point(latitude: f64, longitude: f64) -> Self {
        GeoBounds {
            min: [longitude, latitude],
            max: [longitude, latitude],
        }
    }

    /// Build from `[west, south, east, north]`. Returns `None` for inverted or
    /// non-finite boxes.
    pub fn from_wsen(coords: [f64; 4]) -> Option<Self> {
        let [w, s, e, n] = coords;
        if !coords.iter().all(|c| c.is_finite()) || w > e || s > n {
            return None;
        }
        Some(GeoBounds::new([w, s], [e, n]))
    }

    /// Smallest box covering every point, or `None` when the iterator is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut out: Option<GeoBounds> = None;
        for p in points {
            match out.as_mut() {
                Some(b) => b.extend(p.latitude, p.longitude),
                None => out = Some(GeoBounds::from_point(p.latitude, p.longitude)),
            }
        }
        out
    }

    pub fn extend(&mut self, latitude: f64, longitude: f64) {
        self.min[0] = self.min[0].min(longitude);
        self.min[1] = self.min[1].min(latitude);
        self.max[0] = self.max[0].max(longitude);
        self.max[1] = self.max[1].max(latitude);
    }

    pub fn union(self, other: GeoBounds) -> GeoBounds {
        GeoBounds {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min[0]..=self.max[0]).contains(&longitude)
            && (self.min[1]..=self.max[1]).contains(&latitude)
    }

    pub fn west(&self) -> f64 {
        self.min[0]
    }

    pub fn south(&self) -> f64 {
        self.min[1]
    }

    pub fn east(&self) -> f64 {
        self.max[0]
    }

    pub fn north(&self) -> f64 {
        self.max[1]
    }

    /// `(latitude, longitude)` of the box center.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[0] + self.max[0]) * 0.5,
        )
    }

    pub fn to_wsen(&self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::GeoBounds;
    use crate::geo::GeoPoint;

    #[test]
    fn covers_all_points() {
        let pts = [
            GeoPoint::new(1.0, 2.0, 3.0),
            GeoPoint::new(-1.0, 5.0, 0.0),
            GeoPoint::new(0.5, -3.0, 1.0),
        ];
        let b = GeoBounds::from_points(&pts).unwrap();
        assert_eq!(b.to_wsen(), [-3.0, -1.0, 5.0, 1.0]);
        for p in &pts {
            assert!(b.contains(p.latitude, p.longitude));
        }
    }

    #[test]
    fn empty_input_has_no_bounds() {
        let pts: [GeoPoint; 0] = [];
        assert!(GeoBounds::from_points(&pts).is_none());
    }

    #[test]
    fn wsen_rejects_inverted_boxes() {
        assert!(GeoBounds::from_wsen([10.0, 0.0, 5.0, 1.0]).is_none());
        let b = GeoBounds::from_wsen([-62.0, 14.0, -60.0, 16.0]).unwrap();
        assert_eq!(b.center(), (15.0, -61.0));
    }

    #[test]
    fn union_grows_both_corners() {
        let a = GeoBounds::from_point(0.0, 0.0);
        let b = GeoBounds::from_point(2.0, -4.0);
        assert_eq!(a.union(b).to_wsen(), [-4.0, 0.0, 0.0, 2.0]);
    }
}
