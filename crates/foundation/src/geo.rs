/// One parsed point-data record.
///
/// Latitude and longitude are WGS84 degrees. `intensity` is the weight supplied
/// by the data source (a small integer-like severity, observed `0..=5`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub intensity: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64, intensity: f64) -> Self {
        Self {
            latitude,
            longitude,
            intensity,
        }
    }

    pub fn has_valid_location(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// The intensity as a discrete level, if it is exactly a non-negative integer.
    pub fn intensity_level(&self) -> Option<u32> {
        let w = self.intensity;
        if w.is_finite() && w >= 0.0 && w.fract() == 0.0 && w <= u32::MAX as f64 {
            Some(w as u32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;

    #[test]
    fn location_range_is_checked() {
        assert!(GeoPoint::new(15.2, -61.25, 3.0).has_valid_location());
        assert!(GeoPoint::new(-90.0, 180.0, 0.0).has_valid_location());
        assert!(!GeoPoint::new(90.5, 0.0, 0.0).has_valid_location());
        assert!(!GeoPoint::new(0.0, -181.0, 0.0).has_valid_location());
        assert!(!GeoPoint::new(f64::NAN, 0.0, 0.0).has_valid_location());
    }

    #[test]
    fn only_exact_integers_are_levels() {
        assert_eq!(GeoPoint::new(0.0, 0.0, 3.0).intensity_level(), Some(3));
        assert_eq!(GeoPoint::new(0.0, 0.0, 0.0).intensity_level(), Some(0));
        assert_eq!(GeoPoint::new(0.0, 0.0, 2.5).intensity_level(), None);
        assert_eq!(GeoPoint::new(0.0, 0.0, -1.0).intensity_level(), None);
    }
}
