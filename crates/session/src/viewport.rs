use catalog::Catalog;
use foundation::GeoBounds;

/// Initial map center `(lat, lng)` before any event or data framing.
pub const DEFAULT_CENTER: (f64, f64) = (15.231458142, -61.2507115);
pub const DEFAULT_ZOOM: f64 = 10.0;

/// Region covering every filtered point of every visible layer.
///
/// `None` when nothing is visible; the viewport must then stay where it is.
pub fn visible_bounds(catalog: &Catalog) -> Option<GeoBounds> {
    catalog
        .visible_layers()
        .filter_map(|l| l.view())
        .filter_map(|view| GeoBounds::from_points(view.points().map(|p| &p.location)))
        .reduce(GeoBounds::union)
}

/// One-shot auto-framing.
///
/// Armed by a catalog load or a layer being switched on, consumed by the next
/// draw that produces visible points. Threshold changes never arm it.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AutoFit {
    armed: bool,
}

impl AutoFit {
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Bounds to fit, disarming on success.
    pub fn take(&mut self, catalog: &Catalog) -> Option<GeoBounds> {
        if !self.armed {
            return None;
        }
        let bounds = visible_bounds(catalog)?;
        self.armed = false;
        Some(bounds)
    }
}

#[cfg(test)]
mod tests {
    use catalog::{Catalog, CatalogMode};
    use formats::{GroupPayload, LayerRef};
    use foundation::{GeoPoint, Generation, LayerUrl};
    use layers::{IntensityMode, LayerView, RenderSettings};

    use super::{visible_bounds, AutoFit};

    fn catalog() -> Catalog {
        let payload = GroupPayload {
            version: "v1".to_string(),
            layers: ["u1", "u2"]
                .iter()
                .map(|u| LayerRef {
                    name: u.to_string(),
                    url: u.to_string(),
                })
                .collect(),
            metadata_url: None,
            metadata: None,
        };
        let (mut catalog, _) = Catalog::build(Generation(1), CatalogMode::Approved, &[payload]);
        let settings = RenderSettings::default();
        for (url, pts) in [
            ("u1", vec![GeoPoint::new(10.0, -60.0, 3.0), GeoPoint::new(11.0, -61.0, 0.0)]),
            ("u2", vec![GeoPoint::new(12.0, -59.0, 2.0)]),
        ] {
            let layer = catalog.layer_mut(&LayerUrl::from(url)).unwrap();
            layer.set_view(LayerView::build(&pts, IntensityMode::Single, &settings));
        }
        catalog
    }

    #[test]
    fn nothing_visible_means_no_region() {
        assert_eq!(visible_bounds(&catalog()), None);
    }

    #[test]
    fn covers_all_visible_layers_after_filtering() {
        let mut catalog = catalog();
        catalog.set_visibility(&LayerUrl::from("u1"), true).unwrap();
        catalog.set_visibility(&LayerUrl::from("u2"), true).unwrap();
        let b = visible_bounds(&catalog).unwrap();
        assert_eq!(b.to_wsen(), [-60.0, 10.0, -59.0, 12.0]);
    }

    #[test]
    fn auto_fit_fires_once() {
        let mut catalog = catalog();
        let mut fit = AutoFit::default();
        fit.arm();
        assert_eq!(fit.take(&catalog), None);
        assert!(fit.is_armed());

        catalog.set_visibility(&LayerUrl::from("u2"), true).unwrap();
        assert!(fit.take(&catalog).is_some());
        assert_eq!(fit.take(&catalog), None);
    }
}
