use std::sync::Arc;

use foundation::{GeoPoint, LayerUrl, Version};

use crate::symbology::LayerStyle;
use crate::view::LayerView;

/// Handle to a drawable owned by the display surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawableId(pub u64);

/// Single continuous intensity, or one discrete level per legend entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntensityMode {
    Single,
    Multi { levels: usize },
}

impl IntensityMode {
    pub fn from_legend(legend: &[String]) -> Self {
        if legend.len() > 1 {
            IntensityMode::Multi {
                levels: legend.len(),
            }
        } else {
            IntensityMode::Single
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LevelDrawable {
    pub level: u32,
    pub drawable: DrawableId,
}

/// Drawables created for a layer. The variant always matches the layer's
/// `IntensityMode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedHandle {
    Single(DrawableId),
    Multi(Vec<LevelDrawable>),
}

impl RenderedHandle {
    pub fn drawables(&self) -> Vec<DrawableId> {
        match self {
            RenderedHandle::Single(id) => vec![*id],
            RenderedHandle::Multi(levels) => levels.iter().map(|l| l.drawable).collect(),
        }
    }

    pub fn matches(&self, mode: IntensityMode) -> bool {
        matches!(
            (self, mode),
            (RenderedHandle::Single(_), IntensityMode::Single)
                | (RenderedHandle::Multi(_), IntensityMode::Multi { .. })
        )
    }
}

/// One URL-addressed source of point data and its display state.
#[derive(Debug, Clone)]
pub struct Layer {
    url: LayerUrl,
    version: Version,
    name: String,
    description: String,
    legend: Vec<String>,
    style: LayerStyle,
    raw_data: Option<Arc<[GeoPoint]>>,
    view: Option<LayerView>,
    rendered: Option<RenderedHandle>,
    visible: bool,
}

impl Layer {
    /// A hidden layer with no data; description defaults to the name.
    pub fn new(url: LayerUrl, version: Version, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            url,
            version,
            description: name.clone(),
            name,
            legend: Vec::new(),
            style: LayerStyle::default(),
            raw_data: None,
            view: None,
            rendered: None,
            visible: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_legend(mut self, legend: Vec<String>) -> Self {
        self.legend = legend;
        self
    }

    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = style;
        self
    }

    pub fn url(&self) -> &LayerUrl {
        &self.url
    }

    /// Version group this layer belongs to.
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn legend(&self) -> &[String] {
        &self.legend
    }

    pub fn style(&self) -> &LayerStyle {
        &self.style
    }

    pub fn mode(&self) -> IntensityMode {
        IntensityMode::from_legend(&self.legend)
    }

    pub fn is_multi_intensity(&self) -> bool {
        matches!(self.mode(), IntensityMode::Multi { .. })
    }

    pub fn raw_data(&self) -> Option<&Arc<[GeoPoint]>> {
        self.raw_data.as_ref()
    }

    pub fn has_data(&self) -> bool {
        self.raw_data.is_some()
    }

    /// Store fetched points. Data is immutable once resident; returns `false`
    /// if the layer already had data.
    pub fn set_raw_data(&mut self, points: Arc<[GeoPoint]>) -> bool {
        if self.raw_data.is_some() {
            return false;
        }
        self.raw_data = Some(points);
        true
    }

    pub fn view(&self) -> Option<&LayerView> {
        self.view.as_ref()
    }

    pub fn set_view(&mut self, view: LayerView) {
        self.view = Some(view);
    }

    pub fn rendered(&self) -> Option<&RenderedHandle> {
        self.rendered.as_ref()
    }

    /// Record the drawables created for this layer.
    ///
    /// Only valid once data is resident; a handle is never replaced by one of
    /// the other intensity mode.
    pub fn set_rendered(&mut self, handle: RenderedHandle) -> bool {
        if self.raw_data.is_none() || !handle.matches(self.mode()) {
            return false;
        }
        self.rendered = Some(handle);
        true
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Returns whether the flag changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{DrawableId, IntensityMode, Layer, LevelDrawable, RenderedHandle};
    use foundation::{GeoPoint, LayerUrl, Version};

    fn layer() -> Layer {
        Layer::new(LayerUrl::from("u1"), Version::from("v1"), "A")
    }

    #[test]
    fn new_layers_are_hidden_and_empty() {
        let l = layer();
        assert!(!l.visible());
        assert!(!l.has_data());
        assert!(l.rendered().is_none());
        assert_eq!(l.description(), "A");
        assert_eq!(l.mode(), IntensityMode::Single);
    }

    #[test]
    fn legend_length_selects_mode() {
        let l = layer().with_legend(vec!["only".to_string()]);
        assert_eq!(l.mode(), IntensityMode::Single);
        let l = layer().with_legend(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(l.mode(), IntensityMode::Multi { levels: 3 });
        assert!(l.is_multi_intensity());
    }

    #[test]
    fn raw_data_is_set_once() {
        let mut l = layer();
        let first: Arc<[GeoPoint]> = Arc::from(vec![GeoPoint::new(1.0, 2.0, 3.0)]);
        assert!(l.set_raw_data(first.clone()));
        assert!(!l.set_raw_data(Arc::from(Vec::new())));
        assert_eq!(l.raw_data().map(|d| d.len()), Some(1));
    }

    #[test]
    fn handle_requires_data_and_matching_mode() {
        let mut l = layer();
        assert!(!l.set_rendered(RenderedHandle::Single(DrawableId(1))));
        l.set_raw_data(Arc::from(Vec::new()));
        assert!(!l.set_rendered(RenderedHandle::Multi(vec![LevelDrawable {
            level: 1,
            drawable: DrawableId(1),
        }])));
        assert!(l.set_rendered(RenderedHandle::Single(DrawableId(1))));
        assert_eq!(l.rendered().unwrap().drawables(), vec![DrawableId(1)]);
    }

    #[test]
    fn visibility_reports_changes() {
        let mut l = layer();
        assert!(l.set_visible(true));
        assert!(!l.set_visible(true));
        assert!(l.set_visible(false));
    }
}
