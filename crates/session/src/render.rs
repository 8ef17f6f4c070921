//! Reconciles layer visibility with what is drawn on the surface.
//!
//! Per layer: hidden layers have their drawables detached (never removed),
//! visible layers without data ask for a fetch, and visible layers with data
//! are drawn. Drawables are created once per layer and updated in place
//! afterwards.

use catalog::Catalog;
use foundation::LayerUrl;
use layers::{
    DrawableId, IntensityMode, Layer, LayerView, LevelDrawable, RenderSettings, RenderedHandle,
    VisiblePoint,
};
use runtime::metrics::{Metrics, DRAW_CREATED, DRAW_DETACHED, DRAW_UPDATED};

use crate::surface::{DisplaySurface, HeatmapSpec};

/// What a reconcile pass did for one layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerAction {
    /// Hidden and nothing attached.
    Idle,
    Hidden,
    NeedsFetch,
    Drawn { created: bool },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub needs_fetch: Vec<LayerUrl>,
    pub drawn: Vec<LayerUrl>,
    pub hidden: Vec<LayerUrl>,
}

impl RenderPlan {
    fn record(&mut self, url: &LayerUrl, action: LayerAction) {
        match action {
            LayerAction::Idle => {}
            LayerAction::Hidden => self.hidden.push(url.clone()),
            LayerAction::NeedsFetch => self.needs_fetch.push(url.clone()),
            LayerAction::Drawn { .. } => self.drawn.push(url.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderCoordinator {
    settings: RenderSettings,
}

impl RenderCoordinator {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Returns whether the threshold changed.
    pub fn set_threshold(&mut self, threshold: f64) -> bool {
        let changed = self.settings.threshold != threshold;
        self.settings.threshold = threshold;
        changed
    }

    /// Reconcile every layer of the catalog.
    pub fn reconcile(
        &self,
        catalog: &mut Catalog,
        surface: &mut dyn DisplaySurface,
        metrics: &mut Metrics,
    ) -> RenderPlan {
        let mut plan = RenderPlan::default();
        for layer in catalog.select_all_mut() {
            let action = self.reconcile_layer(layer, surface, metrics);
            plan.record(layer.url(), action);
        }
        plan
    }

    /// Re-filter layers that are visible and already have data. Never asks
    /// for a fetch.
    pub fn redraw_resident(
        &self,
        catalog: &mut Catalog,
        surface: &mut dyn DisplaySurface,
        metrics: &mut Metrics,
    ) -> RenderPlan {
        let mut plan = RenderPlan::default();
        for layer in catalog.select_all_mut().filter(|l| l.visible() && l.has_data()) {
            let action = self.reconcile_layer(layer, surface, metrics);
            plan.record(layer.url(), action);
        }
        plan
    }

    pub fn reconcile_layer(
        &self,
        layer: &mut Layer,
        surface: &mut dyn DisplaySurface,
        metrics: &mut Metrics,
    ) -> LayerAction {
        if !layer.visible() {
            return self.hide(layer, surface, metrics);
        }
        let Some(points) = layer.raw_data().cloned() else {
            return LayerAction::NeedsFetch;
        };

        let view = LayerView::build(&points, layer.mode(), &self.settings);
        let created = match layer.rendered().cloned() {
            Some(handle) => {
                update(&handle, &view, surface);
                metrics.inc(DRAW_UPDATED);
                false
            }
            None => {
                let handle = self.create(layer, &view, surface);
                metrics.add(DRAW_CREATED, handle.drawables().len() as u64);
                if !adopt(layer, handle, surface) {
                    return LayerAction::Idle;
                }
                true
            }
        };
        if let Some(handle) = layer.rendered() {
            for id in handle.drawables() {
                surface.attach(id);
            }
        }
        tracing::debug!(url = %layer.url(), points = view.len(), created, "layer drawn");
        layer.set_view(view);
        LayerAction::Drawn { created }
    }

    fn hide(
        &self,
        layer: &Layer,
        surface: &mut dyn DisplaySurface,
        metrics: &mut Metrics,
    ) -> LayerAction {
        let Some(handle) = layer.rendered() else {
            return LayerAction::Idle;
        };
        let mut detached = false;
        for id in handle.drawables() {
            if surface.is_attached(id) {
                surface.detach(id);
                metrics.inc(DRAW_DETACHED);
                detached = true;
            }
        }
        if detached {
            LayerAction::Hidden
        } else {
            LayerAction::Idle
        }
    }

    fn create(
        &self,
        layer: &Layer,
        view: &LayerView,
        surface: &mut dyn DisplaySurface,
    ) -> RenderedHandle {
        let spec = |level: u32| HeatmapSpec {
            gradient: layer.style().gradient_for_level(level).clone(),
            opacity: self.settings.heatmap.opacity,
            max_intensity: self.settings.heatmap.max_intensity,
        };
        match (layer.mode(), view) {
            (IntensityMode::Multi { .. }, LayerView::Multi(levels)) => RenderedHandle::Multi(
                levels
                    .iter()
                    .map(|lv| {
                        let drawable = surface.create(&spec(lv.level));
                        surface.set_data(drawable, &lv.points);
                        LevelDrawable {
                            level: lv.level,
                            drawable,
                        }
                    })
                    .collect(),
            ),
            _ => {
                let drawable = surface.create(&spec(0));
                let points: Vec<VisiblePoint> = view.points().copied().collect();
                surface.set_data(drawable, &points);
                RenderedHandle::Single(drawable)
            }
        }
    }
}

fn update(handle: &RenderedHandle, view: &LayerView, surface: &mut dyn DisplaySurface) {
    match (handle, view) {
        (RenderedHandle::Multi(drawables), LayerView::Multi(levels)) => {
            for LevelDrawable { level, drawable } in drawables {
                let points = levels
                    .iter()
                    .find(|lv| lv.level == *level)
                    .map(|lv| lv.points.as_slice())
                    .unwrap_or(&[]);
                surface.set_data(*drawable, points);
            }
        }
        _ => {
            let points: Vec<VisiblePoint> = view.points().copied().collect();
            for id in handle.drawables() {
                surface.set_data(id, &points);
            }
        }
    }
}

/// Hand freshly created drawables to the layer. A handle the layer refuses
/// is removed from the surface so nothing is left drawn but untracked.
fn adopt(layer: &mut Layer, handle: RenderedHandle, surface: &mut dyn DisplaySurface) -> bool {
    let drawables = handle.drawables();
    if layer.set_rendered(handle) {
        return true;
    }
    tracing::warn!(url = %layer.url(), "layer refused its drawables, removing them");
    for id in drawables {
        surface.remove(id);
    }
    false
}

/// Detach and remove every drawable of a catalog that is being replaced.
pub fn tear_down(catalog: &Catalog, surface: &mut dyn DisplaySurface) -> Vec<DrawableId> {
    let drawables = catalog.drawables();
    for id in &drawables {
        surface.detach(*id);
        surface.remove(*id);
    }
    drawables
}
