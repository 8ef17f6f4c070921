//! The map widget seen as an opaque drawable surface.

use std::collections::BTreeMap;

use foundation::GeoBounds;
use layers::{DrawableId, Gradient, VisiblePoint};
use serde::Serialize;

/// Presentation of one heatmap drawable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapSpec {
    pub gradient: Gradient,
    pub opacity: f64,
    pub max_intensity: f64,
}

/// Map viewport: center `(lat, lng)` and zoom, or a fitted region.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    Center { latitude: f64, longitude: f64, zoom: f64 },
    Fitted { bounds: [f64; 4] },
}

/// Shared display surface.
///
/// `attach`, `detach` and `remove` must tolerate redundant calls and unknown
/// ids; several completions may race to update the same layer.
pub trait DisplaySurface {
    fn create(&mut self, spec: &HeatmapSpec) -> DrawableId;
    /// Replace the drawable's points in place.
    fn set_data(&mut self, id: DrawableId, points: &[VisiblePoint]);
    fn attach(&mut self, id: DrawableId);
    fn detach(&mut self, id: DrawableId);
    fn is_attached(&self, id: DrawableId) -> bool;
    fn remove(&mut self, id: DrawableId);
    fn set_view(&mut self, latitude: f64, longitude: f64, zoom: f64);
    fn fit_bounds(&mut self, bounds: GeoBounds);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Create(DrawableId),
    SetData { id: DrawableId, points: usize },
    Attach(DrawableId),
    Detach(DrawableId),
    Remove(DrawableId),
    SetView(Viewport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDrawable {
    pub spec: HeatmapSpec,
    pub points: Vec<VisiblePoint>,
    pub attached: bool,
}

/// Headless surface that keeps every drawable and logs state-changing calls.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next_id: u64,
    drawables: BTreeMap<DrawableId, RecordedDrawable>,
    commands: Vec<SurfaceCommand>,
    viewport: Option<Viewport>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drawable(&self, id: DrawableId) -> Option<&RecordedDrawable> {
        self.drawables.get(&id)
    }

    pub fn drawables(&self) -> impl Iterator<Item = (DrawableId, &RecordedDrawable)> {
        self.drawables.iter().map(|(id, d)| (*id, d))
    }

    /// Live (not removed) drawables.
    pub fn drawable_count(&self) -> usize {
        self.drawables.len()
    }

    pub fn attached_count(&self) -> usize {
        self.drawables.values().filter(|d| d.attached).count()
    }

    /// Every drawable ever created, including removed ones.
    pub fn created_count(&self) -> usize {
        self.next_id as usize
    }

    pub fn commands(&self) -> &[SurfaceCommand] {
        &self.commands
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn fitted(&self) -> Option<[f64; 4]> {
        match self.viewport {
            Some(Viewport::Fitted { bounds }) => Some(bounds),
            _ => None,
        }
    }
}

impl DisplaySurface for RecordingSurface {
    fn create(&mut self, spec: &HeatmapSpec) -> DrawableId {
        let id = DrawableId(self.next_id);
        self.next_id += 1;
        self.drawables.insert(
            id,
            RecordedDrawable {
                spec: spec.clone(),
                points: Vec::new(),
                attached: false,
            },
        );
        self.commands.push(SurfaceCommand::Create(id));
        id
    }

    fn set_data(&mut self, id: DrawableId, points: &[VisiblePoint]) {
        if let Some(d) = self.drawables.get_mut(&id) {
            d.points = points.to_vec();
            self.commands.push(SurfaceCommand::SetData {
                id,
                points: points.len(),
            });
        }
    }

    fn attach(&mut self, id: DrawableId) {
        if let Some(d) = self.drawables.get_mut(&id) {
            if !d.attached {
                d.attached = true;
                self.commands.push(SurfaceCommand::Attach(id));
            }
        }
    }

    fn detach(&mut self, id: DrawableId) {
        if let Some(d) = self.drawables.get_mut(&id) {
            if d.attached {
                d.attached = false;
                self.commands.push(SurfaceCommand::Detach(id));
            }
        }
    }

    fn is_attached(&self, id: DrawableId) -> bool {
        self.drawables.get(&id).is_some_and(|d| d.attached)
    }

    fn remove(&mut self, id: DrawableId) {
        if self.drawables.remove(&id).is_some() {
            self.commands.push(SurfaceCommand::Remove(id));
        }
    }

    fn set_view(&mut self, latitude: f64, longitude: f64, zoom: f64) {
        let view = Viewport::Center {
            latitude,
            longitude,
            zoom,
        };
        self.viewport = Some(view);
        self.commands.push(SurfaceCommand::SetView(view));
    }

    fn fit_bounds(&mut self, bounds: GeoBounds) {
        let view = Viewport::Fitted {
            bounds: bounds.to_wsen(),
        };
        self.viewport = Some(view);
        self.commands.push(SurfaceCommand::SetView(view));
    }
}
