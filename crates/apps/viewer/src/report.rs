use catalog::CatalogSummary;
use layers::{RenderedHandle, RenderSettings};
use serde::Serialize;
use session::{LayerStatus, RecordingSurface, Viewer, Viewport};

#[derive(Debug, Serialize)]
pub struct RenderReport {
    pub settings: RenderSettings,
    pub catalog: CatalogSummary,
    pub layers: Vec<LayerReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    pub counters: Vec<(String, u64)>,
}

#[derive(Debug, Serialize)]
pub struct LayerReport {
    pub url: String,
    pub visible: bool,
    pub status: LayerStatus,
    pub drawables: Vec<DrawableReport>,
}

#[derive(Debug, Serialize)]
pub struct DrawableReport {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    pub attached: bool,
    pub points: usize,
}

impl RenderReport {
    pub fn collect(viewer: &Viewer<RecordingSurface>) -> Self {
        let statuses = viewer.statuses();
        let layers = viewer.with_surface(|surface| {
            viewer.with_catalog(|catalog| {
                catalog
                    .select_all()
                    .zip(statuses)
                    .map(|(layer, (_, status))| {
                        let ids: Vec<_> = match layer.rendered() {
                            Some(RenderedHandle::Single(id)) => vec![(None, *id)],
                            Some(RenderedHandle::Multi(levels)) => levels
                                .iter()
                                .map(|l| (Some(l.level), l.drawable))
                                .collect(),
                            None => Vec::new(),
                        };
                        LayerReport {
                            url: layer.url().to_string(),
                            visible: layer.visible(),
                            status,
                            drawables: ids
                                .into_iter()
                                .map(|(level, id)| {
                                    let drawn = surface.drawable(id);
                                    DrawableReport {
                                        id: id.0,
                                        level,
                                        attached: drawn.is_some_and(|d| d.attached),
                                        points: drawn.map_or(0, |d| d.points.len()),
                                    }
                                })
                                .collect(),
                        }
                    })
                    .collect()
            })
        });

        RenderReport {
            settings: viewer.settings(),
            catalog: viewer.summary(),
            layers,
            viewport: viewer.with_surface(|s| s.viewport()),
            counters: viewer.metrics().counters,
        }
    }
}
