//! Session driver: one catalog, one display surface, one fetch pipeline.
//!
//! Every operation runs on a single thread. State lives in a `RefCell` that is
//! never borrowed across an `.await`; after each suspension the session
//! re-reads current state (catalog generation, visibility) instead of trusting
//! what it saw before the fetch started.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use catalog::{ApprovalState, BuildReport, Catalog, CatalogError, CatalogMode, CatalogSummary};
use formats::{EventDetail, EventSummary};
use foundation::{GeoBounds, Generation, LayerUrl, Version};
use futures_util::future::join_all;
use layers::{Palette, RenderSettings};
use runtime::event_bus::{Event, EventBus, Listener, StateChange};
use runtime::metrics::{Metrics, MetricsSnapshot, CATALOG_LOADS, FETCH_CACHE_HIT, FETCH_STALE};
use serde::Serialize;
use streaming::{CacheKey, CatalogApi, FetchError, FetchPipeline, LayerScope, PointSource};

use crate::query::ViewQuery;
use crate::render::{tear_down, LayerAction, RenderCoordinator, RenderPlan};
use crate::surface::DisplaySurface;
use crate::viewport::{visible_bounds, AutoFit, DEFAULT_CENTER, DEFAULT_ZOOM};

/// Layers switched on right after a catalog load.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum InitialSelection {
    None,
    /// First layer of the first group.
    #[default]
    First,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct ViewerOptions {
    pub settings: RenderSettings,
    pub initial: InitialSelection,
    pub palette: Palette,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerStatus {
    Idle,
    Loading,
    Ready { points: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    NoEvent,
    Catalog(CatalogError),
    Fetch(FetchError),
    /// The catalog was replaced while the operation was waiting on the network.
    Superseded,
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::NoEvent => write!(f, "no event selected"),
            ViewerError::Catalog(err) => write!(f, "{err}"),
            ViewerError::Fetch(err) => write!(f, "{err}"),
            ViewerError::Superseded => write!(f, "catalog was reloaded during the operation"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewerError::Catalog(err) => Some(err),
            ViewerError::Fetch(err) => Some(err),
            ViewerError::NoEvent | ViewerError::Superseded => None,
        }
    }
}

impl From<CatalogError> for ViewerError {
    fn from(err: CatalogError) -> Self {
        ViewerError::Catalog(err)
    }
}

impl From<FetchError> for ViewerError {
    fn from(err: FetchError) -> Self {
        ViewerError::Fetch(err)
    }
}

/// How `ensure_data` was satisfied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataOutcome {
    /// Already resident; no network access.
    Cached { points: usize },
    /// Downloaded, by this call or by the in-flight fetch it joined.
    Fetched { points: usize, joined: bool },
    /// The catalog was replaced while the fetch ran; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub generation: Generation,
    pub event: String,
    pub groups: usize,
    pub layers: usize,
    pub build: BuildReport,
    /// Whether the event's bounding box framed the surface.
    pub framed: bool,
}

struct Session<S> {
    catalog: Catalog,
    surface: S,
    coordinator: RenderCoordinator,
    bus: EventBus,
    statuses: BTreeMap<LayerUrl, LayerStatus>,
    auto_fit: AutoFit,
}

pub struct Viewer<S> {
    api: Rc<dyn CatalogApi>,
    pipeline: FetchPipeline,
    metrics: Rc<RefCell<Metrics>>,
    initial: InitialSelection,
    palette: Palette,
    session: RefCell<Session<S>>,
}

impl<S: DisplaySurface> Viewer<S> {
    pub fn new(
        api: Rc<dyn CatalogApi>,
        source: Rc<dyn PointSource>,
        surface: S,
        options: ViewerOptions,
    ) -> Self {
        let metrics = Rc::new(RefCell::new(Metrics::new()));
        Self {
            api,
            pipeline: FetchPipeline::new(source, metrics.clone()),
            metrics,
            initial: options.initial,
            palette: options.palette,
            session: RefCell::new(Session {
                catalog: Catalog::empty(Generation::default(), CatalogMode::Approved),
                surface,
                coordinator: RenderCoordinator::new(options.settings),
                bus: EventBus::new(),
                statuses: BTreeMap::new(),
                auto_fit: AutoFit::default(),
            }),
        }
    }

    /// Event listing; a failed request yields an empty list.
    pub async fn events(&self) -> Vec<EventSummary> {
        match self.api.events().await {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(error = %err, "event listing failed");
                Vec::new()
            }
        }
    }

    /// Replace the catalog with the listing selected by `query`, frame the
    /// event, apply the initial selection and draw it.
    ///
    /// Catalog request failures degrade to an empty catalog.
    pub async fn load(&self, query: &ViewQuery) -> Result<LoadReport, ViewerError> {
        let event = query.event.clone().ok_or(ViewerError::NoEvent)?;
        let scope = query.scope();
        let mode = match scope {
            LayerScope::Approved => CatalogMode::Approved,
            LayerScope::Pending => CatalogMode::Pending,
            LayerScope::Single(_) => CatalogMode::Snapshot,
        };

        let detail = match self.api.event(&event).await {
            Ok(detail) => detail,
            Err(err) => {
                tracing::warn!(%event, error = %err, "event detail failed");
                EventDetail::default()
            }
        };
        let payloads = match self.api.layers(&event, &scope).await {
            Ok(payloads) => payloads,
            Err(err) => {
                tracing::warn!(%event, error = %err, "layer listing failed, showing empty catalog");
                Vec::new()
            }
        };

        let (report, needs_fetch) = {
            let mut session = self.session.borrow_mut();
            let session = &mut *session;
            let mut metrics = self.metrics.borrow_mut();

            let generation = session.catalog.generation().next();
            let (catalog, build) =
                Catalog::build_with_palette(generation, mode, &payloads, self.palette.clone());
            let removed = tear_down(&session.catalog, &mut session.surface);
            session.catalog = catalog.with_event(event.clone());
            session.statuses.clear();
            metrics.inc(CATALOG_LOADS);

            let framed = match detail.bounding_box_coords.and_then(GeoBounds::from_wsen) {
                Some(bounds) => {
                    session.surface.fit_bounds(bounds);
                    true
                }
                None => {
                    session
                        .surface
                        .set_view(DEFAULT_CENTER.0, DEFAULT_CENTER.1, DEFAULT_ZOOM);
                    false
                }
            };

            let selection = if mode == CatalogMode::Snapshot {
                InitialSelection::All
            } else {
                self.initial
            };
            let take = match selection {
                InitialSelection::None => 0,
                InitialSelection::First => 1,
                InitialSelection::All => usize::MAX,
            };
            for layer in session.catalog.select_all_mut().take(take) {
                layer.set_visible(true);
            }
            session.auto_fit.arm();

            let report = LoadReport {
                generation,
                event: event.clone(),
                groups: session.catalog.groups().len(),
                layers: session.catalog.layer_count(),
                build,
                framed,
            };
            if !report.build.is_clean() {
                tracing::warn!(
                    %event,
                    duplicate_versions = report.build.duplicate_versions.len(),
                    duplicate_layers = report.build.duplicate_layers.len(),
                    dropped_groups = report.build.dropped_groups,
                    "catalog response had entries that were skipped"
                );
            }
            tracing::info!(
                %event,
                %generation,
                groups = report.groups,
                layers = report.layers,
                removed_drawables = removed.len(),
                "catalog loaded"
            );
            session.bus.emit(StateChange::CatalogReplaced {
                generation,
                layers: report.layers,
            });

            let plan = session.coordinator.reconcile(
                &mut session.catalog,
                &mut session.surface,
                &mut metrics,
            );
            (report, plan.needs_fetch)
        };

        self.fetch_all(&needs_fetch).await;
        Ok(report)
    }

    /// Reconcile every layer and fetch whatever visible layers still lack data.
    pub async fn render(&self) -> RenderPlan {
        let plan = {
            let mut session = self.session.borrow_mut();
            let session = &mut *session;
            session.coordinator.reconcile(
                &mut session.catalog,
                &mut session.surface,
                &mut self.metrics.borrow_mut(),
            )
        };
        self.fetch_all(&plan.needs_fetch).await;
        plan
    }

    async fn fetch_all(&self, urls: &[LayerUrl]) {
        // Failures are recorded in the layer statuses.
        let _ = join_all(urls.iter().map(|url| self.ensure_data(url))).await;
    }

    /// Show or hide a layer. Showing a layer without data fetches it; the
    /// fetch error, if any, is returned after being recorded in its status.
    pub async fn set_visibility(&self, url: &LayerUrl, visible: bool) -> Result<(), ViewerError> {
        let action = {
            let mut session = self.session.borrow_mut();
            let session = &mut *session;
            if session.catalog.set_visibility(url, visible)? {
                session.bus.emit(StateChange::VisibilityChanged {
                    url: url.clone(),
                    visible,
                });
                if visible {
                    session.auto_fit.arm();
                }
            }
            let layer = session
                .catalog
                .layer_mut(url)
                .ok_or_else(|| CatalogError::UnknownLayer(url.clone()))?;
            let action = session.coordinator.reconcile_layer(
                layer,
                &mut session.surface,
                &mut self.metrics.borrow_mut(),
            );
            if matches!(action, LayerAction::Drawn { .. }) {
                if let Some(bounds) = session.auto_fit.take(&session.catalog) {
                    session.surface.fit_bounds(bounds);
                }
            }
            action
        };

        if action == LayerAction::NeedsFetch {
            self.ensure_data(url).await?;
        }
        Ok(())
    }

    /// Re-filter every shown layer under a new threshold. Never fetches and
    /// never moves the viewport.
    pub fn set_threshold(&self, threshold: f64) -> RenderPlan {
        let mut session = self.session.borrow_mut();
        let session = &mut *session;
        if session.coordinator.set_threshold(threshold) {
            session.bus.emit(StateChange::ThresholdChanged { threshold });
        }
        session.coordinator.redraw_resident(
            &mut session.catalog,
            &mut session.surface,
            &mut self.metrics.borrow_mut(),
        )
    }

    /// Frame every visible point. Leaves the viewport alone when nothing is
    /// visible.
    pub fn fit_to_visible(&self) -> Option<GeoBounds> {
        let mut session = self.session.borrow_mut();
        let bounds = visible_bounds(&session.catalog)?;
        session.surface.fit_bounds(bounds);
        Some(bounds)
    }

    /// Make the layer's points resident.
    ///
    /// Resident data is never refetched. Concurrent calls for the same layer
    /// share one download. A download that finishes after the catalog was
    /// replaced is dropped. Visibility is checked again once data arrives, so
    /// a layer hidden meanwhile is cached but not drawn.
    pub async fn ensure_data(&self, url: &LayerUrl) -> Result<DataOutcome, FetchError> {
        let (generation, handle) = {
            let mut session = self.session.borrow_mut();
            let generation = session.catalog.generation();
            let layer = session
                .catalog
                .layer(url)
                .ok_or_else(|| FetchError::UnknownLayer(url.clone()))?;
            if let Some(points) = layer.raw_data() {
                self.metrics.borrow_mut().inc(FETCH_CACHE_HIT);
                tracing::debug!(%url, "layer data already resident");
                return Ok(DataOutcome::Cached {
                    points: points.len(),
                });
            }
            session.statuses.insert(url.clone(), LayerStatus::Loading);
            (
                generation,
                self.pipeline.fetch(CacheKey::new(generation, url.clone())),
            )
        };

        let started = handle.started;
        let result = handle.wait().await;

        let mut session = self.session.borrow_mut();
        let session = &mut *session;
        if session.catalog.generation() != generation {
            if started {
                self.metrics.borrow_mut().inc(FETCH_STALE);
                tracing::debug!(%url, %generation, "dropping fetch for a replaced catalog");
            }
            return Ok(DataOutcome::Stale);
        }

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                if started {
                    session.bus.emit(StateChange::FetchFailed {
                        url: url.clone(),
                        reason: err.to_string(),
                    });
                }
                session.statuses.insert(
                    url.clone(),
                    LayerStatus::Failed {
                        reason: err.to_string(),
                    },
                );
                return Err(err);
            }
        };

        let points = fetched.points.len();
        let layer = session
            .catalog
            .layer_mut(url)
            .ok_or_else(|| FetchError::UnknownLayer(url.clone()))?;
        if layer.set_raw_data(fetched.points) {
            session
                .statuses
                .insert(url.clone(), LayerStatus::Ready { points });
            session.bus.emit(StateChange::DataArrived {
                url: url.clone(),
                points,
            });
            let action = session.coordinator.reconcile_layer(
                layer,
                &mut session.surface,
                &mut self.metrics.borrow_mut(),
            );
            if matches!(action, LayerAction::Drawn { .. }) {
                if let Some(bounds) = session.auto_fit.take(&session.catalog) {
                    session.surface.fit_bounds(bounds);
                }
            }
        }
        Ok(DataOutcome::Fetched {
            points,
            joined: !started,
        })
    }

    /// Submit a pending version group for approval.
    ///
    /// Each group can be submitted once; a rejection or transport failure is
    /// terminal and not retried.
    pub async fn approve(&self, version: &Version) -> Result<ApprovalState, ViewerError> {
        let (event, generation) = {
            let mut session = self.session.borrow_mut();
            let session = &mut *session;
            session.catalog.begin_approval(version)?;
            session.bus.emit(StateChange::ApprovalChanged {
                version: version.clone(),
                state: ApprovalState::Submitting.label().to_string(),
            });
            (
                session.catalog.event().unwrap_or_default().to_string(),
                session.catalog.generation(),
            )
        };

        let answer = self.api.approve(&event, version).await;

        let mut session = self.session.borrow_mut();
        let session = &mut *session;
        if session.catalog.generation() != generation {
            return Err(ViewerError::Superseded);
        }
        let (ok, status) = match answer {
            Ok(response) => (response.ok, response.status),
            Err(err) => {
                tracing::warn!(%event, %version, error = %err, "approval request failed");
                (false, 0)
            }
        };
        let state = session.catalog.finish_approval(version, ok, status)?;
        if ok {
            tracing::info!(%event, %version, "version approved");
        } else {
            tracing::warn!(%event, %version, status, "approval rejected");
        }
        session.bus.emit(StateChange::ApprovalChanged {
            version: version.clone(),
            state: state.label().to_string(),
        });
        Ok(state)
    }

    /// The group's metadata document, or `None` when it has no link or the
    /// request fails.
    pub async fn group_metadata(&self, version: &Version) -> Option<serde_json::Value> {
        let url = {
            let session = self.session.borrow();
            session.catalog.group(version)?.metadata_url()?.to_string()
        };
        match self.api.metadata(&url).await {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::warn!(%version, %url, error = %err, "metadata request failed");
                None
            }
        }
    }

    /// Observe state changes as they happen.
    ///
    /// Listeners run while the session is borrowed and must not call back
    /// into the viewer.
    pub fn subscribe(&self, listener: Listener) {
        self.session.borrow_mut().bus.subscribe(listener);
    }

    pub fn drain_events(&self) -> Vec<Event> {
        self.session.borrow_mut().bus.drain()
    }

    pub fn status(&self, url: &LayerUrl) -> LayerStatus {
        self.session
            .borrow()
            .statuses
            .get(url)
            .cloned()
            .unwrap_or(LayerStatus::Idle)
    }

    /// Status of every layer, catalog order.
    pub fn statuses(&self) -> Vec<(LayerUrl, LayerStatus)> {
        let session = self.session.borrow();
        session
            .catalog
            .select_all()
            .map(|l| {
                let status = session
                    .statuses
                    .get(l.url())
                    .cloned()
                    .unwrap_or(LayerStatus::Idle);
                (l.url().clone(), status)
            })
            .collect()
    }

    pub fn settings(&self) -> RenderSettings {
        *self.session.borrow().coordinator.settings()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.borrow().snapshot()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.metrics.borrow().counter(name)
    }

    pub fn summary(&self) -> CatalogSummary {
        self.session.borrow().catalog.summary()
    }

    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        f(&self.session.borrow().catalog)
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.session.borrow().surface)
    }
}

impl<S> std::fmt::Debug for Viewer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.borrow();
        f.debug_struct("Viewer")
            .field("generation", &session.catalog.generation())
            .field("layers", &session.catalog.layer_count())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
