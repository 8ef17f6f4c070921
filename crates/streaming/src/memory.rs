//! In-memory collaborators for tests, demos and offline runs.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use bytes::Bytes;
use formats::{ApprovalResponse, EventDetail, EventSummary, GroupPayload};
use foundation::{LayerUrl, Version};
use futures_util::future::{FutureExt, LocalBoxFuture};
use futures_util::stream::{self, StreamExt};
use tokio::sync::Notify;

use crate::api::{CatalogApi, ChunkStream, LayerScope, PointSource, SourceError};

#[derive(Debug, Clone)]
enum Body {
    Data(Bytes),
    Gated { data: Bytes, gate: Rc<Notify> },
    FailAfter { data: Bytes, error: SourceError },
}

/// Point files held in memory.
///
/// Bodies are delivered in `chunk_size` pieces so decoders see records split
/// across chunks. Unknown URLs answer with status 404.
#[derive(Debug)]
pub struct MemoryPointSource {
    bodies: RefCell<BTreeMap<LayerUrl, Body>>,
    opened: RefCell<BTreeMap<LayerUrl, usize>>,
    chunk_size: Cell<usize>,
}

impl Default for MemoryPointSource {
    fn default() -> Self {
        Self {
            bodies: RefCell::new(BTreeMap::new()),
            opened: RefCell::new(BTreeMap::new()),
            chunk_size: Cell::new(64 * 1024),
        }
    }
}

impl MemoryPointSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        self.chunk_size.set(chunk_size.max(1));
        self
    }

    pub fn insert(&self, url: impl Into<LayerUrl>, body: &str) {
        self.bodies
            .borrow_mut()
            .insert(url.into(), Body::Data(Bytes::from(body.to_string())));
    }

    /// Like `insert`, but the stream yields nothing until the returned gate is
    /// notified.
    pub fn insert_gated(&self, url: impl Into<LayerUrl>, body: &str) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        self.bodies.borrow_mut().insert(
            url.into(),
            Body::Gated {
                data: Bytes::from(body.to_string()),
                gate: gate.clone(),
            },
        );
        gate
    }

    /// Deliver `body`, then fail the stream with `error`.
    pub fn insert_failing(&self, url: impl Into<LayerUrl>, body: &str, error: SourceError) {
        self.bodies.borrow_mut().insert(
            url.into(),
            Body::FailAfter {
                data: Bytes::from(body.to_string()),
                error,
            },
        );
    }

    /// Number of streams opened for `url`.
    pub fn opened(&self, url: &LayerUrl) -> usize {
        self.opened.borrow().get(url).copied().unwrap_or(0)
    }

    pub fn total_opened(&self) -> usize {
        self.opened.borrow().values().sum()
    }

    fn chunks(&self, data: &Bytes) -> Vec<Result<Bytes, SourceError>> {
        let size = self.chunk_size.get();
        (0..data.len())
            .step_by(size)
            .map(|start| Ok(data.slice(start..(start + size).min(data.len()))))
            .collect()
    }
}

impl PointSource for MemoryPointSource {
    fn open(&self, url: &LayerUrl) -> ChunkStream {
        *self.opened.borrow_mut().entry(url.clone()).or_insert(0) += 1;

        let body = self.bodies.borrow().get(url).cloned();
        match body {
            None => stream::iter(vec![Err(SourceError::Status(404))]).boxed_local(),
            Some(Body::Data(data)) => stream::iter(self.chunks(&data)).boxed_local(),
            Some(Body::FailAfter { data, error }) => {
                let mut items = self.chunks(&data);
                items.push(Err(error));
                stream::iter(items).boxed_local()
            }
            Some(Body::Gated { data, gate }) => {
                let items = self.chunks(&data);
                stream::once(async move { gate.notified().await })
                    .flat_map(move |()| stream::iter(items.clone()))
                    .boxed_local()
            }
        }
    }
}

/// Catalog service answering from fixed responses.
#[derive(Debug, Default)]
pub struct MemoryCatalogApi {
    events: Vec<EventSummary>,
    details: BTreeMap<String, EventDetail>,
    listings: RefCell<BTreeMap<String, Result<Vec<GroupPayload>, SourceError>>>,
    approvals: BTreeMap<String, Result<ApprovalResponse, SourceError>>,
    documents: BTreeMap<String, serde_json::Value>,
    layer_calls: Cell<usize>,
    approve_calls: Cell<usize>,
}

impl MemoryCatalogApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event: EventSummary) -> Self {
        if let Some(coords) = event.bounding_box_coords {
            self.details.insert(
                event.name.clone(),
                EventDetail {
                    bounding_box_coords: Some(coords),
                },
            );
        }
        self.events.push(event);
        self
    }

    pub fn with_layers(self, event: &str, scope: LayerScope, groups: Vec<GroupPayload>) -> Self {
        self.set_layers(event, scope, Ok(groups));
        self
    }

    pub fn with_approval(
        mut self,
        event: &str,
        version: &str,
        answer: Result<ApprovalResponse, SourceError>,
    ) -> Self {
        self.approvals
            .insert(approval_key(event, &Version::from(version)), answer);
        self
    }

    pub fn with_document(mut self, url: &str, doc: serde_json::Value) -> Self {
        self.documents.insert(url.to_string(), doc);
        self
    }

    /// Replace a listing after construction, e.g. to serve a newer release on reload.
    pub fn set_layers(
        &self,
        event: &str,
        scope: LayerScope,
        answer: Result<Vec<GroupPayload>, SourceError>,
    ) {
        self.listings.borrow_mut().insert(scope.path(event), answer);
    }

    pub fn layer_calls(&self) -> usize {
        self.layer_calls.get()
    }

    pub fn approve_calls(&self) -> usize {
        self.approve_calls.get()
    }
}

fn approval_key(event: &str, version: &Version) -> String {
    crate::api::approve_path(event, version)
}

impl CatalogApi for MemoryCatalogApi {
    fn events(&self) -> LocalBoxFuture<'_, Result<Vec<EventSummary>, SourceError>> {
        let events = self.events.clone();
        async move { Ok(events) }.boxed_local()
    }

    fn event<'a>(&'a self, name: &'a str) -> LocalBoxFuture<'a, Result<EventDetail, SourceError>> {
        async move { Ok(self.details.get(name).cloned().unwrap_or_default()) }.boxed_local()
    }

    fn layers<'a>(
        &'a self,
        event: &'a str,
        scope: &'a LayerScope,
    ) -> LocalBoxFuture<'a, Result<Vec<GroupPayload>, SourceError>> {
        async move {
            self.layer_calls.set(self.layer_calls.get() + 1);
            self.listings
                .borrow()
                .get(&scope.path(event))
                .cloned()
                .unwrap_or(Err(SourceError::Status(404)))
        }
        .boxed_local()
    }

    fn approve<'a>(
        &'a self,
        event: &'a str,
        version: &'a Version,
    ) -> LocalBoxFuture<'a, Result<ApprovalResponse, SourceError>> {
        async move {
            self.approve_calls.set(self.approve_calls.get() + 1);
            self.approvals
                .get(&approval_key(event, version))
                .cloned()
                .unwrap_or(Ok(ApprovalResponse {
                    ok: false,
                    status: 404,
                }))
        }
        .boxed_local()
    }

    fn metadata<'a>(
        &'a self,
        url: &'a str,
    ) -> LocalBoxFuture<'a, Result<serde_json::Value, SourceError>> {
        async move {
            self.documents
                .get(url)
                .cloned()
                .ok_or(SourceError::Status(404))
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::{MemoryPointSource, PointSource, SourceError};
    use foundation::LayerUrl;

    async fn collect(source: &MemoryPointSource, url: &str) -> Vec<Result<Vec<u8>, SourceError>> {
        source
            .open(&LayerUrl::from(url))
            .map(|r| r.map(|b| b.to_vec()))
            .collect()
            .await
    }

    #[tokio::test]
    async fn splits_bodies_into_chunks() {
        let source = MemoryPointSource::new().with_chunk_size(4);
        source.insert("u1", "1,2,3\n4,5,6\n");
        let chunks = collect(&source, "u1").await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], Ok(b"1,2,".to_vec()));
        assert_eq!(source.opened(&LayerUrl::from("u1")), 1);
    }

    #[tokio::test]
    async fn unknown_urls_fail() {
        let source = MemoryPointSource::new();
        assert_eq!(collect(&source, "nope").await, vec![Err(SourceError::Status(404))]);
    }

    #[tokio::test]
    async fn gated_bodies_wait_for_the_gate() {
        let source = MemoryPointSource::new();
        let gate = source.insert_gated("u1", "1,2,3\n");
        gate.notify_one();
        assert_eq!(collect(&source, "u1").await, vec![Ok(b"1,2,3\n".to_vec())]);
    }

    #[tokio::test]
    async fn failing_bodies_end_in_error() {
        let source = MemoryPointSource::new();
        source.insert_failing("u1", "1,2,3\n", SourceError::Transport("reset".into()));
        let items = collect(&source, "u1").await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }
}
