use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use foundation::{GeoPoint, LayerUrl};
use formats::{DecodeStats, PointDecoder};
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};
use futures_util::StreamExt;
use runtime::metrics::{
    Metrics, FETCH_FAILED, FETCH_JOINED, FETCH_STARTED, RECORDS_MALFORMED, RECORDS_PARSED,
};

use crate::api::{PointSource, SourceError};
use crate::cache::CacheKey;
use crate::request::Request;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Source(SourceError),
    UnknownLayer(LayerUrl),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Source(err) => write!(f, "point data fetch failed: {err}"),
            FetchError::UnknownLayer(url) => write!(f, "no layer with url {url}"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Source(err) => Some(err),
            FetchError::UnknownLayer(_) => None,
        }
    }
}

impl From<SourceError> for FetchError {
    fn from(err: SourceError) -> Self {
        FetchError::Source(err)
    }
}

/// A completed download. Points are shared so every joined caller sees the
/// same allocation.
#[derive(Debug, Clone)]
pub struct FetchedPoints {
    pub request: Request,
    pub points: Arc<[GeoPoint]>,
    pub stats: DecodeStats,
}

pub type SharedFetch = Shared<LocalBoxFuture<'static, Result<FetchedPoints, FetchError>>>;

/// Handle on a started or joined fetch.
#[derive(Clone)]
pub struct FetchHandle {
    pub request: Request,
    /// `false` when this call joined a fetch that was already in flight.
    pub started: bool,
    fetch: SharedFetch,
}

impl FetchHandle {
    pub async fn wait(self) -> Result<FetchedPoints, FetchError> {
        self.fetch.await
    }
}

impl std::fmt::Debug for FetchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchHandle")
            .field("request", &self.request)
            .field("started", &self.started)
            .finish()
    }
}

#[derive(Clone)]
struct InFlight {
    request: Request,
    fetch: SharedFetch,
}

/// At-most-one streaming download per `CacheKey`.
///
/// The in-flight marker is inserted when a download starts and cleared by the
/// download itself on completion or failure. Completed points are not kept
/// here; the caller owns the cached copy.
pub struct FetchPipeline {
    source: Rc<dyn PointSource>,
    in_flight: Rc<RefCell<BTreeMap<CacheKey, InFlight>>>,
    next_request: Cell<u64>,
    metrics: Rc<RefCell<Metrics>>,
}

impl FetchPipeline {
    pub fn new(source: Rc<dyn PointSource>, metrics: Rc<RefCell<Metrics>>) -> Self {
        Self {
            source,
            in_flight: Rc::new(RefCell::new(BTreeMap::new())),
            next_request: Cell::new(1),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Rc<RefCell<Metrics>> {
        &self.metrics
    }

    pub fn in_flight(&self, key: &CacheKey) -> Option<Request> {
        self.in_flight.borrow().get(key).map(|f| f.request)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.borrow().len()
    }

    /// Start a download for `key`, or join the one already running.
    pub fn fetch(&self, key: CacheKey) -> FetchHandle {
        if let Some(existing) = self.in_flight.borrow().get(&key).cloned() {
            self.metrics.borrow_mut().inc(FETCH_JOINED);
            tracing::debug!(%key, request = %existing.request, "joining in-flight fetch");
            return FetchHandle {
                request: existing.request,
                started: false,
                fetch: existing.fetch,
            };
        }

        let request = Request(self.next_request.get());
        self.next_request.set(request.0 + 1);
        self.metrics.borrow_mut().inc(FETCH_STARTED);
        tracing::debug!(%key, %request, "starting fetch");

        let source = self.source.clone();
        let in_flight = self.in_flight.clone();
        let metrics = self.metrics.clone();
        let marker = key.clone();
        let fetch = async move {
            let result = download(source.as_ref(), &marker.url, request).await;

            let mut markers = in_flight.borrow_mut();
            if markers.get(&marker).is_some_and(|f| f.request == request) {
                markers.remove(&marker);
            }
            drop(markers);

            let mut metrics = metrics.borrow_mut();
            match &result {
                Ok(fetched) => {
                    metrics.add(RECORDS_PARSED, fetched.stats.records as u64);
                    metrics.add(RECORDS_MALFORMED, fetched.stats.malformed as u64);
                    if fetched.stats.malformed > 0 {
                        tracing::warn!(
                            key = %marker,
                            malformed = fetched.stats.malformed,
                            "dropped malformed records"
                        );
                    }
                    tracing::info!(
                        key = %marker,
                        %request,
                        points = fetched.points.len(),
                        bytes = fetched.stats.bytes,
                        "fetch complete"
                    );
                }
                Err(err) => {
                    metrics.inc(FETCH_FAILED);
                    tracing::warn!(key = %marker, %request, error = %err, "fetch failed");
                }
            }
            result
        }
        .boxed_local()
        .shared();

        self.in_flight.borrow_mut().insert(
            key,
            InFlight {
                request,
                fetch: fetch.clone(),
            },
        );

        FetchHandle {
            request,
            started: true,
            fetch,
        }
    }
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("in_flight", &self.in_flight.borrow().keys().collect::<Vec<_>>())
            .field("next_request", &self.next_request.get())
            .finish()
    }
}

async fn download(
    source: &dyn PointSource,
    url: &LayerUrl,
    request: Request,
) -> Result<FetchedPoints, FetchError> {
    let mut stream = source.open(url);
    let mut decoder = PointDecoder::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        decoder.push(&chunk);
    }
    let decoded = decoder.finish();
    Ok(FetchedPoints {
        request,
        points: decoded.points.into(),
        stats: decoded.stats,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use foundation::{GeoPoint, Generation, LayerUrl};
    use runtime::metrics::{Metrics, FETCH_FAILED, FETCH_JOINED, FETCH_STARTED, RECORDS_MALFORMED};

    use super::{FetchError, FetchPipeline};
    use crate::api::SourceError;
    use crate::cache::CacheKey;
    use crate::memory::MemoryPointSource;

    fn pipeline(source: &Rc<MemoryPointSource>) -> FetchPipeline {
        FetchPipeline::new(source.clone(), Rc::new(RefCell::new(Metrics::new())))
    }

    #[tokio::test]
    async fn decodes_records_split_across_chunks() {
        let source = Rc::new(MemoryPointSource::new().with_chunk_size(3));
        source.insert("u1", "1.0,2.0,3\n1.1,2.1,0\nbad\n");
        let pipeline = pipeline(&source);

        let fetched = pipeline
            .fetch(CacheKey::new(Generation(1), "u1"))
            .wait()
            .await
            .unwrap();
        assert_eq!(
            &fetched.points[..],
            &[GeoPoint::new(1.0, 2.0, 3.0), GeoPoint::new(1.1, 2.1, 0.0)]
        );
        assert_eq!(fetched.stats.malformed, 1);
        assert_eq!(pipeline.metrics().borrow().counter(RECORDS_MALFORMED), 1);
        assert_eq!(pipeline.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_download() {
        let source = Rc::new(MemoryPointSource::new());
        let gate = source.insert_gated("u1", "1,2,3\n");
        let pipeline = pipeline(&source);
        let key = CacheKey::new(Generation(1), "u1");

        let first = pipeline.fetch(key.clone());
        let second = pipeline.fetch(key.clone());
        assert!(first.started);
        assert!(!second.started);
        assert_eq!(first.request, second.request);
        assert_eq!(pipeline.in_flight(&key), Some(first.request));

        gate.notify_one();
        let (a, b) = tokio::join!(first.wait(), second.wait());
        assert_eq!(a.unwrap().points.len(), 1);
        assert_eq!(b.unwrap().points.len(), 1);
        assert_eq!(source.opened(&LayerUrl::from("u1")), 1);

        let metrics = pipeline.metrics().borrow();
        assert_eq!(metrics.counter(FETCH_STARTED), 1);
        assert_eq!(metrics.counter(FETCH_JOINED), 1);
    }

    #[tokio::test]
    async fn generations_do_not_share_downloads() {
        let source = Rc::new(MemoryPointSource::new());
        source.insert("u1", "1,2,3\n");
        let pipeline = pipeline(&source);

        let old = pipeline.fetch(CacheKey::new(Generation(1), "u1"));
        let new = pipeline.fetch(CacheKey::new(Generation(2), "u1"));
        assert!(old.started && new.started);
        assert_ne!(old.request, new.request);

        let (a, b) = tokio::join!(old.wait(), new.wait());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(source.opened(&LayerUrl::from("u1")), 2);
    }

    #[tokio::test]
    async fn failures_clear_the_marker_and_allow_retry() {
        let source = Rc::new(MemoryPointSource::new());
        source.insert_failing("u1", "1,2,3\n", SourceError::Transport("reset".into()));
        let pipeline = pipeline(&source);
        let key = CacheKey::new(Generation(1), "u1");

        let err = pipeline.fetch(key.clone()).wait().await.unwrap_err();
        assert_eq!(err, FetchError::Source(SourceError::Transport("reset".into())));
        assert_eq!(pipeline.in_flight(&key), None);
        assert_eq!(pipeline.metrics().borrow().counter(FETCH_FAILED), 1);

        source.insert("u1", "1,2,3\n");
        let retried = pipeline.fetch(key).wait().await.unwrap();
        assert_eq!(retried.points.len(), 1);
        assert_eq!(source.opened(&LayerUrl::from("u1")), 2);
    }
}
