//! Contract of the remote event/layer catalog service.
//!
//! Implementations perform the HTTP calls; callers decide how failures degrade
//! (empty lists, empty details, failed approval state).

use bytes::Bytes;
use formats::{ApprovalResponse, EventDetail, EventSummary, GroupPayload};
use foundation::{LayerUrl, Version};
use futures_util::future::LocalBoxFuture;
use futures_util::stream::LocalBoxStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Transport(String),
    Status(u16),
    Decode(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            SourceError::Status(code) => write!(f, "unexpected HTTP status {code}"),
            SourceError::Decode(msg) => write!(f, "response decode failed: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Which layer listing to load for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerScope {
    Approved,
    Pending,
    /// One layer's release, for snapshot display.
    Single(String),
}

impl LayerScope {
    pub fn path(&self, event: &str) -> String {
        match self {
            LayerScope::Approved => format!("/layers/{event}"),
            LayerScope::Pending => format!("/pending/layers/{event}"),
            LayerScope::Single(layer) => format!("/layers/{event}/{layer}"),
        }
    }
}

pub fn events_path() -> &'static str {
    "/events"
}

pub fn event_path(event: &str) -> String {
    format!("/events/{event}")
}

pub fn approve_path(event: &str, version: &Version) -> String {
    format!("/pending/layers/{event}/approve/{version}")
}

pub trait CatalogApi {
    /// `GET /events`
    fn events(&self) -> LocalBoxFuture<'_, Result<Vec<EventSummary>, SourceError>>;

    /// `GET /events/{name}`
    fn event<'a>(&'a self, name: &'a str) -> LocalBoxFuture<'a, Result<EventDetail, SourceError>>;

    /// `GET /layers/{event}`, `/pending/layers/{event}` or `/layers/{event}/{layer}`.
    fn layers<'a>(
        &'a self,
        event: &'a str,
        scope: &'a LayerScope,
    ) -> LocalBoxFuture<'a, Result<Vec<GroupPayload>, SourceError>>;

    /// `POST /pending/layers/{event}/approve/{version}`
    fn approve<'a>(
        &'a self,
        event: &'a str,
        version: &'a Version,
    ) -> LocalBoxFuture<'a, Result<ApprovalResponse, SourceError>>;

    /// Fetch a group's metadata document (display only).
    fn metadata<'a>(
        &'a self,
        url: &'a str,
    ) -> LocalBoxFuture<'a, Result<serde_json::Value, SourceError>>;
}

pub type ChunkStream = LocalBoxStream<'static, Result<Bytes, SourceError>>;

/// Streaming access to line-delimited point files.
pub trait PointSource {
    /// Open the resource. Connection failures surface as the first item.
    fn open(&self, url: &LayerUrl) -> ChunkStream;
}

#[cfg(test)]
mod tests {
    use super::{approve_path, event_path, LayerScope};
    use foundation::Version;

    #[test]
    fn scope_paths() {
        assert_eq!(LayerScope::Approved.path("irma"), "/layers/irma");
        assert_eq!(LayerScope::Pending.path("irma"), "/pending/layers/irma");
        assert_eq!(
            LayerScope::Single("flood".to_string()).path("irma"),
            "/layers/irma/flood"
        );
        assert_eq!(event_path("irma"), "/events/irma");
        assert_eq!(
            approve_path("irma", &Version::from("v2")),
            "/pending/layers/irma/approve/v2"
        );
    }
}
