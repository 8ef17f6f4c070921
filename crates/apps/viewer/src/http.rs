//! reqwest-backed catalog API and point source.

use formats::{ApprovalResponse, EventDetail, EventSummary, GroupPayload};
use foundation::{LayerUrl, Version};
use futures_util::future::{FutureExt, LocalBoxFuture};
use futures_util::{StreamExt, TryFutureExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use streaming::{
    approve_path, event_path, events_path, CatalogApi, ChunkStream, LayerScope, PointSource,
    SourceError,
};

#[derive(Debug, Clone)]
pub struct HttpApi {
    host: String,
    client: Client,
}

impl HttpApi {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Absolute URLs pass through; paths are joined onto the API host.
    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.host)
        } else {
            format!("{}/{path}", self.host)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = self.resolve(path);
        tracing::debug!(%url, "GET");
        let resp = self.client.get(&url).send().await.map_err(transport)?;
        checked(resp)?.json::<T>().await.map_err(decode)
    }
}

fn transport(err: reqwest::Error) -> SourceError {
    SourceError::Transport(err.to_string())
}

fn decode(err: reqwest::Error) -> SourceError {
    SourceError::Decode(err.to_string())
}

fn checked(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(SourceError::Status(status.as_u16()))
    }
}

impl CatalogApi for HttpApi {
    fn events(&self) -> LocalBoxFuture<'_, Result<Vec<EventSummary>, SourceError>> {
        self.get_json(events_path()).boxed_local()
    }

    fn event<'a>(&'a self, name: &'a str) -> LocalBoxFuture<'a, Result<EventDetail, SourceError>> {
        async move { self.get_json(&event_path(name)).await }.boxed_local()
    }

    fn layers<'a>(
        &'a self,
        event: &'a str,
        scope: &'a LayerScope,
    ) -> LocalBoxFuture<'a, Result<Vec<GroupPayload>, SourceError>> {
        async move { self.get_json(&scope.path(event)).await }.boxed_local()
    }

    fn approve<'a>(
        &'a self,
        event: &'a str,
        version: &'a Version,
    ) -> LocalBoxFuture<'a, Result<ApprovalResponse, SourceError>> {
        async move {
            let url = self.resolve(&approve_path(event, version));
            tracing::debug!(%url, "POST");
            let resp = self.client.post(&url).send().await.map_err(transport)?;
            let status = resp.status();
            Ok(ApprovalResponse {
                ok: status.is_success(),
                status: status.as_u16(),
            })
        }
        .boxed_local()
    }

    fn metadata<'a>(
        &'a self,
        url: &'a str,
    ) -> LocalBoxFuture<'a, Result<serde_json::Value, SourceError>> {
        async move { self.get_json(url).await }.boxed_local()
    }
}

impl PointSource for HttpApi {
    fn open(&self, url: &LayerUrl) -> ChunkStream {
        let url = self.resolve(url.as_str());
        let request = self.client.get(&url);
        async move {
            tracing::debug!(%url, "streaming points");
            let resp = request.send().await.map_err(transport)?;
            let chunks = checked(resp)?.bytes_stream();
            Ok::<_, SourceError>(chunks.map(|chunk| chunk.map_err(transport)))
        }
        .try_flatten_stream()
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::HttpApi;

    #[test]
    fn resolves_paths_against_the_host() {
        let api = HttpApi::new("http://localhost:3000/");
        assert_eq!(api.resolve("/events"), "http://localhost:3000/events");
        assert_eq!(api.resolve("data/u1.csv"), "http://localhost:3000/data/u1.csv");
        assert_eq!(
            api.resolve("https://bucket.s3.amazonaws.com/u1.csv"),
            "https://bucket.s3.amazonaws.com/u1.csv"
        );
    }
}
