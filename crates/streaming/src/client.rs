//! Backend collaborators behind one async trait.
//!
//! The trait returns boxed futures so it stays dyn-compatible; the dashboard
//! holds an `Arc<dyn Backend>` and tests substitute an in-memory fake.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::protocol::{
    ErrorBody, PrescriptionResponse, QueryRequest, QueryResponse, TileUpdateRequest,
    TileUpdateResponse,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const QUERY_PATH: &str = "/api/query";
pub const CLEAR_HISTORY_PATH: &str = "/api/query/clear-history";
pub const PRESCRIPTION_PATH: &str = "/api/prescription-map";
pub const TILE_UPDATE_PATH: &str = "/api/tiles/update";

pub trait Backend: Send + Sync {
    fn query(&self, request: QueryRequest) -> BoxFuture<'_, Result<QueryResponse, ApiError>>;

    fn prescription(
        &self,
        field_name: String,
    ) -> BoxFuture<'_, Result<PrescriptionResponse, ApiError>>;

    fn update_tiles(
        &self,
        request: TileUpdateRequest,
    ) -> BoxFuture<'_, Result<TileUpdateResponse, ApiError>>;

    fn clear_history(&self) -> BoxFuture<'_, Result<(), ApiError>>;
}

/// JSON-over-HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Sends `request` and returns the response if its status is 2xx.
    async fn dispatch(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        debug!(path, "backend request");
        let resp = request.send().await.map_err(|e| {
            warn!(path, error = %e, "backend unreachable");
            ApiError::from(e)
        })?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let bytes = resp.bytes().await?;
        let message = error_message(&bytes, status);
        warn!(path, status = status.as_u16(), %message, "backend error");
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let bytes = self.dispatch(path, request).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// The backend's own error text: `detail` from a JSON body, else the raw body,
/// else the status reason.
fn error_message(body: &[u8], status: reqwest::StatusCode) -> String {
    if let Ok(err) = serde_json::from_slice::<ErrorBody>(body) {
        return match err.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    status
        .canonical_reason()
        .map_or_else(|| status.to_string(), str::to_string)
}

impl Backend for HttpBackend {
    fn query(&self, request: QueryRequest) -> BoxFuture<'_, Result<QueryResponse, ApiError>> {
        Box::pin(async move {
            let builder = self.client.post(self.url(QUERY_PATH)).json(&request);
            self.send(QUERY_PATH, builder).await
        })
    }

    fn prescription(
        &self,
        field_name: String,
    ) -> BoxFuture<'_, Result<PrescriptionResponse, ApiError>> {
        Box::pin(async move {
            let builder = self
                .client
                .post(self.url(PRESCRIPTION_PATH))
                .query(&[("field_name", field_name.as_str())]);
            self.send(PRESCRIPTION_PATH, builder).await
        })
    }

    fn update_tiles(
        &self,
        request: TileUpdateRequest,
    ) -> BoxFuture<'_, Result<TileUpdateResponse, ApiError>> {
        Box::pin(async move {
            let builder = self.client.post(self.url(TILE_UPDATE_PATH)).json(&request);
            self.send(TILE_UPDATE_PATH, builder).await
        })
    }

    fn clear_history(&self) -> BoxFuture<'_, Result<(), ApiError>> {
        Box::pin(async move {
            // Any 2xx counts; the body is not read.
            let builder = self.client.post(self.url(CLEAR_HISTORY_PATH));
            self.dispatch(CLEAR_HISTORY_PATH, builder).await?;
            Ok(())
        })
    }
}
