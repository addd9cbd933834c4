//! API client module
//!
//! This module provides client access to a planboard server: [`HttpClient`]
//! speaks to a remote instance over HTTP, [`CoreClient`] wraps a [`Core`]
//! directly for in-process hosts. Both implement the [`Client`] trait so
//! callers don't care which they hold.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::confirm::Pending;
use crate::core::{Core, SearchHit};
use crate::engine::{Command, Outcome};
use crate::models::{Document, RowId};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4400".to_string(),
        }
    }
}

/// Generic API response structure
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Missing data in response")]
    MissingData,
}

/// Interface to a planboard document, local or remote.
#[async_trait::async_trait]
pub trait Client {
    /// Fetch the current document.
    async fn document(&self) -> Result<Document, ClientError>;

    /// Apply a command; the outcome carries created ids and any rejection
    /// diagnostic.
    async fn apply(&self, command: Command) -> Result<Outcome, ClientError>;

    /// Flattened rows matching a search term.
    async fn search(&self, term: &str) -> Result<Vec<SearchHit>, ClientError>;

    /// Open a delete confirmation. `None` when the row does not exist.
    async fn request_delete(&self, id: &RowId) -> Result<Option<Pending>, ClientError>;

    /// Open a reset confirmation. `None` for missing rows and non-tasks.
    async fn request_reset(&self, id: &RowId) -> Result<Option<Pending>, ClientError>;

    /// Execute the pending confirmation. `None` when nothing is pending.
    async fn confirm_pending(&self) -> Result<Option<Outcome>, ClientError>;

    /// Discard the pending confirmation; true if one was pending.
    async fn cancel_pending(&self) -> Result<bool, ClientError>;
}

/// HTTP client for a remote planboard server.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http_client.get(self.url(path)).send().await?;
        unwrap_api(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .http_client
            .post(self.url(path))
            .json(body)
            .send()
            .await?;
        unwrap_api(response.json().await?)
    }

    // POST with no body, where NOT_FOUND maps to Ok(None).
    async fn post_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        missing: StatusCode,
    ) -> Result<Option<T>, ClientError> {
        let response = self.http_client.post(self.url(path)).send().await?;
        if response.status() == missing {
            return Ok(None);
        }
        unwrap_api(response.json().await?).map(Some)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn unwrap_api<T>(response: ApiResponse<T>) -> Result<T, ClientError> {
    if response.success {
        response.data.ok_or(ClientError::MissingData)
    } else {
        Err(ClientError::Api(
            response
                .error
                .unwrap_or_else(|| "Unknown API error".to_string()),
        ))
    }
}

#[async_trait::async_trait]
impl Client for HttpClient {
    async fn document(&self) -> Result<Document, ClientError> {
        self.get_json("/api/document").await
    }

    async fn apply(&self, command: Command) -> Result<Outcome, ClientError> {
        self.post_json("/api/command", &command).await
    }

    async fn search(&self, term: &str) -> Result<Vec<SearchHit>, ClientError> {
        self.get_json(&format!("/api/search/{term}")).await
    }

    async fn request_delete(&self, id: &RowId) -> Result<Option<Pending>, ClientError> {
        self.post_optional(&format!("/api/confirm/delete/{id}"), StatusCode::NOT_FOUND)
            .await
    }

    async fn request_reset(&self, id: &RowId) -> Result<Option<Pending>, ClientError> {
        self.post_optional(&format!("/api/confirm/reset/{id}"), StatusCode::NOT_FOUND)
            .await
    }

    async fn confirm_pending(&self) -> Result<Option<Outcome>, ClientError> {
        self.post_optional("/api/confirm/commit", StatusCode::BAD_REQUEST)
            .await
    }

    async fn cancel_pending(&self) -> Result<bool, ClientError> {
        let response = self
            .http_client
            .post(self.url("/api/confirm/cancel"))
            .send()
            .await?;
        unwrap_api(response.json().await?)
    }
}

/// A client implementation that wraps [`Core`] directly, with the same
/// interface as [`HttpClient`] but no HTTP hop.
#[derive(Clone)]
pub struct CoreClient {
    core: Core,
}

impl CoreClient {
    pub fn new(core: Core) -> Self {
        Self { core }
    }
}

#[async_trait::async_trait]
impl Client for CoreClient {
    async fn document(&self) -> Result<Document, ClientError> {
        Ok(self.core.snapshot())
    }

    async fn apply(&self, command: Command) -> Result<Outcome, ClientError> {
        Ok(self.core.apply(command))
    }

    async fn search(&self, term: &str) -> Result<Vec<SearchHit>, ClientError> {
        Ok(self.core.search(term))
    }

    async fn request_delete(&self, id: &RowId) -> Result<Option<Pending>, ClientError> {
        Ok(self.core.request_delete(id))
    }

    async fn request_reset(&self, id: &RowId) -> Result<Option<Pending>, ClientError> {
        Ok(self.core.request_reset(id))
    }

    async fn confirm_pending(&self) -> Result<Option<Outcome>, ClientError> {
        Ok(self.core.confirm_pending())
    }

    async fn cancel_pending(&self) -> Result<bool, ClientError> {
        Ok(self.core.cancel_pending().is_some())
    }
}
