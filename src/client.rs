//! HTTP catalog source.
//!
//! Lets the resolver run against a remote slugline API (or any service with
//! the same `/entities` shape) instead of the local database. The optional
//! API key is sent as a bearer token.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::ContentEntity;
use crate::resolver::CatalogSource;

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),
}

/// Read-only client for a remote entity catalog.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl RemoteCatalog {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    pub async fn list_entities(&self) -> Result<Vec<ContentEntity>, ClientError> {
        let response = self.get("/entities").send().await?;
        self.handle_response(response).await
    }

    /// Fetch one entity; a 404 is `Ok(None)`.
    pub async fn get_entity(&self, slug: &str) -> Result<Option<ContentEntity>, ClientError> {
        let response = self.get(&format!("/entities/{}", slug)).send().await?;
        match self.handle_response(response).await {
            Ok(entity) => Ok(Some(entity)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl CatalogSource for RemoteCatalog {
    async fn fetch_catalog(&self) -> anyhow::Result<Vec<ContentEntity>> {
        Ok(self.list_entities().await?)
    }

    async fn fetch_entity(&self, slug: &str) -> anyhow::Result<Option<ContentEntity>> {
        Ok(self.get_entity(slug).await?)
    }
}
