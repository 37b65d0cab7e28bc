//! Storage collaborator boundary.
//!
//! The pipeline hands finished artifacts to an [`ObjectStore`]; whether that
//! is a real bucket, a gateway, or a test fake is the collaborator's
//! business. Retry policy also belongs to the collaborator, not the core.

use crate::error::{KilnError, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected the caller's credentials.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The destination bucket does not exist.
    #[error("bucket missing: {0}")]
    BucketMissing(String),

    /// Any other storage failure (transport, 5xx, ...).
    #[error("{0}")]
    Other(String),
}

/// A write-only object store.
pub trait ObjectStore {
    /// Store `bytes` under `key` with the given content type.
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> std::result::Result<(), StoreError>;
}

/// Blocking HTTP [`ObjectStore`]: `PUT {endpoint}/{key}`.
pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpObjectStore {
    /// Build a store for the given endpoint with an explicit timeout.
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KilnError::Storage(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl ObjectStore for HttpObjectStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> std::result::Result<(), StoreError> {
        let url = format!("{}/{}", self.endpoint, key);
        let mut request = self
            .client
            .put(&url)
            .header("content-type", content_type)
            .header("cache-control", "max-age=300")
            .body(bytes.to_vec());
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .map_err(|e| StoreError::Other(format!("request to '{}' failed: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => StoreError::AccessDenied(format!("HTTP {}: {}", status, text)),
            404 => StoreError::BucketMissing(format!("HTTP {}: {}", status, text)),
            _ => StoreError::Other(format!("HTTP {}: {}", status, text)),
        })
    }
}
