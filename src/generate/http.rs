//! Blocking HTTP client for the generation capability.
//!
//! Speaks to a Bedrock-style invoke endpoint:
//! `POST {endpoint}/model/{model_id}/invoke` with a JSON body shaped per
//! model family, bearer auth, and an explicit request timeout.

use super::{GenerateError, ModelParams, TextGenerator, build_request_body, extract_text};
use crate::error::{KilnError, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

/// HTTP-backed [`TextGenerator`].
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    /// Build a generator for the given endpoint with an explicit timeout.
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KilnError::Generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl TextGenerator for HttpGenerator {
    fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        params: &ModelParams,
    ) -> std::result::Result<String, GenerateError> {
        let body = build_request_body(model_id, prompt, params)?;

        let url = format!("{}/model/{}/invoke", self.endpoint, model_id);
        let mut request = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| GenerateError::Api(format!("request to '{}' failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => GenerateError::Access(format!("HTTP {}: {}", status, text)),
                429 => GenerateError::Quota(format!("HTTP {}: {}", status, text)),
                _ => GenerateError::Api(format!("HTTP {}: {}", status, text)),
            });
        }

        let body: Value = response
            .json()
            .map_err(|e| GenerateError::InvalidResponse(format!("malformed JSON body: {}", e)))?;

        extract_text(model_id, &body)
    }
}
