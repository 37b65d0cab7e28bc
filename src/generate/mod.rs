//! Content generation against a managed LLM capability.
//!
//! The pipeline depends only on the [`TextGenerator`] trait, so tests can
//! substitute a fake. The real implementation is [`HttpGenerator`], a
//! blocking HTTP client for a Bedrock-style invoke endpoint.
//!
//! Request and response bodies are shaped per model family: Claude models
//! take a messages payload, Titan models take `inputText` plus a generation
//! config. Any other family is rejected before a request is made, so no
//! quota is spent on a model the extractor cannot read back.

mod http;

pub use http::HttpGenerator;

use crate::error::KilnError;
use serde_json::{Value, json};
use thiserror::Error;

/// Numeric parameters for a generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Sampling temperature in [0, 1].
    pub temperature: f64,

    /// Nucleus sampling parameter in [0, 1].
    pub top_p: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Failures of the generation capability. One attempt per invocation;
/// retrying is the caller's policy, not this module's.
#[derive(Error, Debug)]
pub enum GenerateError {
    /// The capability rejected the caller's credentials.
    #[error("{0}")]
    Access(String),

    /// Rate or quota exhaustion.
    #[error("{0}")]
    Quota(String),

    /// The response could not be parsed into generated text.
    #[error("{0}")]
    InvalidResponse(String),

    /// Any other capability failure (transport, 5xx, ...).
    #[error("{0}")]
    Api(String),

    /// The model identifier belongs to no supported family.
    #[error("{0}")]
    UnsupportedModel(String),
}

impl From<GenerateError> for KilnError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Access(msg) => KilnError::GenerationAccess(msg),
            GenerateError::Quota(msg) => KilnError::GenerationQuota(msg),
            GenerateError::InvalidResponse(msg) => KilnError::GenerationInvalidResponse(msg),
            GenerateError::Api(msg) => KilnError::Generation(msg),
            GenerateError::UnsupportedModel(msg) => KilnError::UnsupportedModel(msg),
        }
    }
}

/// The generation capability the pipeline is driven against.
pub trait TextGenerator {
    /// Send one rendered prompt and return the generated text.
    fn generate(
        &self,
        prompt: &str,
        model_id: &str,
        params: &ModelParams,
    ) -> Result<String, GenerateError>;
}

/// Build the invoke request body for the given model family.
pub fn build_request_body(
    model_id: &str,
    prompt: &str,
    params: &ModelParams,
) -> Result<Value, GenerateError> {
    if model_id.contains("anthropic.claude") {
        Ok(json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "messages": [
                {
                    "role": "user",
                    "content": prompt,
                }
            ],
        }))
    } else if model_id.contains("amazon.titan") {
        Ok(json!({
            "inputText": prompt,
            "textGenerationConfig": {
                "maxTokenCount": params.max_tokens,
                "temperature": params.temperature,
                "topP": params.top_p,
            },
        }))
    } else {
        Err(GenerateError::UnsupportedModel(model_id.to_string()))
    }
}

/// Extract the generated text from an invoke response body.
pub fn extract_text(model_id: &str, body: &Value) -> Result<String, GenerateError> {
    let text = if model_id.contains("anthropic.claude") {
        body.get("content")
            .and_then(|c| c.get(0))
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
    } else if model_id.contains("amazon.titan") {
        body.get("results")
            .and_then(|r| r.get(0))
            .and_then(|result| result.get("outputText"))
            .and_then(Value::as_str)
    } else {
        return Err(GenerateError::UnsupportedModel(model_id.to_string()));
    };

    text.map(str::to_string).ok_or_else(|| {
        GenerateError::InvalidResponse(format!(
            "response for model '{}' contains no generated text",
            model_id
        ))
    })
}
