//! Prompt configuration parsing and schema validation.
//!
//! The schema is a declarative set of field constraints checked in one pass,
//! fail-fast: the first violation aborts with the offending field and reason.
//! Unknown top-level fields are ignored for forward compatibility.

use crate::error::{KilnError, Result};
use crate::generate::ModelParams;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Maximum number of entries in the `variables` mapping.
pub const MAX_VARIABLES: usize = 50;

/// Baseline model when a config names none.
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";

/// Upper bound for `model_params.max_tokens`.
const MAX_MAX_TOKENS: i64 = 100_000;

static TEMPLATE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+\.txt$").unwrap());

static OUTPUT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

static VARIABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Output format of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Wrap the generated text in a minimal HTML document.
    #[default]
    Html,
    /// Pass the generated text through unchanged.
    Md,
}

impl OutputFormat {
    /// Parse a format from its config string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "md" => Some(Self::Md),
            _ => None,
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Md => "md",
        }
    }

    /// MIME type for uploaded artifacts of this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Md => "text/markdown",
        }
    }
}

/// A validated prompt configuration. Immutable after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptConfig {
    /// Template file name inside the template root.
    pub template: String,

    /// Identifier for the produced artifact.
    pub output_name: String,

    /// Output format (default html).
    pub output_format: OutputFormat,

    /// Model identifier for the generation capability.
    pub model_id: String,

    /// Model invocation parameters.
    pub model_params: ModelParams,

    /// Variable bindings for template substitution.
    pub variables: BTreeMap<String, String>,
}

impl PromptConfig {
    /// Parse and validate a config from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        let raw: RawPromptConfig = serde_json::from_str(input).map_err(|e| {
            KilnError::ConfigValidation {
                field: "json".to_string(),
                reason: e.to_string(),
            }
        })?;
        raw.validate()
    }
}

/// Raw, unvalidated config as read from disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawPromptConfig {
    template: Option<String>,
    output_name: Option<String>,
    output_format: Option<String>,
    model_id: Option<String>,
    model_params: Option<RawModelParams>,
    variables: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawModelParams {
    max_tokens: Option<i64>,
    temperature: Option<f64>,
    top_p: Option<f64>,
}

fn violation(field: &str, reason: impl Into<String>) -> KilnError {
    KilnError::ConfigValidation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl RawPromptConfig {
    /// Validate into a [`PromptConfig`], failing on the first violation.
    fn validate(&self) -> Result<PromptConfig> {
        let template = self
            .template
            .as_deref()
            .ok_or_else(|| violation("template", "required field is missing"))?;
        if template.is_empty() {
            return Err(violation("template", "must not be empty"));
        }
        if !TEMPLATE_NAME_RE.is_match(template) {
            return Err(violation(
                "template",
                format!(
                    "'{}' must be a plain .txt file name (letters, digits, '-', '_')",
                    template
                ),
            ));
        }

        let output_name = self
            .output_name
            .as_deref()
            .ok_or_else(|| violation("output_name", "required field is missing"))?;
        if output_name.is_empty() {
            return Err(violation("output_name", "must not be empty"));
        }
        if !OUTPUT_NAME_RE.is_match(output_name) {
            return Err(violation(
                "output_name",
                format!("'{}' may only contain letters, digits, '-', '_'", output_name),
            ));
        }

        let output_format = match self.output_format.as_deref() {
            None => OutputFormat::default(),
            Some(s) => OutputFormat::from_str(s)
                .ok_or_else(|| violation("output_format", format!("'{}' must be one of: html, md", s)))?,
        };

        let model_params = self
            .model_params
            .as_ref()
            .map(RawModelParams::validate)
            .transpose()?
            .unwrap_or_default();

        let raw_variables = self
            .variables
            .as_ref()
            .ok_or_else(|| violation("variables", "required field is missing"))?;
        if raw_variables.len() > MAX_VARIABLES {
            return Err(violation(
                "variables",
                format!("{} entries exceed the {} limit", raw_variables.len(), MAX_VARIABLES),
            ));
        }

        let mut variables = BTreeMap::new();
        for (name, value) in raw_variables {
            if !VARIABLE_NAME_RE.is_match(name) {
                return Err(violation(
                    "variables",
                    format!(
                        "key '{}' must start with a letter or '_' and contain only letters, digits, '_'",
                        name
                    ),
                ));
            }
            let Value::String(value) = value else {
                return Err(violation(
                    "variables",
                    format!("value for '{}' must be a string", name),
                ));
            };
            variables.insert(name.clone(), value.clone());
        }

        Ok(PromptConfig {
            template: template.to_string(),
            output_name: output_name.to_string(),
            output_format,
            model_id: self
                .model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            model_params,
            variables,
        })
    }
}

impl RawModelParams {
    fn validate(&self) -> Result<ModelParams> {
        let mut params = ModelParams::default();

        if let Some(max_tokens) = self.max_tokens {
            if !(1..=MAX_MAX_TOKENS).contains(&max_tokens) {
                return Err(violation(
                    "model_params.max_tokens",
                    format!("{} must be between 1 and {}", max_tokens, MAX_MAX_TOKENS),
                ));
            }
            params.max_tokens = max_tokens as u32;
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(violation(
                    "model_params.temperature",
                    format!("{} must be between 0 and 1", temperature),
                ));
            }
            params.temperature = temperature;
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(violation(
                    "model_params.top_p",
                    format!("{} must be between 0 and 1", top_p),
                ));
            }
            params.top_p = top_p;
        }

        Ok(params)
    }
}
