//! Processor settings for kiln.
//!
//! Settings come from three layers, later layers winning:
//! 1. `kiln.yaml` at the workspace root (optional, forward-compatible YAML)
//! 2. environment variables (`KILN_REGION`, `KILN_BUCKET`, `KILN_PREFIX`,
//!    `KILN_GENERATION_ENDPOINT`, `KILN_STORAGE_ENDPOINT`,
//!    `KILN_TIMEOUT_SECONDS`, `KILN_API_KEY`)
//! 3. CLI flags
//!
//! The API key is taken from the environment only and never serialized.

use crate::error::{KilnError, Result};
use crate::publish;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Regions the processor may target.
pub const ALLOWED_REGIONS: [&str; 10] = [
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
];

static BUCKET_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]{1,61}[a-z0-9]$").unwrap());

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_prefix() -> String {
    "beta".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

/// Processor settings.
///
/// Unknown fields in `kiln.yaml` are preserved for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Region the generation and storage endpoints live in.
    #[serde(default = "default_region")]
    pub region: String,

    /// Destination bucket for published artifacts. Required for `run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Environment prefix under which artifacts are stored (e.g. beta, prod).
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Generation endpoint override. Defaults to the region-derived endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_endpoint: Option<String>,

    /// Storage endpoint override. Defaults to the bucket/region-derived endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_endpoint: Option<String>,

    /// Timeout applied to each network call, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Whether rendering fails on placeholders with no binding.
    #[serde(default = "default_true")]
    pub strict_variables: bool,

    /// API key for both endpoints. Environment only, never serialized.
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: default_region(),
            bucket: None,
            prefix: default_prefix(),
            generation_endpoint: None,
            storage_endpoint: None,
            timeout_seconds: default_timeout_seconds(),
            strict_variables: default_true(),
            api_key: None,
            extra: BTreeMap::new(),
        }
    }
}

/// CLI-provided overrides, the highest-precedence settings layer.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub generation_endpoint: Option<String>,
    pub storage_endpoint: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub loose_variables: bool,
}

impl Settings {
    /// Load settings from a YAML file. Returns `Ok(None)` if the file is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            KilnError::UserError(format!(
                "failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let settings: Settings = serde_yaml::from_str(&content).map_err(|e| {
            KilnError::UserError(format!("failed to parse '{}': {}", path.display(), e))
        })?;

        Ok(Some(settings))
    }

    /// Serialize to a YAML string (used by `kiln init` scaffolding).
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| KilnError::UserError(format!("failed to serialize settings: {}", e)))
    }

    /// Resolve settings for a command: file, then environment, then flags,
    /// then validation.
    pub fn resolve<P: AsRef<Path>>(settings_path: P, overrides: &SettingsOverrides) -> Result<Self> {
        let mut settings = Self::load(settings_path)?.unwrap_or_default();
        settings.apply_env()?;
        settings.apply_overrides(overrides);
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay `KILN_*` environment variables.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(region) = std::env::var("KILN_REGION") {
            self.region = region;
        }
        if let Ok(bucket) = std::env::var("KILN_BUCKET") {
            self.bucket = Some(bucket);
        }
        if let Ok(prefix) = std::env::var("KILN_PREFIX") {
            self.prefix = prefix;
        }
        if let Ok(endpoint) = std::env::var("KILN_GENERATION_ENDPOINT") {
            self.generation_endpoint = Some(endpoint);
        }
        if let Ok(endpoint) = std::env::var("KILN_STORAGE_ENDPOINT") {
            self.storage_endpoint = Some(endpoint);
        }
        if let Ok(timeout) = std::env::var("KILN_TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.parse().map_err(|_| {
                KilnError::UserError(format!(
                    "KILN_TIMEOUT_SECONDS must be a positive integer, got '{}'",
                    timeout
                ))
            })?;
        }
        if let Ok(key) = std::env::var("KILN_API_KEY") {
            self.api_key = Some(key);
        }
        Ok(())
    }

    /// Overlay CLI flags.
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(region) = &overrides.region {
            self.region = region.clone();
        }
        if let Some(bucket) = &overrides.bucket {
            self.bucket = Some(bucket.clone());
        }
        if let Some(prefix) = &overrides.prefix {
            self.prefix = prefix.clone();
        }
        if let Some(endpoint) = &overrides.generation_endpoint {
            self.generation_endpoint = Some(endpoint.clone());
        }
        if let Some(endpoint) = &overrides.storage_endpoint {
            self.storage_endpoint = Some(endpoint.clone());
        }
        if let Some(timeout) = overrides.timeout_seconds {
            self.timeout_seconds = timeout;
        }
        if overrides.loose_variables {
            self.strict_variables = false;
        }
    }

    /// Validate region, bucket name, prefix, and timeout.
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_REGIONS.contains(&self.region.as_str()) {
            return Err(KilnError::UserError(format!(
                "invalid region '{}'. Allowed: {}",
                self.region,
                ALLOWED_REGIONS.join(", ")
            )));
        }

        if let Some(bucket) = &self.bucket
            && !is_valid_bucket_name(bucket)
        {
            return Err(KilnError::UserError(format!(
                "invalid bucket name '{}': must be 3-63 lowercase alphanumeric, '.', or '-' \
                 characters, starting and ending alphanumeric, with no '..', '.-', or '-.'",
                bucket
            )));
        }

        if let Some(reason) = publish::prefix_violation(&self.prefix) {
            return Err(KilnError::UserError(format!("invalid prefix: {}", reason)));
        }

        if self.timeout_seconds == 0 {
            return Err(KilnError::UserError(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The bucket, or a user error telling how to supply one.
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket.as_deref().ok_or_else(|| {
            KilnError::UserError(
                "no destination bucket configured.\n\n\
                 Set one with `--bucket`, the KILN_BUCKET environment variable, \
                 or `bucket:` in kiln.yaml."
                    .to_string(),
            )
        })
    }

    /// Effective generation endpoint (override or region-derived).
    pub fn effective_generation_endpoint(&self) -> String {
        self.generation_endpoint.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", self.region)
        })
    }

    /// Effective storage endpoint (override or bucket/region-derived).
    pub fn effective_storage_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.storage_endpoint {
            return Ok(endpoint.clone());
        }
        let bucket = self.require_bucket()?;
        Ok(format!("https://{}.s3.{}.amazonaws.com", bucket, self.region))
    }
}

/// Validate a bucket name against the storage naming rules.
fn is_valid_bucket_name(name: &str) -> bool {
    if !BUCKET_NAME_RE.is_match(name) {
        return false;
    }
    !(name.contains("..") || name.contains(".-") || name.contains("-."))
}
