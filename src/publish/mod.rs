//! Artifact formatting and publication.
//!
//! Wraps generated content per the requested output format, mirrors it to
//! the local `outputs/` directory, and hands the bytes to the storage
//! collaborator under `{prefix}/outputs/{output_name}.{extension}`.
//!
//! The environment prefix is revalidated here with the same traversal
//! discipline as file paths, even when the settings layer already checked
//! it: key construction is a trust boundary of its own.

mod store;

pub use store::{HttpObjectStore, ObjectStore, StoreError};

use crate::error::{KilnError, Result};
use crate::fs::atomic_write;
use crate::prompt::{OutputFormat, PromptConfig};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Size ceiling for published artifacts, in bytes.
pub const MAX_ARTIFACT_SIZE: u64 = 10 * 1024 * 1024;

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9/_-]*$").unwrap());

/// A published artifact: final bytes live in the store and the local
/// mirror; this records where they went.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedArtifact {
    /// Object key the artifact was stored under.
    pub destination_key: String,

    /// Local mirror path under `outputs/`.
    pub local_path: PathBuf,

    /// Final artifact size in bytes.
    pub byte_len: usize,
}

/// Why a prefix is unusable, if it is. Shared with the settings layer,
/// which rejects bad prefixes before a run ever starts.
pub(crate) fn prefix_violation(prefix: &str) -> Option<String> {
    if prefix.starts_with('/') || prefix.contains("..") || !PREFIX_RE.is_match(prefix) {
        return Some(format!(
            "prefix '{}' must be a relative path of letters, digits, '/', '_', '-' \
             with no '..' segments",
            prefix
        ));
    }
    None
}

/// Validate an environment prefix: no leading separator, no `..` segments,
/// characters limited to letters, digits, `/`, `_`, `-`. Empty is allowed.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    match prefix_violation(prefix) {
        Some(reason) => Err(KilnError::Publish(reason)),
        None => Ok(()),
    }
}

/// Build the destination key for an artifact.
///
/// A trailing `/` on the prefix is tolerated; `beta` and `beta/` produce
/// the same key.
pub fn destination_key(prefix: &str, output_name: &str, format: OutputFormat) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("outputs/{}.{}", output_name, format.extension())
    } else {
        format!("{}/outputs/{}.{}", prefix, output_name, format.extension())
    }
}

/// Wrap generated content per the requested format.
///
/// Markdown passes through byte-identical. HTML gets a minimal document
/// wrapper unless the content already is a document (starts with
/// `<!DOCTYPE` or `<html`).
pub fn wrap_content(content: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Md => content.to_string(),
        OutputFormat::Html => {
            let trimmed = content.trim_start();
            if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") {
                return content.to_string();
            }
            format!(
                r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Generated Content</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            color: #333;
        }}
        pre {{
            background: #f4f4f4;
            border: 1px solid #ddd;
            border-radius: 4px;
            padding: 15px;
            overflow-x: auto;
        }}
    </style>
</head>
<body>
{}
</body>
</html>"#,
                content
            )
        }
    }
}

/// Publishes finished artifacts to the storage collaborator.
pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
    outputs_dir: &'a Path,
    prefix: &'a str,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn ObjectStore, outputs_dir: &'a Path, prefix: &'a str) -> Self {
        Self {
            store,
            outputs_dir,
            prefix,
        }
    }

    /// Format, size-check, mirror locally, and upload one artifact.
    ///
    /// The size ceiling and prefix are enforced before the store is touched.
    pub fn publish(&self, content: &str, config: &PromptConfig) -> Result<PublishedArtifact> {
        validate_prefix(self.prefix)?;

        let body = wrap_content(content, config.output_format);
        let bytes = body.as_bytes();

        if bytes.len() as u64 > MAX_ARTIFACT_SIZE {
            return Err(KilnError::Publish(format!(
                "artifact '{}' is {} bytes, exceeding the {} byte ceiling",
                config.output_name,
                bytes.len(),
                MAX_ARTIFACT_SIZE
            )));
        }

        let filename = format!("{}.{}", config.output_name, config.output_format.extension());
        let local_path = self.outputs_dir.join(&filename);
        atomic_write(&local_path, bytes)?;

        let key = destination_key(self.prefix, &config.output_name, config.output_format);
        self.store
            .put(&key, bytes, config.output_format.content_type())
            .map_err(|e| KilnError::Publish(format!("storing '{}' failed: {}", key, e)))?;

        Ok(PublishedArtifact {
            destination_key: key,
            local_path,
            byte_len: bytes.len(),
        })
    }
}
