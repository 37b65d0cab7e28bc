//! Error types for the kiln CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Each variant carries a stable kind string (used in run events and outcome
//! records) and maps to one of the exit codes in [`crate::exit_codes`].

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kiln operations.
#[derive(Error, Debug)]
pub enum KilnError {
    /// User provided invalid arguments, settings, or the workspace is missing.
    #[error("{0}")]
    UserError(String),

    /// A requested path resolved outside its allowed base directory.
    #[error("path '{requested}' escapes allowed directory '{}'", .base.display())]
    PathTraversal { requested: String, base: PathBuf },

    /// A prompt configuration failed schema validation.
    #[error("invalid config field '{field}': {reason}")]
    ConfigValidation { field: String, reason: String },

    /// A template file exceeded the size ceiling.
    #[error("template is {size} bytes, exceeding the {limit} byte limit")]
    TemplateSize { size: u64, limit: u64 },

    /// A template placeholder could not be parsed.
    #[error("invalid placeholder at byte {position} in template")]
    TemplateSyntax { position: usize },

    /// A template placeholder had no matching variable (strict mode).
    #[error("missing required variable '{name}'")]
    MissingVariable { name: String },

    /// The generation capability rejected the caller's credentials.
    #[error("generation access denied: {0}")]
    GenerationAccess(String),

    /// The generation capability reported rate or quota exhaustion.
    #[error("generation quota exhausted: {0}")]
    GenerationQuota(String),

    /// The generation response could not be parsed into text.
    #[error("unparseable generation response: {0}")]
    GenerationInvalidResponse(String),

    /// Any other generation capability failure (transport, 5xx, ...).
    #[error("generation failed: {0}")]
    Generation(String),

    /// The model identifier belongs to no supported family.
    #[error("unsupported model family: {0}")]
    UnsupportedModel(String),

    /// Publishing failed: size ceiling, prefix violation, or storage error.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The storage collaborator could not be reached or constructed.
    #[error("storage error: {0}")]
    Storage(String),

    /// One or more configs in a batch run failed.
    #[error("{failed} of {total} config(s) failed")]
    Batch { failed: usize, total: usize },
}

impl KilnError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            KilnError::UserError(_) => exit_codes::USER_ERROR,
            KilnError::PathTraversal { .. }
            | KilnError::ConfigValidation { .. }
            | KilnError::TemplateSize { .. }
            | KilnError::TemplateSyntax { .. }
            | KilnError::MissingVariable { .. } => exit_codes::CONFIG_FAILURE,
            KilnError::GenerationAccess(_)
            | KilnError::GenerationQuota(_)
            | KilnError::GenerationInvalidResponse(_)
            | KilnError::Generation(_)
            | KilnError::UnsupportedModel(_) => exit_codes::GENERATION_FAILURE,
            KilnError::Publish(_) | KilnError::Storage(_) => exit_codes::PUBLISH_FAILURE,
            KilnError::Batch { .. } => exit_codes::BATCH_FAILURE,
        }
    }

    /// Returns a stable kind string for events and outcome records.
    pub fn kind(&self) -> &'static str {
        match self {
            KilnError::UserError(_) => "user_error",
            KilnError::PathTraversal { .. } => "path_traversal",
            KilnError::ConfigValidation { .. } => "config_validation",
            KilnError::TemplateSize { .. } => "template_size",
            KilnError::TemplateSyntax { .. } => "template_syntax",
            KilnError::MissingVariable { .. } => "missing_variable",
            KilnError::GenerationAccess(_) => "generation_access",
            KilnError::GenerationQuota(_) => "generation_quota",
            KilnError::GenerationInvalidResponse(_) => "generation_invalid_response",
            KilnError::Generation(_) => "generation_api",
            KilnError::UnsupportedModel(_) => "unsupported_model",
            KilnError::Publish(_) => "publish",
            KilnError::Storage(_) => "storage",
            KilnError::Batch { .. } => "batch",
        }
    }
}

/// Result type alias for kiln operations.
pub type Result<T> = std::result::Result<T, KilnError>;
