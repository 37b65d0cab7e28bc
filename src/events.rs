//! Run-event logging for kiln.
//!
//! Each pipeline run appends events to an NDJSON log (one JSON object per
//! line) at `.kiln/events.ndjson`, giving CI a durable record of what each
//! invocation validated, rendered, generated, and published.
//!
//! Event fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: the pipeline step (run_start, validate, render, ...)
//! - `actor`: the runner identity (`user@HOST`)
//! - `config`: optional config file name for per-config events
//! - `details`: freeform object with step-specific details

use crate::error::{KilnError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Pipeline steps that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A batch run started.
    RunStart,
    /// A config passed schema validation.
    Validate,
    /// A template was rendered.
    Render,
    /// The generation capability returned content.
    Generate,
    /// An artifact was uploaded.
    Publish,
    /// A config failed at some stage.
    ConfigFailed,
    /// A batch run finished (successfully or not).
    RunComplete,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::RunStart => write!(f, "run_start"),
            EventAction::Validate => write!(f, "validate"),
            EventAction::Render => write!(f, "render"),
            EventAction::Generate => write!(f, "generate"),
            EventAction::Publish => write!(f, "publish"),
            EventAction::ConfigFailed => write!(f, "config_failed"),
            EventAction::RunComplete => write!(f, "run_complete"),
        }
    }
}

/// A single event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The pipeline step.
    pub action: EventAction,

    /// The runner identity (`user@HOST`).
    pub actor: String,

    /// Config file name for per-config events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,

    /// Step-specific details.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped now.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            config: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach the config file name this event concerns.
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    /// Attach step-specific details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize to a single NDJSON line.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| KilnError::UserError(format!("failed to serialize event: {}", e)))
    }
}

/// Runner identity for event metadata.
fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append-only handle on a run-event log file.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Create a log handle for the given file path.
    ///
    /// The file and its parent directory are created on first append.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one event as a single NDJSON line, synced to disk.
    pub fn append(&self, event: &Event) -> Result<()> {
        let line = event.to_ndjson_line()?;

        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                KilnError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                KilnError::UserError(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", line).map_err(|e| {
            KilnError::UserError(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            KilnError::UserError(format!(
                "failed to sync events file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}
