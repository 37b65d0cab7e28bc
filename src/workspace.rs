//! Workspace path resolution for kiln.
//!
//! A kiln workspace is the directory a CI job runs in. It holds the prompt
//! configs, the template root, the local output mirror, and kiln's own state
//! directory. All commands resolve paths through this module so that
//! caller-supplied names are always checked against the right base.
//!
//! Layout relative to the workspace root:
//! - `prompts/`           prompt configuration files (JSON)
//! - `prompt_templates/`  template files referenced by configs
//! - `outputs/`           local copies of published artifacts
//! - `.kiln/`             run state (event log)
//! - `kiln.yaml`          optional processor settings

use crate::error::{KilnError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Directory for prompt configuration files.
pub const PROMPTS_DIR: &str = "prompts";

/// Directory for template files.
pub const TEMPLATES_DIR: &str = "prompt_templates";

/// Directory for local artifact copies.
pub const OUTPUTS_DIR: &str = "outputs";

/// Directory for kiln run state.
pub const STATE_DIR: &str = ".kiln";

/// Settings file name at the workspace root.
pub const SETTINGS_FILE: &str = "kiln.yaml";

/// Resolved paths for a kiln workspace. All paths are absolute.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Workspace root directory.
    pub root: PathBuf,

    /// Prompt config root (`{root}/prompts/`).
    pub prompts_dir: PathBuf,

    /// Template root (`{root}/prompt_templates/`).
    pub templates_dir: PathBuf,

    /// Local artifact directory (`{root}/outputs/`).
    pub outputs_dir: PathBuf,

    /// Run state directory (`{root}/.kiln/`).
    pub state_dir: PathBuf,
}

impl Workspace {
    /// Resolve the workspace from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            KilnError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Ok(Self::resolve_from(cwd))
    }

    /// Resolve the workspace from a specific root directory.
    pub fn resolve_from<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            prompts_dir: root.join(PROMPTS_DIR),
            templates_dir: root.join(TEMPLATES_DIR),
            outputs_dir: root.join(OUTPUTS_DIR),
            state_dir: root.join(STATE_DIR),
            root,
        }
    }

    /// Path to the settings file (`kiln.yaml`), which may not exist.
    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    /// Path to the NDJSON run-event log.
    pub fn events_path(&self) -> PathBuf {
        self.state_dir.join("events.ndjson")
    }

    /// Whether the workspace layout has been scaffolded.
    pub fn is_initialized(&self) -> bool {
        self.prompts_dir.is_dir() && self.templates_dir.is_dir()
    }

    /// Ensure the workspace is initialized, with guidance if not.
    ///
    /// Called by every command except `init`.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.prompts_dir.is_dir() {
            return Err(KilnError::UserError(format!(
                "prompt config directory not found.\n\
                 Expected: {}\n\n\
                 Run `kiln init` to scaffold the workspace in this directory.",
                self.prompts_dir.display()
            )));
        }

        if !self.templates_dir.is_dir() {
            return Err(KilnError::UserError(format!(
                "template directory not found.\n\
                 Expected: {}\n\n\
                 Run `kiln init` to scaffold the workspace in this directory.",
                self.templates_dir.display()
            )));
        }

        Ok(())
    }
}
