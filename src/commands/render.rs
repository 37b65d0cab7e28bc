//! Implementation of the `kiln render` command.
//!
//! Offline dry-run: loads and validates one config, renders its template,
//! and prints the prompt that `run` would send to the generation
//! capability. Nothing is generated or published and no event is logged.

use super::config_name;
use crate::cli::RenderArgs;
use crate::error::{KilnError, Result};
use crate::paths;
use crate::prompt::{PromptConfig, RenderedPrompt, Strictness, template};
use crate::workspace::Workspace;
use std::fs;

/// Execute the `kiln render` command.
pub fn cmd_render(args: RenderArgs) -> Result<()> {
    let workspace = Workspace::resolve()?;
    workspace.ensure_initialized()?;

    let mode = if args.loose_variables {
        Strictness::Loose
    } else {
        Strictness::Strict
    };

    let rendered = render_config(&workspace, &args.config, mode)?;

    if !rendered.missing.is_empty() {
        eprintln!(
            "warning: unresolved variables: {}",
            rendered.missing.join(", ")
        );
    }

    print!("{}", rendered.text);
    Ok(())
}

/// Resolve, validate, and render one config's template.
pub(crate) fn render_config(
    workspace: &Workspace,
    config: &str,
    mode: Strictness,
) -> Result<RenderedPrompt> {
    let name = config_name(config);
    let config_path = paths::resolve(&workspace.prompts_dir, name)?;
    let raw = fs::read_to_string(&config_path).map_err(|e| {
        KilnError::UserError(format!(
            "failed to read config '{}': {}",
            config_path.display(),
            e
        ))
    })?;
    let config = PromptConfig::from_json(&raw)?;

    let template_path = paths::resolve(&workspace.templates_dir, &config.template)?;
    let content = template::load_template(&template_path)?;

    template::render(&content, &config.variables, mode)
}
