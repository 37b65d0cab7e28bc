//! Implementation of the `kiln init` command.
//!
//! Scaffolds the workspace layout: the prompts and template directories
//! with a working starter pair, the local outputs directory, the run-state
//! directory, and a default `kiln.yaml`. Existing files are never
//! overwritten, so re-running `init` is safe.

use crate::error::{KilnError, Result};
use crate::fs::atomic_write_file;
use crate::settings::Settings;
use crate::workspace::Workspace;
use std::fs;
use std::path::Path;

const SAMPLE_TEMPLATE: &str = "Write a short, friendly greeting for $name.\n\
                               Mention that this page was generated for the $audience audience.\n";

const SAMPLE_CONFIG: &str = r#"{
  "template": "greet.txt",
  "output_name": "greeting",
  "output_format": "html",
  "variables": {
    "name": "Ada",
    "audience": "beta"
  }
}
"#;

const STATE_GITIGNORE: &str = "# Machine-local run state (never commit)\n*\n";

/// Execute the `kiln init` command.
pub fn cmd_init() -> Result<()> {
    let workspace = Workspace::resolve()?;
    let created = scaffold(&workspace)?;

    if created.is_empty() {
        println!(
            "kiln workspace at {} is already initialized.",
            workspace.root.display()
        );
    } else {
        println!("Initialized kiln workspace at {}", workspace.root.display());
        for item in &created {
            println!("  created {}", item);
        }
        println!();
        println!("Next steps:");
        println!("  1. Edit kiln.yaml (bucket, prefix, region)");
        println!("  2. Add templates to prompt_templates/ and configs to prompts/");
        println!("  3. kiln check, then kiln run");
    }

    Ok(())
}

/// Create the workspace structure, returning what was newly created.
pub(crate) fn scaffold(workspace: &Workspace) -> Result<Vec<String>> {
    let mut created = Vec::new();

    for (dir, label) in [
        (&workspace.prompts_dir, "prompts/"),
        (&workspace.templates_dir, "prompt_templates/"),
        (&workspace.outputs_dir, "outputs/"),
        (&workspace.state_dir, ".kiln/"),
    ] {
        if !dir.exists() {
            create_dir(dir)?;
            created.push(label.to_string());
        }
    }

    let settings_path = workspace.settings_path();
    if !settings_path.exists() {
        let yaml = Settings::default().to_yaml()?;
        atomic_write_file(&settings_path, &yaml)?;
        created.push("kiln.yaml".to_string());
    }

    let template_path = workspace.templates_dir.join("greet.txt");
    if !template_path.exists() {
        atomic_write_file(&template_path, SAMPLE_TEMPLATE)?;
        created.push("prompt_templates/greet.txt".to_string());
    }

    let config_path = workspace.prompts_dir.join("greet.json");
    if !config_path.exists() {
        atomic_write_file(&config_path, SAMPLE_CONFIG)?;
        created.push("prompts/greet.json".to_string());
    }

    let gitignore_path = workspace.state_dir.join(".gitignore");
    if !gitignore_path.exists() {
        atomic_write_file(&gitignore_path, STATE_GITIGNORE)?;
        created.push(".kiln/.gitignore".to_string());
    }

    Ok(created)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        KilnError::UserError(format!(
            "failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}
