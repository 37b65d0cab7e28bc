//! Command implementations for kiln.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the config-selection helper shared by `run` and
//! `check`.

mod check;
mod init;
mod render;
mod run;

use crate::cli::Command;
use crate::error::{KilnError, Result};
use crate::workspace::Workspace;
use globset::Glob;
use std::fs;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(),
        Command::Run(args) => run::cmd_run(args),
        Command::Render(args) => render::cmd_render(args),
        Command::Check(args) => check::cmd_check(args),
    }
}

/// Strip a conventional `prompts/` prefix so CI can pass paths as printed
/// by its own tooling.
pub(crate) fn config_name(pattern: &str) -> &str {
    pattern.strip_prefix("prompts/").unwrap_or(pattern)
}

/// Expand config file names and glob patterns against the prompts directory.
///
/// With no patterns, selects every `*.json` file in sorted order. Exact
/// file names are taken as given (the pipeline still traversal-checks
/// them); other patterns are matched as globs against the directory
/// listing. A pattern that matches nothing is a user error. Duplicates are
/// dropped, first occurrence winning, so order follows the caller.
pub(crate) fn select_configs(workspace: &Workspace, patterns: &[String]) -> Result<Vec<String>> {
    let available = list_config_names(workspace)?;

    if patterns.is_empty() {
        if available.is_empty() {
            return Err(KilnError::UserError(format!(
                "no prompt configs found in '{}'.\n\n\
                 Add a *.json config or pass config names explicitly.",
                workspace.prompts_dir.display()
            )));
        }
        return Ok(available);
    }

    let mut selected: Vec<String> = Vec::new();

    for pattern in patterns {
        let name = config_name(pattern);

        if workspace.prompts_dir.join(name).is_file() {
            push_unique(&mut selected, name.to_string());
            continue;
        }

        let matcher = Glob::new(name)
            .map_err(|e| {
                KilnError::UserError(format!("invalid config pattern '{}': {}", pattern, e))
            })?
            .compile_matcher();

        let mut matched = false;
        for candidate in &available {
            if matcher.is_match(candidate) {
                matched = true;
                push_unique(&mut selected, candidate.clone());
            }
        }

        if !matched {
            return Err(KilnError::UserError(format!(
                "config '{}' matched nothing in '{}'",
                pattern,
                workspace.prompts_dir.display()
            )));
        }
    }

    Ok(selected)
}

fn push_unique(selected: &mut Vec<String>, name: String) {
    if !selected.contains(&name) {
        selected.push(name);
    }
}

/// All `*.json` file names in the prompts directory, sorted.
fn list_config_names(workspace: &Workspace) -> Result<Vec<String>> {
    let entries = fs::read_dir(&workspace.prompts_dir).map_err(|e| {
        KilnError::UserError(format!(
            "failed to list '{}': {}",
            workspace.prompts_dir.display(),
            e
        ))
    })?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            KilnError::UserError(format!(
                "failed to list '{}': {}",
                workspace.prompts_dir.display(),
                e
            ))
        })?;
        let path = entry.path();
        if path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("json")
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            names.push(name.to_string());
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_workspace;

    #[test]
    fn no_patterns_selects_all_json_sorted() {
        let fixture = create_test_workspace();
        fixture.write_config("b.json", "{}");
        fixture.write_config("a.json", "{}");
        fixture.write_template("readme.txt", "not a config");

        let selected = select_configs(&fixture.workspace, &[]).unwrap();
        assert_eq!(selected, vec!["a.json", "b.json"]);
    }

    #[test]
    fn no_patterns_with_empty_directory_is_a_user_error() {
        let fixture = create_test_workspace();
        let err = select_configs(&fixture.workspace, &[]).unwrap_err();
        assert!(err.to_string().contains("no prompt configs"));
    }

    #[test]
    fn exact_names_keep_caller_order() {
        let fixture = create_test_workspace();
        fixture.write_config("a.json", "{}");
        fixture.write_config("b.json", "{}");

        let selected = select_configs(
            &fixture.workspace,
            &["b.json".to_string(), "a.json".to_string()],
        )
        .unwrap();
        assert_eq!(selected, vec!["b.json", "a.json"]);
    }

    #[test]
    fn prompts_prefix_is_stripped() {
        let fixture = create_test_workspace();
        fixture.write_config("a.json", "{}");

        let selected =
            select_configs(&fixture.workspace, &["prompts/a.json".to_string()]).unwrap();
        assert_eq!(selected, vec!["a.json"]);
    }

    #[test]
    fn glob_pattern_expands_sorted() {
        let fixture = create_test_workspace();
        fixture.write_config("release-2.json", "{}");
        fixture.write_config("release-1.json", "{}");
        fixture.write_config("other.json", "{}");

        let selected =
            select_configs(&fixture.workspace, &["release-*.json".to_string()]).unwrap();
        assert_eq!(selected, vec!["release-1.json", "release-2.json"]);
    }

    #[test]
    fn duplicates_are_dropped() {
        let fixture = create_test_workspace();
        fixture.write_config("a.json", "{}");

        let selected = select_configs(
            &fixture.workspace,
            &["a.json".to_string(), "*.json".to_string()],
        )
        .unwrap();
        assert_eq!(selected, vec!["a.json"]);
    }

    #[test]
    fn unmatched_pattern_is_a_user_error() {
        let fixture = create_test_workspace();
        fixture.write_config("a.json", "{}");

        let err =
            select_configs(&fixture.workspace, &["missing-*.json".to_string()]).unwrap_err();
        assert!(err.to_string().contains("matched nothing"));
    }
}
