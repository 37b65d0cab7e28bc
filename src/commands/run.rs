//! Implementation of the `kiln run` command.
//!
//! Resolves settings and the config batch, builds the HTTP collaborators,
//! drives the pipeline, prints a summary, and maps any per-config failures
//! into a non-zero batch exit.

use super::select_configs;
use crate::cli::RunArgs;
use crate::error::{KilnError, Result};
use crate::generate::HttpGenerator;
use crate::pipeline::{ConfigOutcome, Pipeline, RunResult};
use crate::publish::HttpObjectStore;
use crate::settings::{Settings, SettingsOverrides};
use crate::workspace::Workspace;
use std::time::Duration;

/// Execute the `kiln run` command.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let workspace = Workspace::resolve()?;
    workspace.ensure_initialized()?;

    let settings = Settings::resolve(workspace.settings_path(), &overrides_from(&args))?;
    settings.require_bucket()?;

    let configs = select_configs(&workspace, &args.configs)?;

    let timeout = Duration::from_secs(settings.timeout_seconds);
    let generator = HttpGenerator::new(
        settings.effective_generation_endpoint(),
        settings.api_key.clone(),
        timeout,
    )?;
    let store = HttpObjectStore::new(
        settings.effective_storage_endpoint()?,
        settings.api_key.clone(),
        timeout,
    )?;

    let pipeline = Pipeline::new(&workspace, &settings, &generator, &store);
    let result = pipeline.run(&configs)?;

    print_summary(&result);

    if result.is_success() {
        Ok(())
    } else {
        Err(KilnError::Batch {
            failed: result.failed(),
            total: result.total(),
        })
    }
}

fn overrides_from(args: &RunArgs) -> SettingsOverrides {
    SettingsOverrides {
        region: args.region.clone(),
        bucket: args.bucket.clone(),
        prefix: args.prefix.clone(),
        generation_endpoint: args.generation_endpoint.clone(),
        storage_endpoint: args.storage_endpoint.clone(),
        timeout_seconds: args.timeout_seconds,
        loose_variables: args.loose_variables,
    }
}

fn print_summary(result: &RunResult) {
    println!();
    println!(
        "Processed {} config(s): {} succeeded, {} failed.",
        result.total(),
        result.succeeded(),
        result.failed()
    );

    for outcome in &result.outcomes {
        if let ConfigOutcome::Success {
            config,
            destination_key,
        } = outcome
        {
            println!("  ok {} -> {}", config, destination_key);
        }
    }

    for outcome in &result.outcomes {
        if let ConfigOutcome::Failure {
            config,
            stage,
            message,
            ..
        } = outcome
        {
            eprintln!("  x {} ({}: {})", config, stage, message);
        }
    }
}
