//! CLI argument parsing for kiln.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Kiln: prompt-to-artifact generation pipeline.
///
/// Reads declarative prompt configs, renders text templates with variable
/// substitution, sends the rendered prompts to a managed LLM capability,
/// and publishes the generated artifacts to object storage under an
/// environment-scoped prefix. Designed to run once per batch from CI.
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for kiln.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scaffold a kiln workspace in the current directory.
    ///
    /// Creates the prompts/, prompt_templates/, and outputs/ directories,
    /// a starter template and config, and a default kiln.yaml.
    Init,

    /// Process prompt configs end-to-end.
    ///
    /// For each config: validate, render the template, invoke the
    /// generation capability, and publish the artifact. Exits non-zero
    /// if any config fails.
    Run(RunArgs),

    /// Render a config's template and print the prompt.
    ///
    /// Offline dry-run: no generation or publication happens.
    Render(RenderArgs),

    /// Validate configs and templates without generating or publishing.
    ///
    /// Checks config schemas, template resolvability and size, and that
    /// every placeholder has a variable binding.
    Check(CheckArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Config file names or glob patterns, relative to prompts/.
    ///
    /// Defaults to every *.json file in prompts/, in sorted order.
    pub configs: Vec<String>,

    /// Region for the derived generation and storage endpoints.
    #[arg(long)]
    pub region: Option<String>,

    /// Destination bucket for published artifacts.
    #[arg(long)]
    pub bucket: Option<String>,

    /// Environment prefix under which artifacts are stored (e.g. beta, prod).
    #[arg(long)]
    pub prefix: Option<String>,

    /// Generation endpoint override.
    #[arg(long)]
    pub generation_endpoint: Option<String>,

    /// Storage endpoint override.
    #[arg(long)]
    pub storage_endpoint: Option<String>,

    /// Timeout for each network call, in seconds.
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Leave unresolved placeholders verbatim instead of failing.
    #[arg(long)]
    pub loose_variables: bool,
}

/// Arguments for the `render` command.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Config file name, relative to prompts/.
    pub config: String,

    /// Leave unresolved placeholders verbatim instead of failing.
    #[arg(long)]
    pub loose_variables: bool,
}

/// Arguments for the `check` command.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Config file names or glob patterns, relative to prompts/.
    ///
    /// Defaults to every *.json file in prompts/.
    pub configs: Vec<String>,
}
