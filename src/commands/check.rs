//! Implementation of the `kiln check` command.
//!
//! Offline validation for CI: for each selected config, checks the schema,
//! resolves and loads the template (size guard included), and renders in
//! strict mode so any placeholder without a binding fails here instead of
//! after a paid generation call. Rendering is always strict regardless of
//! the `strict_variables` setting; `check` exists to catch exactly that.

use super::{render::render_config, select_configs};
use crate::cli::CheckArgs;
use crate::error::{KilnError, Result};
use crate::prompt::Strictness;
use crate::workspace::Workspace;

/// Execute the `kiln check` command.
pub fn cmd_check(args: CheckArgs) -> Result<()> {
    let workspace = Workspace::resolve()?;
    workspace.ensure_initialized()?;

    let configs = select_configs(&workspace, &args.configs)?;

    let mut failed = 0;
    for name in &configs {
        match render_config(&workspace, name, Strictness::Strict) {
            Ok(rendered) => {
                println!(
                    "  ok {} ({} bytes rendered, {} variable(s) used)",
                    name,
                    rendered.text.len(),
                    rendered.used.len()
                );
            }
            Err(err) => {
                failed += 1;
                eprintln!("  x {}: {}", name, err);
            }
        }
    }

    println!(
        "Checked {} config(s): {} ok, {} failed.",
        configs.len(),
        configs.len() - failed,
        failed
    );

    if failed == 0 {
        Ok(())
    } else {
        Err(KilnError::Batch {
            failed,
            total: configs.len(),
        })
    }
}
