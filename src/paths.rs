//! Traversal-safe path resolution.
//!
//! Every caller-supplied file name (prompt configs, templates) is resolved
//! through [`resolve`] against a trusted base directory before any read.
//! The check is component-wise: the resolved path must have the canonical
//! base as a strict ancestor. String-prefix comparison is not enough, since
//! it accepts sibling directories like `/work/prompts-evil` when the base is
//! `/work/prompts`.

use crate::error::{KilnError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolve `requested` inside `base_dir`, rejecting anything that escapes it.
///
/// The base directory is trusted and must exist. The requested name may name
/// a file that does not exist yet; existence is the caller's concern. Names
/// that are empty, absolute, contain a NUL byte, or resolve (through `..`
/// segments or symlinks) outside the base fail with `PathTraversal`.
pub fn resolve(base_dir: &Path, requested: &str) -> Result<PathBuf> {
    let traversal = || KilnError::PathTraversal {
        requested: requested.to_string(),
        base: base_dir.to_path_buf(),
    };

    if requested.is_empty() || requested.contains('\0') {
        return Err(traversal());
    }

    let requested_path = Path::new(requested);
    if requested_path.is_absolute() || requested.starts_with('/') || requested.starts_with('\\') {
        return Err(traversal());
    }

    let base = fs::canonicalize(base_dir).map_err(|e| {
        KilnError::UserError(format!(
            "base directory '{}' is not accessible: {}",
            base_dir.display(),
            e
        ))
    })?;

    let joined = base.join(requested_path);

    // Existing paths go through the filesystem so symlinks are resolved;
    // non-existent ones are normalized lexically.
    let candidate = if joined.exists() {
        fs::canonicalize(&joined).map_err(|e| {
            KilnError::UserError(format!(
                "failed to resolve path '{}': {}",
                joined.display(),
                e
            ))
        })?
    } else {
        normalize(&joined)
    };

    if candidate.starts_with(&base) && candidate != base {
        Ok(candidate)
    } else {
        Err(traversal())
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
