//! Template loading and `$name` variable substitution.
//!
//! Templates are plain text with `$name` or `${name}` placeholders
//! (names are `[A-Za-z_][A-Za-z0-9_]*`, case-sensitive) and `$$` for a
//! literal `$`. A `$` followed by anything else is a syntax error rather
//! than silently passing through, so typos surface instead of leaking into
//! generated prompts.
//!
//! Missing bindings are governed by [`Strictness`]: strict mode (the
//! default) fails naming the first missing variable; loose mode leaves the
//! placeholder text verbatim and reports the name in
//! [`RenderedPrompt::missing`]. Entries in the variable map that no
//! placeholder references are ignored. Substituted values are not escaped
//! or re-scanned.

use crate::error::{KilnError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Size ceiling for template files, in bytes.
pub const MAX_TEMPLATE_SIZE: u64 = 100 * 1024;

/// Policy for placeholders with no matching variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Fail on the first unresolved placeholder (the default).
    #[default]
    Strict,
    /// Leave unresolved placeholders verbatim and report them.
    Loose,
}

/// A rendered template, with bookkeeping on variable usage.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    /// The substituted text.
    pub text: String,

    /// Variable names that were substituted, in first-use order.
    pub used: Vec<String>,

    /// Placeholder names with no binding (loose mode only; strict mode
    /// errors before producing a prompt).
    pub missing: Vec<String>,
}

/// Load a template file, enforcing the size ceiling before reading.
///
/// A file of exactly [`MAX_TEMPLATE_SIZE`] bytes is accepted; one byte
/// over is rejected.
pub fn load_template(path: &Path) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| {
        KilnError::UserError(format!(
            "template file '{}' is not readable: {}",
            path.display(),
            e
        ))
    })?;

    if metadata.len() > MAX_TEMPLATE_SIZE {
        return Err(KilnError::TemplateSize {
            size: metadata.len(),
            limit: MAX_TEMPLATE_SIZE,
        });
    }

    fs::read_to_string(path).map_err(|e| {
        KilnError::UserError(format!(
            "failed to read template '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Render a template by substituting `$name` placeholders.
pub fn render(
    template: &str,
    variables: &BTreeMap<String, String>,
    mode: Strictness,
) -> Result<RenderedPrompt> {
    let mut text = String::with_capacity(template.len());
    let mut used: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        if ch != '$' {
            text.push(ch);
            continue;
        }

        match chars.peek().copied() {
            // Trailing '$' with nothing after it.
            None => return Err(KilnError::TemplateSyntax { position: pos }),

            // Escape sequence $$
            Some((_, '$')) => {
                chars.next();
                text.push('$');
            }

            // Braced form ${name}
            Some((_, '{')) => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed || !is_identifier(&name) {
                    return Err(KilnError::TemplateSyntax { position: pos });
                }
                bind(name, true, variables, mode, &mut text, &mut used, &mut missing)?;
            }

            // Bare form $name
            Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                bind(name, false, variables, mode, &mut text, &mut used, &mut missing)?;
            }

            // '$' followed by anything else is malformed.
            Some(_) => return Err(KilnError::TemplateSyntax { position: pos }),
        }
    }

    Ok(RenderedPrompt {
        text,
        used,
        missing,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn bind(
    name: String,
    braced: bool,
    variables: &BTreeMap<String, String>,
    mode: Strictness,
    text: &mut String,
    used: &mut Vec<String>,
    missing: &mut Vec<String>,
) -> Result<()> {
    match variables.get(&name) {
        Some(value) => {
            text.push_str(value);
            if !used.contains(&name) {
                used.push(name);
            }
            Ok(())
        }
        None => match mode {
            Strictness::Strict => Err(KilnError::MissingVariable { name }),
            Strictness::Loose => {
                if braced {
                    text.push_str("${");
                    text.push_str(&name);
                    text.push('}');
                } else {
                    text.push('$');
                    text.push_str(&name);
                }
                if !missing.contains(&name) {
                    missing.push(name);
                }
                Ok(())
            }
        },
    }
}
