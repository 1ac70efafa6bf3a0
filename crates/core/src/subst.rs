// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lexical `$VAR` substitution over job-spec strings.
//!
//! Supported forms: `$NAME` and `${NAME}` where `NAME` is an identifier
//! (`[A-Za-z_][A-Za-z0-9_]*`). `\$` escapes a dollar, `\\` escapes a
//! backslash; a backslash before any other character passes through
//! verbatim. `$$` is rejected outright — no variable is ever named `$`.

use crate::spec::Env;
use thiserror::Error;

/// Failure to substitute; every variant is a variable-reference error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstError {
    #[error("no such environment variable: {name:?} (in {text:?})")]
    UnknownVariable { name: String, text: String },
    #[error("$$ is not allowed (no variable can be named $): {0:?}")]
    DollarDollar(String),
    #[error("invalid variable reference in {0:?}")]
    InvalidPlaceholder(String),
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expand every variable reference in `text` against `env`.
pub fn substitute(text: &str, env: &Env) -> Result<String, SubstError> {
    if text.contains("$$") {
        return Err(SubstError::DollarDollar(text.to_string()));
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                Some('$') => {
                    chars.next();
                    out.push('$');
                }
                _ => out.push('\\'),
            },
            '$' => {
                let name = parse_name(&mut chars, text)?;
                match env.get(&name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(SubstError::UnknownVariable {
                            name,
                            text: text.to_string(),
                        })
                    }
                }
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Parse the identifier following a `$`, consuming `${NAME}` braces.
fn parse_name(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    text: &str,
) -> Result<String, SubstError> {
    let invalid = || SubstError::InvalidPlaceholder(text.to_string());

    let braced = chars.peek() == Some(&'{');
    if braced {
        chars.next();
    }

    let mut name = String::new();
    match chars.peek() {
        Some(&c) if is_ident_start(c) => {
            name.push(c);
            chars.next();
        }
        _ => return Err(invalid()),
    }
    while let Some(&c) = chars.peek() {
        if is_ident_continue(c) {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }

    if braced && chars.next() != Some('}') {
        return Err(invalid());
    }
    Ok(name)
}

#[cfg(test)]
#[path = "subst_tests.rs"]
mod tests;
