// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job specification data model.
//!
//! A job spec is a JSON tree: the root carries the `import` list and
//! `nohash_params` plus a command node; every command node carries exactly
//! one action key (`commands`, `cmd`, `hit`, `set`, `prepend_path`,
//! `append_path`, `prepend_flag`, `append_flag`) and optional modifiers
//! (`cwd`, `inputs`, `to_var`, `append_to_file`, `value`). Parsing goes
//! through raw serde mirrors and validates the whole shape up front, so the
//! executor only ever sees well-formed trees.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Environment mapping. Value-typed: pushing a scope is a clone.
pub type Env = BTreeMap<String, String>;

/// Shape errors detected while canonicalizing a job spec.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error(
        "command node must have one of the keys commands, cmd, hit, set, \
         prepend_path, append_path, prepend_flag, append_flag"
    )]
    MissingAction,
    #[error("several action keys present: {0} and {1}")]
    MultipleActions(&'static str, &'static str),
    #[error("'{0}' requires at least one argument")]
    EmptyCommand(&'static str),
    #[error("'{action}' requires a 'value'")]
    MissingValue { action: &'static str },
    #[error("can only have one of to_var, append_to_file")]
    ConflictingRedirects,
    #[error("'commands' not compatible with to_var, append_to_file or inputs")]
    GroupWithLeafModifiers,
    #[error("need exactly one of 'text', 'string', 'json' in input entry")]
    MalformedInput,
    #[error("empty import ref should be omitted, not \"\"")]
    InvalidRef,
    #[error("invalid job spec: {0}")]
    Shape(#[from] serde_json::Error),
}

/// One entry of the root `import` list, defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    /// Artifact id, possibly prefixed `virtual:`.
    pub id: String,
    /// Variable name to bind the artifact path to (`<ref>` and `<ref>_ID`).
    pub reference: Option<String>,
    /// Whether the artifact contributes PATH/CFLAGS/LDFLAGS entries.
    pub in_env: bool,
}

/// Environment-mutating action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOp {
    Set,
    PrependPath,
    AppendPath,
    PrependFlag,
    AppendFlag,
}

impl EnvOp {
    /// The action key this op was spelled as.
    pub fn key(self) -> &'static str {
        match self {
            EnvOp::Set => "set",
            EnvOp::PrependPath => "prepend_path",
            EnvOp::AppendPath => "append_path",
            EnvOp::PrependFlag => "prepend_flag",
            EnvOp::AppendFlag => "append_flag",
        }
    }

    /// Join separator: the Unix path separator for `*_path`, a space for
    /// `*_flag`, none for `set`.
    pub fn separator(self) -> Option<char> {
        match self {
            EnvOp::Set => None,
            EnvOp::PrependPath | EnvOp::AppendPath => Some(':'),
            EnvOp::PrependFlag | EnvOp::AppendFlag => Some(' '),
        }
    }

    /// Whether the new value goes in front of the existing one.
    pub fn prepends(self) -> bool {
        matches!(self, EnvOp::PrependPath | EnvOp::PrependFlag)
    }
}

/// The action a command node performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Nested scope: run children in order with a copied environment.
    Commands(Vec<CommandNode>),
    /// Spawn a child process.
    Cmd(Vec<String>),
    /// Run the in-process `hit` helper.
    Hit(Vec<String>),
    /// Mutate a variable in the current scope.
    EnvMod { var: String, op: EnvOp, value: String },
}

/// An inline input document dumped to a temp file before a leaf runs.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    /// Lines joined with `\n`.
    Text(Vec<String>),
    /// Verbatim contents.
    Str(String),
    /// Pretty-printed JSON; the temp file gets a `.json` suffix.
    Json(Value),
}

/// One validated node of the command tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandNode {
    pub action: Action,
    /// Working directory, joined onto the enclosing one (may be relative).
    pub cwd: Option<String>,
    pub inputs: Vec<InputSpec>,
    /// Capture stdout into this variable in the enclosing scope.
    pub to_var: Option<String>,
    /// Append stdout to this file instead of logging it.
    pub append_to_file: Option<String>,
}

/// A canonicalized job specification.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub imports: Vec<ImportEntry>,
    pub nohash_params: Env,
    pub root: CommandNode,
}

impl JobSpec {
    /// Parse and canonicalize a job spec from a JSON value.
    pub fn from_value(value: &Value) -> Result<Self, SpecError> {
        RawSpec::deserialize(value)?.into_spec()
    }

    /// Parse and canonicalize a job spec from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        serde_json::from_str::<RawSpec>(text)?.into_spec()
    }
}

// =============================================================================
// Raw serde mirrors
// =============================================================================

#[derive(Deserialize)]
struct RawSpec {
    #[serde(default)]
    import: Vec<RawImport>,
    #[serde(default)]
    nohash_params: Env,
    #[serde(flatten)]
    node: RawNode,
}

#[derive(Deserialize)]
struct RawImport {
    id: String,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default = "default_true")]
    in_env: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct RawNode {
    commands: Option<Vec<RawNode>>,
    cmd: Option<Vec<String>>,
    hit: Option<Vec<String>>,
    set: Option<String>,
    prepend_path: Option<String>,
    append_path: Option<String>,
    prepend_flag: Option<String>,
    append_flag: Option<String>,
    value: Option<String>,
    cwd: Option<String>,
    inputs: Option<Vec<RawInput>>,
    to_var: Option<String>,
    append_to_file: Option<String>,
}

#[derive(Deserialize)]
struct RawInput {
    text: Option<Vec<String>>,
    string: Option<String>,
    json: Option<Value>,
}

impl RawSpec {
    fn into_spec(self) -> Result<JobSpec, SpecError> {
        let imports = self
            .import
            .into_iter()
            .map(RawImport::into_entry)
            .collect::<Result<_, _>>()?;
        Ok(JobSpec {
            imports,
            nohash_params: self.nohash_params,
            root: self.node.into_node()?,
        })
    }
}

impl RawImport {
    fn into_entry(self) -> Result<ImportEntry, SpecError> {
        if self.reference.as_deref() == Some("") {
            return Err(SpecError::InvalidRef);
        }
        Ok(ImportEntry {
            id: self.id,
            reference: self.reference,
            in_env: self.in_env,
        })
    }
}

impl RawNode {
    fn into_node(self) -> Result<CommandNode, SpecError> {
        let mut present: Vec<&'static str> = Vec::new();
        if self.commands.is_some() {
            present.push("commands");
        }
        if self.cmd.is_some() {
            present.push("cmd");
        }
        if self.hit.is_some() {
            present.push("hit");
        }
        for (key, field) in [
            ("set", &self.set),
            ("prepend_path", &self.prepend_path),
            ("append_path", &self.append_path),
            ("prepend_flag", &self.prepend_flag),
            ("append_flag", &self.append_flag),
        ] {
            if field.is_some() {
                present.push(key);
            }
        }
        match present.len() {
            0 => return Err(SpecError::MissingAction),
            1 => {}
            _ => return Err(SpecError::MultipleActions(present[0], present[1])),
        }

        if self.to_var.is_some() && self.append_to_file.is_some() {
            return Err(SpecError::ConflictingRedirects);
        }

        let action = if let Some(children) = self.commands {
            if self.to_var.is_some() || self.append_to_file.is_some() || self.inputs.is_some() {
                return Err(SpecError::GroupWithLeafModifiers);
            }
            Action::Commands(
                children
                    .into_iter()
                    .map(RawNode::into_node)
                    .collect::<Result<_, _>>()?,
            )
        } else if let Some(args) = self.cmd {
            if args.is_empty() {
                return Err(SpecError::EmptyCommand("cmd"));
            }
            Action::Cmd(args)
        } else if let Some(args) = self.hit {
            if args.is_empty() {
                return Err(SpecError::EmptyCommand("hit"));
            }
            Action::Hit(args)
        } else {
            let (var, op) = if let Some(var) = self.set {
                (var, EnvOp::Set)
            } else if let Some(var) = self.prepend_path {
                (var, EnvOp::PrependPath)
            } else if let Some(var) = self.append_path {
                (var, EnvOp::AppendPath)
            } else if let Some(var) = self.prepend_flag {
                (var, EnvOp::PrependFlag)
            } else if let Some(var) = self.append_flag {
                (var, EnvOp::AppendFlag)
            } else {
                return Err(SpecError::MissingAction);
            };
            let value = self.value.ok_or(SpecError::MissingValue {
                action: op.key(),
            })?;
            Action::EnvMod { var, op, value }
        };

        let inputs = self
            .inputs
            .unwrap_or_default()
            .into_iter()
            .map(RawInput::into_input)
            .collect::<Result<_, _>>()?;

        Ok(CommandNode {
            action,
            cwd: self.cwd,
            inputs,
            to_var: self.to_var,
            append_to_file: self.append_to_file,
        })
    }
}

impl RawInput {
    fn into_input(self) -> Result<InputSpec, SpecError> {
        match (self.text, self.string, self.json) {
            (Some(lines), None, None) => Ok(InputSpec::Text(lines)),
            (None, Some(s), None) => Ok(InputSpec::Str(s)),
            (None, None, Some(v)) => Ok(InputSpec::Json(v)),
            _ => Err(SpecError::MalformedInput),
        }
    }
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
