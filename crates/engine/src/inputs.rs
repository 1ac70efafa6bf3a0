// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline input materialization.
//!
//! A leaf's `inputs` entries are dumped to files under the job temp dir and
//! bound as `$in0`, `$in1`, … in the node's environment. File names embed
//! the node position so nodes never collide.

use std::path::Path;

use hdist_core::{Env, InputSpec};
use serde::Serialize;
use serde_json::Value;

use crate::error::RunError;

/// Write each input document to a temp file and return the `in<i>` bindings.
pub(crate) fn materialize_inputs(
    temp_dir: &Path,
    node_pos: &[usize],
    inputs: &[InputSpec],
) -> Result<Env, RunError> {
    let mut env = Env::new();
    let stem: String = node_pos
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("_");
    for (i, input) in inputs.iter().enumerate() {
        let name = format!("in{i}");
        let mut filename = temp_dir.join(format!("{stem}_{name}"));
        let contents = match input {
            InputSpec::Text(lines) => lines.join("\n"),
            InputSpec::Str(s) => s.clone(),
            InputSpec::Json(value) => {
                filename.set_extension("json");
                to_json_indent4(value)?
            }
        };
        std::fs::write(&filename, contents)?;
        env.insert(name, filename.display().to_string());
    }
    Ok(env)
}

/// Pretty-print with a 4-space indent (the job-spec convention).
fn to_json_indent4(value: &Value) -> Result<String, RunError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
#[path = "inputs_tests.rs"]
mod tests;
