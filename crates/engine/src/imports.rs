// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Initial environment assembly from the job spec's `import` list.
//!
//! Each import is resolved through the artifact store (virtual ids go
//! through the caller-supplied mapping first) and contributes to the
//! aggregate variables `PATH`, `HDIST_CFLAGS`, `HDIST_LDFLAGS`,
//! `HDIST_IMPORT` and `HDIST_IMPORT_PATHS`, plus `<ref>`/`<ref>_ID` when a
//! ref name is given.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hdist_core::{Env, ImportEntry};

use crate::error::RunError;
use crate::store::ArtifactStore;

/// Unix path-list separator, also used by `prepend_path`/`append_path`.
pub(crate) const PATH_SEP: char = ':';

/// Build the environment implied by `imports`, in list order.
pub fn imports_env(
    store: &dyn ArtifactStore,
    virtuals: &BTreeMap<String, String>,
    imports: &[ImportEntry],
) -> Result<Env, RunError> {
    let mut env = Env::new();

    let mut path: Vec<String> = Vec::new();
    let mut cflags: Vec<String> = Vec::new();
    let mut ldflags: Vec<String> = Vec::new();
    let mut import_ids: Vec<String> = Vec::new();
    let mut import_paths: Vec<String> = Vec::new();

    for dep in imports {
        import_ids.push(dep.id.clone());

        // Resolutions of virtual imports are provided by the caller at the
        // time of the run; they never contribute to the spec hash.
        let dep_id = if dep.id.starts_with("virtual:") {
            virtuals
                .get(&dep.id)
                .ok_or_else(|| RunError::VirtualUnresolved(dep.id.clone()))?
                .clone()
        } else {
            dep.id.clone()
        };

        let dep_dir = store
            .resolve(&dep_id)
            .ok_or_else(|| RunError::DependencyNotBuilt {
                reference: dep.reference.clone().unwrap_or_default(),
                id: dep_id.clone(),
            })?;
        import_paths.push(dep_dir.display().to_string());

        if let Some(reference) = &dep.reference {
            env.insert(reference.clone(), dep_dir.display().to_string());
            env.insert(format!("{reference}_ID"), dep_id.clone());
        }

        if dep.in_env {
            let bin_dir = dep_dir.join("bin");
            if bin_dir.exists() {
                path.push(bin_dir.display().to_string());
            }

            let lib_dirs: Vec<PathBuf> = ["lib", "lib32", "lib64"]
                .iter()
                .map(|name| dep_dir.join(name))
                .filter(|dir| dir.exists())
                .collect();
            match lib_dirs.as_slice() {
                [] => {}
                [lib_dir] => {
                    ldflags.push(format!("-L{}", lib_dir.display()));
                    ldflags.push(format!("-Wl,-R,{}", lib_dir.display()));
                }
                _ => {
                    return Err(RunError::AmbiguousLibDir {
                        id: dep_id,
                        dirs: lib_dirs,
                    })
                }
            }

            let inc_dir = dep_dir.join("include");
            if inc_dir.exists() {
                cflags.push(format!("-I{}", inc_dir.display()));
            }
        }
    }

    env.insert("PATH".to_string(), join_with(&path, PATH_SEP));
    env.insert("HDIST_CFLAGS".to_string(), cflags.join(" "));
    env.insert("HDIST_LDFLAGS".to_string(), ldflags.join(" "));
    env.insert("HDIST_IMPORT".to_string(), import_ids.join(" "));
    env.insert("HDIST_IMPORT_PATHS".to_string(), import_paths.join(" "));
    Ok(env)
}

fn join_with(items: &[String], sep: char) -> String {
    items.join(&sep.to_string())
}

/// Encode the virtual→concrete mapping for `HDIST_VIRTUALS`: sorted
/// `key=value` pairs joined with `;`.
pub fn pack_virtuals(virtuals: &BTreeMap<String, String>) -> String {
    virtuals
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Inverse of [`pack_virtuals`]; pairs without a `=` are skipped.
pub fn unpack_virtuals(packed: &str) -> BTreeMap<String, String> {
    if packed.is_empty() {
        return BTreeMap::new();
    }
    packed
        .split(';')
        .filter_map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "imports_tests.rs"]
mod tests;
