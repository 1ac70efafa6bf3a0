// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level job driver.
//!
//! Canonicalizes the spec, layers the initial environment (imports, then
//! `nohash_params`, then caller overrides, then the `HDIST_VIRTUALS` /
//! `HDIST_CONFIG` bookkeeping variables), runs the root node, and tears the
//! executor down on every exit path. The ambient OS environment is never
//! inherited.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hdist_core::{Env, JobSpec, Logger};
use serde_json::Value;

use crate::error::RunError;
use crate::executor::Executor;
use crate::hit::HitInvoker;
use crate::imports::{imports_env, pack_virtuals};
use crate::store::ArtifactStore;

/// Run a job in a controlled environment.
///
/// * `override_env` is added last and overwrites spec-derived variables.
/// * `virtuals` maps virtual artifact ids to concrete ones; it is passed
///   out-of-band so it never contributes to the spec hash.
/// * `config` is serialized compactly into `HDIST_CONFIG` for use by the
///   `hit` helper.
/// * `temp_dir`, when given, must be an empty directory and is left intact
///   (files included) after the run; otherwise a scratch dir is created and
///   removed on teardown.
///
/// Returns the environment of the innermost executed leaf, or `None` when
/// the spec contains no `cmd`/`hit` leaves.
#[allow(clippy::too_many_arguments)]
pub async fn run_job(
    logger: &mut Logger,
    store: &dyn ArtifactStore,
    hit: &dyn HitInvoker,
    job_spec: &Value,
    override_env: &Env,
    virtuals: &BTreeMap<String, String>,
    cwd: &Path,
    config: &Value,
    temp_dir: Option<PathBuf>,
) -> Result<Option<Env>, RunError> {
    let spec = JobSpec::from_value(job_spec)?;

    let mut env = imports_env(store, virtuals, &spec.imports)?;
    env.extend(spec.nohash_params.clone());
    env.extend(override_env.clone());
    env.insert("HDIST_VIRTUALS".to_string(), pack_virtuals(virtuals));
    env.insert("HDIST_CONFIG".to_string(), config.to_string());

    let mut executor = Executor::new(logger, hit, temp_dir)?;
    executor.run_node(&spec.root, &mut env, cwd, &[]).await?;
    Ok(executor.into_last_env())
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
