// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process `hit` helper dispatch.
//!
//! `hit` nodes run the helper tool inside the runner's own process instead
//! of spawning a child. The helper is a consumed interface: the engine only
//! knows how to hand it argv (with the literal `hit` prepended), the node's
//! environment and working directory, the job logger, and a stdout handle —
//! which is the capture buffer when the node uses `to_var`.

use std::io::Write;
use std::path::Path;

use hdist_core::{Env, Level, Logger};
use parking_lot::Mutex;

use crate::error::RunError;

/// The in-process `hit` helper.
pub trait HitInvoker: Send + Sync {
    /// Run one `hit` invocation. `argv[0]` is the literal `"hit"`.
    fn invoke(
        &self,
        argv: &[String],
        env: &Env,
        cwd: &Path,
        logger: &Logger,
        stdout: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Run the helper with the logger quieted to WARNING unless the job is
/// already logging at DEBUG; the threshold is restored on every exit path.
pub(crate) fn run_hit(
    invoker: &dyn HitInvoker,
    args: &[String],
    env: &Env,
    cwd: &Path,
    logger: &mut Logger,
    stdout: &mut dyn Write,
) -> Result<(), RunError> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("hit".to_string());
    argv.extend_from_slice(args);
    logger.debug(&format!("running {argv:?}"));

    let saved_level = logger.level;
    if logger.level > Level::Debug {
        logger.level = Level::Warning;
    }
    let result = invoker.invoke(&argv, env, cwd, logger, stdout);
    logger.level = saved_level;

    if let Err(message) = result {
        logger.error("hit command failed");
        return Err(RunError::HitFailed(message));
    }
    Ok(())
}

/// Recording fake for tests.
///
/// Records every invocation and optionally writes canned output to the
/// provided stdout handle or fails.
#[derive(Default)]
pub struct FakeHit {
    calls: Mutex<Vec<RecordedCall>>,
    output: Option<String>,
    failure: Option<String>,
}

/// One recorded [`FakeHit`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub argv: Vec<String>,
    pub cwd: std::path::PathBuf,
    pub logger_level: Level,
}

impl FakeHit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `output` to stdout on every invocation.
    pub fn with_output(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Self::default()
        }
    }

    /// Fail every invocation with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Invocations seen so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

impl HitInvoker for FakeHit {
    fn invoke(
        &self,
        argv: &[String],
        _env: &Env,
        cwd: &Path,
        logger: &Logger,
        stdout: &mut dyn Write,
    ) -> Result<(), String> {
        self.calls.lock().push(RecordedCall {
            argv: argv.to_vec(),
            cwd: cwd.to_path_buf(),
            logger_level: logger.level,
        });
        if let Some(output) = &self.output {
            stdout
                .write_all(output.as_bytes())
                .map_err(|e| e.to_string())?;
        }
        match &self.failure {
            Some(message) => Err(message.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "hit_tests.rs"]
mod tests;
