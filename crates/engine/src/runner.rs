// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process launching.
//!
//! Children run with exactly the environment the job built (nothing is
//! inherited from the caller), piped stdin/stdout/stderr, and the working
//! directory of the node. Output is handed to the log multiplexer together
//! with every log FIFO registered so far.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use hdist_core::{Env, Level, Logger};
use tokio::process::Command;

use crate::error::RunError;
use crate::logmux::{LogMux, StdoutSink};

/// Registered log FIFOs: `(heading, level)` to FIFO path.
pub(crate) type FifoRegistry = BTreeMap<(String, Level), PathBuf>;

/// Spawn `args` and multiplex its output until it exits.
///
/// A non-logger `sink` receives stdout bytes verbatim; stderr and FIFO
/// traffic still go through the logger. Nonzero exit is fatal.
pub(crate) async fn run_process(
    logger: &Logger,
    args: &[String],
    env: &Env,
    cwd: &Path,
    sink: &mut StdoutSink<'_>,
    fifos: &FifoRegistry,
) -> Result<(), RunError> {
    logger.debug(&format!("running {args:?}"));
    logger.debug(&format!("cwd: {}", cwd.display()));
    logger.debug("environment:");
    for (key, value) in env {
        logger.debug(&format!("  {key}={value}"));
    }

    let mut command = Command::new(&args[0]);
    command
        .args(&args[1..])
        .env_clear()
        .envs(env)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| spawn_error(e, args, cwd, logger))?;
    // Held open for the child's lifetime, dropped on return.
    let stdin = child.stdin.take();
    let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
    let stderr = child.stderr.take().ok_or_else(missing_pipe)?;

    let mut mux = LogMux::new();
    mux.register_child(logger, stdout, stderr);
    for ((heading, level), path) in fifos {
        mux.register_fifo(logger.sub_logger(heading), *level, path)?;
    }

    let status = mux.drive(&mut child, sink).await?;
    drop(stdin);

    if !status.success() {
        let code = status
            .code()
            .or_else(|| status.signal().map(|sig| -sig))
            .unwrap_or(-1);
        let err = RunError::CommandFailed {
            code,
            args: args.to_vec(),
        };
        logger.error(&err.to_string());
        return Err(err);
    }
    Ok(())
}

fn missing_pipe() -> RunError {
    RunError::Io(std::io::Error::other("child spawned without stdio pipes"))
}

fn spawn_error(e: std::io::Error, args: &[String], cwd: &Path, logger: &Logger) -> RunError {
    if e.kind() == ErrorKind::NotFound {
        // Fix the message up a bit since the situation is so confusing.
        let message = if args[0].contains('/') {
            format!("command {:?} not found (cwd: {})", args[0], cwd.display())
        } else {
            format!(
                "command {:?} not found in $PATH (cwd: {})",
                args[0],
                cwd.display()
            )
        };
        logger.error(&message);
        RunError::ExecutableNotFound { message }
    } else {
        RunError::Io(e)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
