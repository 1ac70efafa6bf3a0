// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the job engine

use std::path::PathBuf;

use hdist_core::{ParseLevelError, SpecError, SubstError};
use thiserror::Error;

/// Errors that can occur while running a job.
///
/// None of these are recovered locally; they all propagate out of
/// [`run_job`](crate::run_job) after teardown.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    InvalidJobSpec(#[from] SpecError),
    #[error(transparent)]
    UnknownVariable(#[from] SubstError),
    #[error("job spec contains a virtual dependency {0:?} that was not provided")]
    VirtualUnresolved(String),
    #[error("dependency {reference:?} = {id:?} not already built, please build it first")]
    DependencyNotBuilt { reference: String, id: String },
    #[error("artifact {id} has more than one library dir ({dirs:?})")]
    AmbiguousLibDir { id: String, dirs: Vec<PathBuf> },
    #[error(
        "cannot redirect output into the job temp dir (writing to a log pipe \
         from a sub-process is OK): {0}"
    )]
    RedirectionIntoTempDir(PathBuf),
    #[error("{message}")]
    ExecutableNotFound { message: String },
    #[error("command failed (code={code}): {args:?}")]
    CommandFailed { code: i32, args: Vec<String> },
    #[error("hit command failed: {0}")]
    HitFailed(String),
    #[error("wrong number of arguments to \"hit logpipe\"")]
    LogPipeUsage,
    #[error(transparent)]
    InvalidLogLevel(#[from] ParseLevelError),
    #[error("temp dir must be an empty directory: {0}")]
    TempDirNotEmpty(PathBuf),
    #[error("failed to serialize input document: {0}")]
    InputSerialize(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
