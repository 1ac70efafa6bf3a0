// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive interpreter for the command tree.
//!
//! The executor owns everything with job-run lifetime: the scratch dir, the
//! log-FIFO registry, and the snapshot of the innermost executed leaf.
//! Environments are *not* held here — they are passed down the recursion and
//! cloned at every scope boundary, so mutations inside a `commands` group
//! never leak out. The one documented exception is `to_var`, which writes
//! its captured stdout into the enclosing scope so later siblings can read
//! the result.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_recursion::async_recursion;
use hdist_core::{substitute, Action, CommandNode, Env, EnvOp, Level, Logger};

use crate::error::RunError;
use crate::hit::{run_hit, HitInvoker};
use crate::inputs::materialize_inputs;
use crate::logmux::StdoutSink;
use crate::runner::{run_process, FifoRegistry};

enum TempDirHandle {
    /// Created by the executor; removed on drop.
    Owned(tempfile::TempDir),
    /// Supplied by the caller; must start empty and is left intact.
    Borrowed(PathBuf),
}

impl TempDirHandle {
    fn path(&self) -> &Path {
        match self {
            TempDirHandle::Owned(dir) => dir.path(),
            TempDirHandle::Borrowed(path) => path,
        }
    }
}

#[derive(Clone, Copy)]
enum LeafKind {
    Cmd,
    Hit,
}

/// State for one job run.
pub struct Executor<'a> {
    logger: &'a mut Logger,
    hit: &'a dyn HitInvoker,
    temp_dir: TempDirHandle,
    /// Canonicalized temp dir, for redirection containment checks.
    temp_dir_real: PathBuf,
    /// `(heading, level)` to FIFO path, accumulated across the job.
    log_fifos: FifoRegistry,
    last_env: Option<Env>,
    last_cwd: Option<PathBuf>,
}

impl std::fmt::Debug for Executor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("temp_dir_real", &self.temp_dir_real)
            .field("log_fifos", &self.log_fifos)
            .field("last_env", &self.last_env)
            .field("last_cwd", &self.last_cwd)
            .finish_non_exhaustive()
    }
}

impl<'a> Executor<'a> {
    /// Create an executor. Without `temp_dir` a scratch dir is created and
    /// removed on teardown; a provided dir must be empty and is kept.
    pub fn new(
        logger: &'a mut Logger,
        hit: &'a dyn HitInvoker,
        temp_dir: Option<PathBuf>,
    ) -> Result<Self, RunError> {
        let temp_dir = match temp_dir {
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("hdist-run-job-")
                    .tempdir()?;
                tracing::debug!(path = %dir.path().display(), "created job temp dir");
                TempDirHandle::Owned(dir)
            }
            Some(dir) => {
                if std::fs::read_dir(&dir)?.next().is_some() {
                    return Err(RunError::TempDirNotEmpty(dir));
                }
                TempDirHandle::Borrowed(dir)
            }
        };
        let temp_dir_real = temp_dir.path().canonicalize()?;
        Ok(Self {
            logger,
            hit,
            temp_dir,
            temp_dir_real,
            log_fifos: FifoRegistry::new(),
            last_env: None,
            last_cwd: None,
        })
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Environment of the innermost executed leaf, if any leaf ran.
    pub fn last_env(&self) -> Option<&Env> {
        self.last_env.as_ref()
    }

    pub fn last_cwd(&self) -> Option<&Path> {
        self.last_cwd.as_deref()
    }

    pub fn into_last_env(self) -> Option<Env> {
        self.last_env
    }

    /// Execute one node. `env` is the current scope; `node_pos` is the
    /// integer path from the root, used to name per-node temp files.
    #[async_recursion]
    pub async fn run_node(
        &mut self,
        node: &CommandNode,
        env: &mut Env,
        cwd: &Path,
        node_pos: &[usize],
    ) -> Result<(), RunError> {
        match &node.action {
            Action::EnvMod { var, op, value } => self.apply_env_mod(var, *op, value, env),
            Action::Commands(children) => {
                let node_cwd = self.node_cwd(node, cwd, env)?;
                let mut sub_env = env.clone();
                for (i, child) in children.iter().enumerate() {
                    let mut pos = node_pos.to_vec();
                    pos.push(i);
                    self.run_node(child, &mut sub_env, &node_cwd, &pos).await?;
                }
                Ok(())
            }
            Action::Cmd(args) => {
                self.run_leaf(node, LeafKind::Cmd, args, env, cwd, node_pos)
                    .await
            }
            Action::Hit(args) => {
                self.run_leaf(node, LeafKind::Hit, args, env, cwd, node_pos)
                    .await
            }
        }
    }

    fn apply_env_mod(
        &mut self,
        var: &str,
        op: EnvOp,
        value: &str,
        env: &mut Env,
    ) -> Result<(), RunError> {
        let value = self.subst(value, env)?;
        let existing = env.get(var).filter(|v| !v.is_empty());
        let new_value = match (op.separator(), existing) {
            (None, _) | (_, None) => value,
            (Some(sep), Some(existing)) => {
                if op.prepends() {
                    format!("{value}{sep}{existing}")
                } else {
                    format!("{existing}{sep}{value}")
                }
            }
        };
        env.insert(var.to_string(), new_value);
        Ok(())
    }

    async fn run_leaf(
        &mut self,
        node: &CommandNode,
        kind: LeafKind,
        args: &[String],
        env: &mut Env,
        cwd: &Path,
        node_pos: &[usize],
    ) -> Result<(), RunError> {
        let node_cwd = self.node_cwd(node, cwd, env)?;
        let mut node_env = env.clone();
        node_env.extend(materialize_inputs(self.temp_dir(), node_pos, &node.inputs)?);
        let args = args
            .iter()
            .map(|a| self.subst(a, &node_env))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(var) = &node.to_var {
            let mut captured = Vec::new();
            self.dispatch(
                kind,
                &args,
                &node_env,
                &node_cwd,
                &mut StdoutSink::Capture(&mut captured),
            )
            .await?;
            let value = String::from_utf8_lossy(&captured).trim().to_string();
            // Written to the enclosing scope so later siblings can read it;
            // the leaf snapshot carries it too.
            env.insert(var.clone(), value.clone());
            node_env.insert(var.clone(), value);
        } else if let Some(path) = &node.append_to_file {
            let mut file = self.open_append_target(path, &node_cwd, &node_env)?;
            self.dispatch(
                kind,
                &args,
                &node_env,
                &node_cwd,
                &mut StdoutSink::File(&mut file),
            )
            .await?;
        } else {
            self.dispatch(kind, &args, &node_env, &node_cwd, &mut StdoutSink::Logger)
                .await?;
        }

        self.last_env = Some(node_env);
        self.last_cwd = Some(node_cwd);
        Ok(())
    }

    async fn dispatch(
        &mut self,
        kind: LeafKind,
        args: &[String],
        env: &Env,
        cwd: &Path,
        sink: &mut StdoutSink<'_>,
    ) -> Result<(), RunError> {
        match kind {
            LeafKind::Cmd => {
                run_process(self.logger, args, env, cwd, sink, &self.log_fifos).await
            }
            LeafKind::Hit => {
                // `logpipe` talks to the runner itself, not the hit helper.
                if args.first().map(String::as_str) == Some("logpipe") {
                    let [_, heading, level] = args else {
                        return Err(RunError::LogPipeUsage);
                    };
                    self.create_log_pipe(heading, level, sink)
                } else {
                    let hit = self.hit;
                    match sink {
                        StdoutSink::Logger => {
                            let mut stdout = std::io::stdout();
                            run_hit(hit, args, env, cwd, self.logger, &mut stdout)
                        }
                        StdoutSink::Capture(buf) => {
                            run_hit(hit, args, env, cwd, self.logger, &mut **buf)
                        }
                        StdoutSink::File(file) => {
                            run_hit(hit, args, env, cwd, self.logger, &mut **file)
                        }
                    }
                }
            }
        }
    }

    /// Create (once per `(heading, level)`) a FIFO under the temp dir and
    /// print its path to the current stdout sink.
    fn create_log_pipe(
        &mut self,
        heading: &str,
        level_str: &str,
        sink: &mut StdoutSink<'_>,
    ) -> Result<(), RunError> {
        let level: Level = level_str.parse()?;
        let key = (heading.to_string(), level);
        let path = match self.log_fifos.get(&key) {
            Some(path) => path.clone(),
            None => {
                let path = self
                    .temp_dir()
                    .join(format!("logpipe-{heading}-{level_str}"));
                nix::unistd::mkfifo(
                    &path,
                    nix::sys::stat::Mode::S_IRUSR | nix::sys::stat::Mode::S_IWUSR,
                )
                .map_err(std::io::Error::from)?;
                tracing::debug!(path = %path.display(), "created log pipe");
                self.log_fifos.insert(key, path.clone());
                path
            }
        };
        let bytes = path.display().to_string();
        match sink {
            StdoutSink::Logger => std::io::stdout().write_all(bytes.as_bytes())?,
            StdoutSink::Capture(buf) => buf.extend_from_slice(bytes.as_bytes()),
            StdoutSink::File(file) => file.write_all(bytes.as_bytes())?,
        }
        Ok(())
    }

    fn node_cwd(&self, node: &CommandNode, cwd: &Path, env: &Env) -> Result<PathBuf, RunError> {
        match &node.cwd {
            Some(rel) => Ok(cwd.join(self.subst(rel, env)?)),
            None => Ok(cwd.to_path_buf()),
        }
    }

    fn open_append_target(
        &self,
        path: &str,
        node_cwd: &Path,
        env: &Env,
    ) -> Result<std::fs::File, RunError> {
        let path = self.subst(path, env)?;
        let mut target = PathBuf::from(&path);
        if target.is_relative() {
            target = node_cwd.join(target);
        }
        let resolved = resolve_existing_prefix(&target)?;
        if resolved.starts_with(&self.temp_dir_real) {
            return Err(RunError::RedirectionIntoTempDir(resolved));
        }
        Ok(std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&resolved)?)
    }

    fn subst(&self, text: &str, env: &Env) -> Result<String, RunError> {
        substitute(text, env).map_err(|e| {
            self.logger.error(&e.to_string());
            RunError::from(e)
        })
    }
}

/// `realpath` for a file that may not exist yet: canonicalize what exists,
/// keep the final component as spelled.
fn resolve_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    if let Ok(real) = path.canonicalize() {
        return Ok(real);
    }
    let parent = path.parent().unwrap_or_else(|| Path::new("/"));
    let real_parent = parent.canonicalize()?;
    Ok(match path.file_name() {
        Some(name) => real_parent.join(name),
        None => real_parent,
    })
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
