// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact store interface.
//!
//! The engine only needs to turn artifact ids into directories; everything
//! else about artifact storage belongs to the surrounding build system.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolves artifact ids to their unpacked directories.
pub trait ArtifactStore: Send + Sync {
    /// The directory holding the artifact, or `None` if it is not built.
    fn resolve(&self, artifact_id: &str) -> Option<PathBuf>;
}

/// Store backed by a directory of unpacked artifacts at `<root>/<id>`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for DirStore {
    fn resolve(&self, artifact_id: &str) -> Option<PathBuf> {
        let dir = self.root.join(artifact_id);
        dir.is_dir().then_some(dir)
    }
}

/// In-memory store for tests.
#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    artifacts: BTreeMap<String, PathBuf>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact directory under the given id.
    pub fn insert(&mut self, artifact_id: impl Into<String>, path: impl Into<PathBuf>) {
        self.artifacts.insert(artifact_id.into(), path.into());
    }
}

impl ArtifactStore for FakeStore {
    fn resolve(&self, artifact_id: &str) -> Option<PathBuf> {
        self.artifacts.get(artifact_id).cloned()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
