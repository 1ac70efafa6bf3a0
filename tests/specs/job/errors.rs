// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure modes surfaced by `run_job`

use crate::prelude::Harness;
use hdist_engine::RunError;
use serde_json::json;

#[tokio::test]
async fn unresolved_variable_fails_the_job() {
    let mut h = Harness::new();
    let err = h
        .run(json!({"cmd": ["/bin/echo", "$NOPE"]}))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::UnknownVariable(_)));
}

#[tokio::test]
async fn double_dollar_fails_the_job() {
    let mut h = Harness::new();
    let err = h
        .run(json!({"cmd": ["/bin/echo", "$$"]}))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::UnknownVariable(_)));
}

#[tokio::test]
async fn virtual_import_without_mapping_fails() {
    let mut h = Harness::new();
    let err = h
        .run(json!({
            "import": [{"id": "virtual:unix", "ref": "U"}],
            "cmd": ["/bin/true"],
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::VirtualUnresolved(id) if id == "virtual:unix"));
}

#[tokio::test]
async fn unbuilt_dependency_fails() {
    let mut h = Harness::new();
    let err = h
        .run(json!({
            "import": [{"id": "zlib/never-built", "ref": "Z"}],
            "cmd": ["/bin/true"],
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::DependencyNotBuilt { .. }));
}

#[tokio::test]
async fn nonzero_exit_fails_with_code_and_args() {
    let mut h = Harness::new();
    let err = h
        .run(json!({"cmd": ["/bin/sh", "-c", "exit 4"]}))
        .await
        .unwrap_err();
    let RunError::CommandFailed { code, args } = err else {
        panic!("expected CommandFailed, got {err:?}");
    };
    assert_eq!(code, 4);
    assert_eq!(args[0], "/bin/sh");
}

#[tokio::test]
async fn failure_in_a_group_stops_later_siblings() {
    let mut h = Harness::new();
    let marker = h.cwd.path().join("should-not-exist");
    h.run(json!({"commands": [
        {"cmd": ["/bin/sh", "-c", "exit 1"]},
        {"cmd": ["/bin/touch", marker.display().to_string()]},
    ]}))
    .await
    .unwrap_err();
    assert!(!marker.exists());
}

#[tokio::test]
async fn missing_executable_is_distinguished_from_failure() {
    let mut h = Harness::new();
    let err = h
        .run(json!({"cmd": ["no-such-tool-anywhere"]}))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::ExecutableNotFound { .. }));
}

#[tokio::test]
async fn failing_hit_helper_fails_the_job() {
    let mut h = Harness::new();
    h.hit = hdist_engine::FakeHit::failing("no such subcommand");
    let err = h.run(json!({"hit": ["bogus"]})).await.unwrap_err();
    assert!(matches!(err, RunError::HitFailed(msg) if msg == "no such subcommand"));
}

#[tokio::test]
async fn provided_temp_dir_must_be_empty() {
    let mut h = Harness::new();
    let keep = tempfile::TempDir::new().unwrap();
    std::fs::write(keep.path().join("leftover"), b"x").unwrap();
    h.temp_dir = Some(keep.path().to_path_buf());
    let err = h.run(json!({"cmd": ["/bin/true"]})).await.unwrap_err();
    assert!(matches!(err, RunError::TempDirNotEmpty(_)));
}
