// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hit logpipe` round trips

use crate::prelude::Harness;
use hdist_core::Level;
use serde_json::json;

#[tokio::test]
async fn logpipe_round_trip_reaches_sub_logger_at_requested_level() {
    let mut h = Harness::new();
    h.run(json!({"commands": [
        {"hit": ["logpipe", "MYHEAD", "INFO"], "to_var": "FIFO"},
        {"cmd": ["/bin/sh", "-c", "echo hello > $FIFO"]},
    ]}))
    .await
    .unwrap();

    let record = h
        .sink
        .records()
        .into_iter()
        .find(|r| r.level == Level::Info && r.message == "hello")
        .expect("log pipe record should have been emitted");
    assert_eq!(record.name.as_deref(), Some("MYHEAD"));
}

#[tokio::test]
async fn logpipe_path_is_under_the_job_temp_dir() {
    let mut h = Harness::new();
    let keep = tempfile::TempDir::new().unwrap();
    h.temp_dir = Some(keep.path().to_path_buf());
    let env = h
        .run_to_env(json!({"hit": ["logpipe", "HEAD", "WARNING"], "to_var": "FIFO"}))
        .await;
    let fifo = std::path::PathBuf::from(env.get("FIFO").unwrap());
    assert!(fifo.starts_with(keep.path()));
    assert!(fifo.ends_with("logpipe-HEAD-WARNING"));
}

#[tokio::test]
async fn one_pipe_serves_several_commands() {
    let mut h = Harness::new();
    h.run(json!({"commands": [
        {"hit": ["logpipe", "SHARED", "INFO"], "to_var": "FIFO"},
        {"cmd": ["/bin/sh", "-c", "echo first > $FIFO"]},
        {"cmd": ["/bin/sh", "-c", "echo second > $FIFO"]},
    ]}))
    .await
    .unwrap();
    let messages: Vec<String> = h
        .sink
        .records()
        .into_iter()
        .filter(|r| r.level == Level::Info && r.name.as_deref() == Some("SHARED"))
        .map(|r| r.message)
        .collect();
    assert_eq!(messages, vec!["first", "second"]);
}

#[tokio::test]
async fn multiple_writes_within_one_child_are_framed() {
    let mut h = Harness::new();
    h.run(json!({"commands": [
        {"hit": ["logpipe", "FRAMES", "INFO"], "to_var": "FIFO"},
        {"cmd": ["/bin/sh", "-c", "{ echo a; echo b; } > $FIFO"]},
    ]}))
    .await
    .unwrap();
    let messages: Vec<String> = h
        .sink
        .records()
        .into_iter()
        .filter(|r| r.name.as_deref() == Some("FRAMES"))
        .map(|r| r.message)
        .collect();
    assert_eq!(messages, vec!["a", "b"]);
}
