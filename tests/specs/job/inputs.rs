// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline input materialization end to end

use crate::prelude::Harness;
use serde_json::json;

#[tokio::test]
async fn text_input_round_trips_through_cat() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({
            "cmd": ["/bin/cat", "$in0"],
            "inputs": [{"text": ["a", "b"]}],
            "to_var": "OUT",
        }))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("a\nb"));
}

#[tokio::test]
async fn script_input_is_runnable() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({
            "cmd": ["/bin/sh", "$in0"],
            "inputs": [{"text": [
                "msg=scripted",
                "echo $msg",
            ]}],
            "to_var": "OUT",
        }))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("scripted"));
}

#[tokio::test]
async fn json_input_is_pretty_printed_with_suffix() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({
            "cmd": ["/bin/cat", "$in0"],
            "inputs": [{"json": {"jobs": 4}}],
            "to_var": "OUT",
        }))
        .await;
    assert_eq!(
        env.get("OUT").map(String::as_str),
        Some("{\n    \"jobs\": 4\n}")
    );
    assert!(env.get("in0").unwrap().ends_with("_in0.json"));
}

#[tokio::test]
async fn multiple_inputs_bind_in_sequence() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({
            "cmd": ["/bin/cat", "$in0", "$in1"],
            "inputs": [{"string": "first"}, {"string": "second"}],
            "to_var": "OUT",
        }))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("firstsecond"));
}

#[tokio::test]
async fn input_files_land_in_the_job_temp_dir() {
    let mut h = Harness::new();
    let keep = tempfile::TempDir::new().unwrap();
    h.temp_dir = Some(keep.path().to_path_buf());
    let env = h
        .run_to_env(json!({
            "cmd": ["/bin/true"],
            "inputs": [{"string": "x"}],
        }))
        .await;
    let in0 = std::path::PathBuf::from(env.get("in0").unwrap());
    assert!(in0.starts_with(keep.path()));
    assert!(in0.exists());
}
