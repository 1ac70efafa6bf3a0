// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment mutator semantics

use crate::prelude::Harness;
use serde_json::json;

#[tokio::test]
async fn prepend_path_ordering() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"prepend_path": "FOO", "value": "a"},
            {"prepend_path": "FOO", "value": "b"},
            {"cmd": ["/bin/echo", "$FOO"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("b:a"));
}

#[tokio::test]
async fn first_prepend_on_absent_var_sets_plain_value() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"prepend_path": "FOO", "value": "a"},
            {"cmd": ["/bin/echo", "$FOO"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("a"));
}

#[tokio::test]
async fn set_overwrites_existing_value() {
    let mut h = Harness::new();
    h.overrides.insert("MODE".to_string(), "debug".to_string());
    let env = h
        .run_to_env(json!({"commands": [
            {"set": "MODE", "value": "release"},
            {"cmd": ["/bin/echo", "$MODE"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("release"));
}

#[tokio::test]
async fn mutator_values_are_substituted() {
    let mut h = Harness::new();
    h.overrides
        .insert("ARTIFACT".to_string(), "/store/abc".to_string());
    let env = h
        .run_to_env(json!({"commands": [
            {"prepend_path": "FOOPATH", "value": "$ARTIFACT/bin"},
            {"cmd": ["/bin/echo", "$FOOPATH"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("/store/abc/bin"));
}

#[tokio::test]
async fn flags_join_with_a_space() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"append_flag": "CFLAGS", "value": "-O2"},
            {"append_flag": "CFLAGS", "value": "-g"},
            {"cmd": ["/bin/echo", "$CFLAGS"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("-O2 -g"));
}
