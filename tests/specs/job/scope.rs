// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variable scoping across `commands` groups

use crate::prelude::Harness;
use serde_json::json;

#[tokio::test]
async fn nested_group_mutations_are_invisible_to_siblings() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"set": "A", "value": "1"},
            {"commands": [{"set": "A", "value": "2"}]},
            {"cmd": ["/bin/sh", "-c", "echo $A"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn inner_scope_sees_outer_variables() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"set": "A", "value": "outer"},
            {"commands": [
                {"cmd": ["/bin/echo", "$A"], "to_var": "SEEN"},
                {"cmd": ["/bin/echo", "$SEEN"], "to_var": "OUT"},
            ]},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("outer"));
}

#[tokio::test]
async fn to_var_from_inner_group_does_not_reach_outer_scope() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"commands": [
                {"cmd": ["/bin/echo", "inner"], "to_var": "CAPTURED"},
            ]},
            {"cmd": ["/bin/sh", "-c", "echo \\${CAPTURED:-gone}"], "to_var": "OUT"},
        ]}))
        .await;
    // `CAPTURED` escaped one level (to the inner group's scope) and died
    // with it. The escaped `\$` keeps the fallback expression away from
    // the job-spec substituter so the shell itself resolves it.
    assert_eq!(env.get("OUT").map(String::as_str), Some("gone"));
}

#[tokio::test]
async fn group_cwd_applies_to_children() {
    let mut h = Harness::new();
    std::fs::create_dir(h.cwd.path().join("nested")).unwrap();
    let env = h
        .run_to_env(json!({"commands": [
            {"cmd": ["/bin/sh", "-c", "pwd"], "to_var": "OUT"},
        ], "cwd": "nested"}))
        .await;
    let reported = std::path::PathBuf::from(env.get("OUT").unwrap());
    assert_eq!(
        reported.canonicalize().unwrap(),
        h.cwd.path().join("nested").canonicalize().unwrap()
    );
}

#[tokio::test]
async fn env_mutations_apply_in_node_order() {
    let mut h = Harness::new();
    let env = h
        .run_to_env(json!({"commands": [
            {"set": "V", "value": "base"},
            {"append_flag": "V", "value": "one"},
            {"append_flag": "V", "value": "two"},
            {"cmd": ["/bin/echo", "$V"], "to_var": "OUT"},
        ]}))
        .await;
    assert_eq!(env.get("OUT").map(String::as_str), Some("base one two"));
}
