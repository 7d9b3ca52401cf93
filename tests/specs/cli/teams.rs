// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `floor teams` specs

use crate::prelude::*;

#[test]
fn teams_lists_builtin_sources_in_order() {
    let run = cli().args(&["teams"]).passes();
    let names: Vec<&str> = run
        .stdout()
        .lines()
        .filter(|line| !line.starts_with(' '))
        .collect();
    assert_eq!(names, vec!["one-person", "passive", "tokio-blocking", "worker-pool"]);
}

#[test]
fn teams_shows_property_defaults() {
    cli()
        .args(&["teams"])
        .passes()
        .stdout_has("size")
        .stdout_has("(default 4)")
        .stdout_has("thread_local_aware");
}

#[test]
fn teams_json_is_an_array_of_sources() {
    let run = cli().args(&["--format", "json", "teams"]).passes();
    let sources: serde_json::Value = serde_json::from_str(run.stdout()).unwrap();
    let sources = sources.as_array().unwrap();
    assert_eq!(sources.len(), 4);

    let pool = sources
        .iter()
        .find(|s| s["name"] == "worker-pool")
        .unwrap();
    let size = pool["properties"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "size")
        .unwrap();
    assert!(size["default"].is_string());
}
