// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `floor check` specs

use crate::prelude::*;

#[test]
fn valid_office_passes() {
    let temp = Project::empty();
    temp.file("office.toml", FULL_OFFICE);

    temp.floor()
        .args(&["check", "office.toml"])
        .passes()
        .stdout_eq("office.toml: ok (3 team(s), 1 startup function(s))\n");
}

#[test]
fn empty_office_passes() {
    let temp = Project::empty();
    temp.file("office.toml", "");

    temp.floor()
        .args(&["check", "office.toml"])
        .passes()
        .stdout_has("ok (0 team(s), 0 startup function(s))");
}

#[test]
fn valid_office_as_json_is_an_empty_issue_list() {
    let temp = Project::empty();
    temp.file("office.toml", FULL_OFFICE);

    temp.floor()
        .args(&["--format", "json", "check", "office.toml"])
        .passes()
        .stdout_eq("[]\n");
}

#[test]
fn missing_file_fails() {
    let temp = Project::empty();

    temp.floor()
        .args(&["check", "absent.toml"])
        .fails()
        .stderr_has("invalid configuration absent.toml")
        .stderr_has("failed to read");
}

#[test]
fn malformed_toml_fails() {
    let temp = Project::empty();
    temp.file("office.toml", "[team.workers\nsource = ");

    temp.floor()
        .args(&["check", "office.toml"])
        .fails()
        .stderr_has("TOML parse error");
}

#[test]
fn unknown_setting_fails() {
    let temp = Project::empty();
    temp.file("office.toml", "monitor_intervall = \"1s\"\n");

    temp.floor()
        .args(&["check", "office.toml"])
        .fails()
        .stderr_has("monitor_intervall");
}

#[test]
fn default_team_must_be_configured() {
    let temp = Project::empty();
    temp.file("office.toml", "default_team = \"ghosts\"\n");

    temp.floor()
        .args(&["check", "office.toml"])
        .fails()
        .stderr_has("default_team ghosts is not a configured team");
}

#[test]
fn team_without_source_fails() {
    let temp = Project::empty();
    temp.file("office.toml", "[team.workers]\nsize = 2\n");

    temp.floor()
        .args(&["check", "office.toml"])
        .fails()
        .stderr_has("team.workers.source");
}

#[test]
fn unbuildable_teams_are_listed() {
    let temp = Project::empty();
    temp.file(
        "office.toml",
        r#"
[team.birds]
source = "carrier-pigeon"

[team.workers]
source = "worker-pool"
size = 0

[team.io]
source = "one-person"
"#,
    );

    temp.floor()
        .args(&["check", "office.toml"])
        .fails()
        .stdout_has("birds (team source): team birds: unknown team source carrier-pigeon")
        .stdout_has("workers (team source)")
        .stdout_lacks("io (")
        .stderr_has("2 construction issue(s) in office.toml");
}

#[test]
fn unbuildable_teams_as_json() {
    let temp = Project::empty();
    temp.file("office.toml", "[team.birds]\nsource = \"carrier-pigeon\"\n");

    let run = temp
        .floor()
        .args(&["--format", "json", "check", "office.toml"])
        .fails();
    let issues: serde_json::Value = serde_json::from_str(run.stdout()).unwrap();
    assert_eq!(issues[0]["kind"], "team_source");
    assert_eq!(issues[0]["subject"], "birds");
}
