// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help output specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("check")
        .stdout_has("teams")
        .stdout_has("--format");
}

#[test]
fn check_help_names_the_config_argument() {
    cli()
        .args(&["check", "--help"])
        .passes()
        .stdout_has("Office configuration file");
}

#[test]
fn missing_subcommand_fails() {
    cli().args(&[]).fails().stderr_has("Usage");
}

#[test]
fn unknown_format_fails() {
    cli()
        .args(&["--format", "yaml", "teams"])
        .fails()
        .stderr_has("yaml");
}
