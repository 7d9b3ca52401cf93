// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for CLI specs

#![allow(dead_code)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// An office config with one team of each built-in kind
pub const FULL_OFFICE: &str = r#"
monitor_interval = "50ms"
default_resource_timeout = "5s"
default_team = "workers"
startup = ["warm_cache"]

[team.workers]
source = "worker-pool"
size = 2

[team.io]
source = "one-person"

[team.slow]
source = "tokio-blocking"
"#;

/// Scratch directory holding config files for one spec
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn floor(&self) -> CliBuilder {
        CliBuilder::new(self.dir.path())
    }
}

/// Run the binary outside any project
pub fn cli() -> CliBuilder {
    CliBuilder::new(&std::env::temp_dir())
}

pub struct CliBuilder {
    cmd: Command,
}

impl CliBuilder {
    fn new(dir: &Path) -> Self {
        let mut cmd = Command::cargo_bin("floor").unwrap();
        cmd.current_dir(dir).env_remove("RUST_LOG");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert::from(output);
        assert!(
            run.success,
            "expected success\nstdout:\n{}\nstderr:\n{}",
            run.stdout, run.stderr
        );
        run
    }

    pub fn fails(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        let run = RunAssert::from(output);
        assert!(
            !run.success,
            "expected failure\nstdout:\n{}\nstderr:\n{}",
            run.stdout, run.stderr
        );
        run
    }
}

pub struct RunAssert {
    success: bool,
    stdout: String,
    stderr: String,
}

impl From<std::process::Output> for RunAssert {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl RunAssert {
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        assert!(
            predicate::str::contains(expected).eval(&self.stdout),
            "stdout missing {expected:?}\nstdout:\n{}",
            self.stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        assert!(
            predicate::str::contains(unexpected).not().eval(&self.stdout),
            "stdout unexpectedly has {unexpected:?}\nstdout:\n{}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        assert!(
            predicate::str::contains(expected).eval(&self.stderr),
            "stderr missing {expected:?}\nstderr:\n{}",
            self.stderr
        );
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout, expected);
        self
    }
}
