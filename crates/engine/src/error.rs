// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for building and running an office

use floor_core::{ConstructionIssue, InvokeError, ResourceError, TeamError};
use thiserror::Error;

/// Construction issues found while building an office
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("office has {} construction issue(s): {}", .0.len(), summary(.0))]
pub struct BuildError(pub Vec<ConstructionIssue>);

impl BuildError {
    pub fn issues(&self) -> &[ConstructionIssue] {
        &self.0
    }
}

fn summary(issues: &[ConstructionIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur opening or closing an office floor
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("office floor is already open")]
    AlreadyOpen,
    #[error("office floor has been closed and cannot be reopened")]
    Closed,
    #[error("resource source {resource} failed to start: {source}")]
    ResourceSource {
        resource: String,
        source: ResourceError,
    },
    #[error("team {team} failed to start: {source}")]
    Team { team: String, source: TeamError },
    #[error("failed to spawn timeout monitor: {0}")]
    Monitor(std::io::Error),
    #[error("startup function {function} could not be invoked: {source}")]
    Startup {
        function: String,
        source: InvokeError,
    },
}
