// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Construction issues found while assembling an office

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateName,
    UnknownReference,
    DependencyCycle,
    ScopeViolation,
    SlotMismatch,
    MissingExtension,
    MissingProperty,
    TeamSource,
    InvalidConfiguration,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::DuplicateName => "duplicate name",
            IssueKind::UnknownReference => "unknown reference",
            IssueKind::DependencyCycle => "dependency cycle",
            IssueKind::ScopeViolation => "scope violation",
            IssueKind::SlotMismatch => "slot mismatch",
            IssueKind::MissingExtension => "missing extension",
            IssueKind::MissingProperty => "missing property",
            IssueKind::TeamSource => "team source",
            IssueKind::InvalidConfiguration => "invalid configuration",
        }
    }
}

/// A configuration defect that prevents an office from opening
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructionIssue {
    pub kind: IssueKind,
    /// Name of the function, resource, team, or governance at fault
    pub subject: String,
    pub message: String,
}

impl ConstructionIssue {
    pub fn new(kind: IssueKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstructionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.subject, self.kind.as_str(), self.message)
    }
}
