// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Governance contracts and the activation state machine
//!
//! A governance episode begins with `activate` and ends with exactly one of
//! `enforce` or `disregard`. The transition function is pure; the engine
//! decides what to schedule from its result.

use crate::escalation::Escalation;
use crate::resource::Object;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of one governance container within a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GovernanceStatus {
    #[default]
    Inactive,
    Active,
    Enforced,
    Disregarded,
}

/// Operation requested against a governance container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GovernanceAction {
    Activate,
    Enforce,
    Disregard,
}

impl GovernanceAction {
    pub fn as_str(self) -> &'static str {
        match self {
            GovernanceAction::Activate => "activate",
            GovernanceAction::Enforce => "enforce",
            GovernanceAction::Disregard => "disregard",
        }
    }
}

/// What to do with governance still active when its thread completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernanceDeactivation {
    #[default]
    Enforce,
    Disregard,
}

impl GovernanceDeactivation {
    pub fn action(self) -> GovernanceAction {
        match self {
            GovernanceDeactivation::Enforce => GovernanceAction::Enforce,
            GovernanceDeactivation::Disregard => GovernanceAction::Disregard,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("governance {governance} cannot {action} before it is activated")]
    NotActive {
        governance: String,
        action: &'static str,
    },
    #[error("governance {governance} was already enforced")]
    AlreadyEnforced { governance: String },
    #[error("governance {governance} was already disregarded")]
    AlreadyDisregarded { governance: String },
    #[error("no governance at index {index}")]
    UnknownIndex { index: usize },
}

impl GovernanceError {
    pub fn kind(&self) -> &'static str {
        match self {
            GovernanceError::NotActive { .. } => "governance.inactive",
            GovernanceError::AlreadyEnforced { .. } => "governance.enforced",
            GovernanceError::AlreadyDisregarded { .. } => "governance.disregarded",
            GovernanceError::UnknownIndex { .. } => "governance.unknown",
        }
    }
}

impl From<GovernanceError> for Escalation {
    fn from(e: GovernanceError) -> Self {
        Escalation::new(e.kind(), e)
    }
}

impl GovernanceStatus {
    /// Apply an action to the current status
    ///
    /// Returns the next status, or `None` when the action has nothing to do
    /// (activating governance that is already active). Enforcing or
    /// disregarding outside an active episode is an error.
    pub fn transition(
        self,
        governance: &str,
        action: GovernanceAction,
    ) -> Result<Option<GovernanceStatus>, GovernanceError> {
        use GovernanceAction as A;
        use GovernanceStatus as S;

        match (self, action) {
            (S::Active, A::Activate) => Ok(None),
            (_, A::Activate) => Ok(Some(S::Active)),
            (S::Active, A::Enforce) => Ok(Some(S::Enforced)),
            (S::Active, A::Disregard) => Ok(Some(S::Disregarded)),
            (S::Enforced, _) => Err(GovernanceError::AlreadyEnforced {
                governance: governance.to_string(),
            }),
            (S::Disregarded, _) => Err(GovernanceError::AlreadyDisregarded {
                governance: governance.to_string(),
            }),
            (S::Inactive, action) => Err(GovernanceError::NotActive {
                governance: governance.to_string(),
                action: action.as_str(),
            }),
        }
    }

    pub fn is_active(self) -> bool {
        self == GovernanceStatus::Active
    }
}

/// One governance instance, created per activation episode
pub trait Governance: Send {
    /// Take the extension view of one governed resource
    fn govern(&mut self, extension: Object) -> Result<(), Escalation>;

    fn enforce(&mut self) -> Result<(), Escalation>;

    fn disregard(&mut self) -> Result<(), Escalation> {
        Ok(())
    }
}

/// Produces governance instances over a named resource extension
pub trait GovernanceSource: Send + Sync {
    /// Name of the extension each governed resource must provide
    fn extension(&self) -> &str;

    fn create(&self) -> Result<Box<dyn Governance>, Escalation>;
}

#[cfg(test)]
#[path = "governance_tests.rs"]
mod tests;
