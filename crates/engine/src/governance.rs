// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Governance containers of one thread
//!
//! Requests are validated against the status the container will have once
//! everything already scheduled has run, and each accepted request becomes one
//! [`GovernanceStep`]. The step does the actual work when the thread reaches it.

use floor_core::{Governance, GovernanceAction, GovernanceError, GovernanceStatus};

/// Governance work waiting to be scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GovernanceStep {
    pub governance: usize,
    pub action: GovernanceAction,
}

pub(crate) struct GovernanceContainer {
    index: usize,
    name: String,
    scheduled: GovernanceStatus,
    status: GovernanceStatus,
    instance: Option<Box<dyn Governance>>,
}

impl GovernanceContainer {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            scheduled: GovernanceStatus::Inactive,
            status: GovernanceStatus::Inactive,
            instance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request(
        &mut self,
        action: GovernanceAction,
    ) -> Result<Option<GovernanceStep>, GovernanceError> {
        let Some(next) = self.scheduled.transition(&self.name, action)? else {
            return Ok(None);
        };
        self.scheduled = next;
        Ok(Some(GovernanceStep {
            governance: self.index,
            action,
        }))
    }

    /// Active once all scheduled work has run
    pub fn is_active(&self) -> bool {
        self.scheduled.is_active()
    }

    pub fn status(&self) -> GovernanceStatus {
        self.status
    }

    /// Record an activation that has run
    pub fn activated(&mut self, instance: Box<dyn Governance>) {
        self.instance = Some(instance);
        self.status = GovernanceStatus::Active;
    }

    /// Take the instance for a terminal action that is about to run
    pub fn finish(&mut self, action: GovernanceAction) -> Option<Box<dyn Governance>> {
        self.status = match action {
            GovernanceAction::Enforce => GovernanceStatus::Enforced,
            GovernanceAction::Disregard => GovernanceStatus::Disregarded,
            GovernanceAction::Activate => return None,
        };
        self.instance.take()
    }

    /// Drop pending work after an unhandled escalation, keeping executed status
    pub fn reset_schedule(&mut self) {
        self.scheduled = self.status;
    }
}
