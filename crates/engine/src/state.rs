// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Function states and the thread chains that run them
//!
//! A thread's work is an ordered queue of function states. Activating a
//! function expands into its resource loads, administration, body, and
//! completion; flows and governance actions insert further states at the
//! front so they run before whatever was already queued.

use crate::container::{FunctionKey, ThreadKey};
use crate::escalation::Frame;
use crate::governance::GovernanceContainer;
use crate::process::ProcessShared;
use floor_core::{Escalation, GovernanceAction, Object, ResourceIndex};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One activation of a function, shared by the states it expands into
pub(crate) struct Activation {
    pub function: usize,
    pub scope: FunctionKey,
    pub parameter: Option<Object>,
    /// Frames consulted, nearest first, when this activation escalates
    pub enclosing: Option<Arc<Frame>>,
    /// Set for handlers taken from the office procedure
    pub office_escalation: bool,
    /// Sequential flows and next argument produced by the body
    pub outcome: Mutex<Option<BodyOutcome>>,
}

#[derive(Default)]
pub(crate) struct BodyOutcome {
    pub sequential: Vec<(usize, Option<Object>)>,
    pub next_argument: Option<Object>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdminPhase {
    Pre,
    Post,
}

pub(crate) enum Step {
    /// Function created with its parameter, nothing loaded yet
    Activate {
        function: usize,
        parameter: Option<Object>,
        enclosing: Option<Arc<Frame>>,
        office_escalation: bool,
    },
    Load(ResourceIndex),
    Administer { phase: AdminPhase, index: usize },
    Body,
    Governance {
        governance: usize,
        action: GovernanceAction,
    },
    Complete,
}

pub(crate) struct FunctionState {
    pub step: Step,
    /// Activation the step belongs to; `None` for thread-level work
    pub activation: Option<Arc<Activation>>,
}

impl FunctionState {
    pub fn activate(
        function: usize,
        parameter: Option<Object>,
        enclosing: Option<Arc<Frame>>,
        office_escalation: bool,
    ) -> Self {
        Self {
            step: Step::Activate {
                function,
                parameter,
                enclosing,
                office_escalation,
            },
            activation: None,
        }
    }

    pub fn within(activation: &Arc<Activation>, step: Step) -> Self {
        Self {
            step,
            activation: Some(Arc::clone(activation)),
        }
    }

    pub fn governance(
        governance: usize,
        action: GovernanceAction,
        activation: Option<Arc<Activation>>,
    ) -> Self {
        Self {
            step: Step::Governance { governance, action },
            activation,
        }
    }
}

/// The queued work of one thread state
pub(crate) struct ThreadChain {
    pub process: Arc<ProcessShared>,
    pub thread: ThreadKey,
    pub pending: VecDeque<FunctionState>,
    pub governance: Vec<GovernanceContainer>,
    /// Unhandled escalation ending this thread
    pub failure: Option<Escalation>,
}

impl ThreadChain {
    /// Queue states to run next, preserving their order
    pub fn push_front_all(&mut self, states: Vec<FunctionState>) {
        for state in states.into_iter().rev() {
            self.pending.push_front(state);
        }
    }

    /// Drop all queued work, including governance actions not yet run
    pub fn abandon(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        for governance in &mut self.governance {
            governance.reset_schedule();
        }
        dropped
    }
}
