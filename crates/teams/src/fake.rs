// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake team for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use floor_core::{Job, Team, TeamCapabilities, TeamError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Recorded team call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamCall {
    Start,
    Assign { job: String },
    Stop,
}

#[derive(Default)]
struct FakeTeamState {
    working: bool,
    calls: Vec<TeamCall>,
    pending: VecDeque<Job>,
}

/// Fake team that records calls
///
/// By default assigned jobs run inline. A held team queues them until the
/// test releases them with [`FakeTeam::run_next`] or [`FakeTeam::run_pending`].
#[derive(Clone)]
pub struct FakeTeam {
    name: String,
    hold: bool,
    capabilities: TeamCapabilities,
    state: Arc<Mutex<FakeTeamState>>,
}

impl FakeTeam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hold: false,
            capabilities: TeamCapabilities::default(),
            state: Arc::default(),
        }
    }

    /// Queue jobs instead of running them on assignment
    pub fn held(mut self) -> Self {
        self.hold = true;
        self
    }

    pub fn thread_local_aware(mut self) -> Self {
        self.capabilities.thread_local_aware = true;
        self
    }

    pub fn requiring_no_oversight(mut self) -> Self {
        self.capabilities.requires_no_oversight = true;
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TeamCall> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Names of the jobs assigned so far, in assignment order
    pub fn assigned(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TeamCall::Assign { job } => Some(job),
                _ => None,
            })
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .len()
    }

    /// Run the oldest held job; returns false when none is queued
    pub fn run_next(&self) -> bool {
        let job = self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .pop_front();
        match job {
            Some(job) => {
                job.run();
                true
            }
            None => false,
        }
    }

    /// Run held jobs, including ones they assign, until the queue is empty
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Team for FakeTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.working = true;
        state.calls.push(TeamCall::Start);
        Ok(())
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if !state.working {
                return Err(TeamError::Stopped {
                    team: self.name.clone(),
                });
            }
            state.calls.push(TeamCall::Assign {
                job: job.name().to_string(),
            });
            if self.hold {
                state.pending.push_back(job);
                return Ok(());
            }
        }
        job.run();
        Ok(())
    }

    fn stop_working(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.working = false;
        state.calls.push(TeamCall::Stop);
    }

    fn capabilities(&self) -> TeamCapabilities {
        self.capabilities
    }
}
