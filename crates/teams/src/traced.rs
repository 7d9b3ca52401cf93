// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced team wrappers for consistent observability

use floor_core::{Job, Team, TeamCapabilities, TeamError, TeamOversight};
use std::sync::Arc;
use std::time::Instant;

/// Wrapper that adds tracing to any Team
pub struct TracedTeam {
    name: String,
    inner: Arc<dyn Team>,
}

impl TracedTeam {
    pub fn new(name: impl Into<String>, inner: Arc<dyn Team>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl Team for TracedTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        let span = tracing::info_span!("team.start", team = %self.name);
        let _guard = span.enter();

        tracing::info!("starting");
        let start = Instant::now();
        let result = self.inner.start_working();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::info!(elapsed_ms, "working"),
            Err(e) => tracing::error!(elapsed_ms, error = %e, "start failed"),
        }

        result
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        let team = self.name.clone();
        let job_name = job.name().to_string();
        tracing::debug!(team = %team, job = %job_name, "assigned");

        let assigned = Instant::now();
        let job = job.wrap(move |body| {
            let span = tracing::debug_span!("team.job", team = %team, job = %job_name);
            let _guard = span.enter();
            let queued_ms = assigned.elapsed().as_millis() as u64;
            let start = Instant::now();
            body();
            tracing::debug!(
                queued_ms,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "ran"
            );
        });

        let result = self.inner.assign_job(job);
        if let Err(e) = &result {
            tracing::error!(team = %self.name, error = %e, "assign failed");
        }
        result
    }

    fn stop_working(&self) {
        let span = tracing::info_span!("team.stop", team = %self.name);
        let _guard = span.enter();

        let start = Instant::now();
        self.inner.stop_working();
        tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "stopped");
    }

    fn capabilities(&self) -> TeamCapabilities {
        self.inner.capabilities()
    }
}

/// Oversight that wraps every overseen team in a [`TracedTeam`]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracedOversight;

impl TeamOversight for TracedOversight {
    fn oversee(&self, team_name: &str, team: Arc<dyn Team>) -> Arc<dyn Team> {
        Arc::new(TracedTeam::new(team_name, team))
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
