// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team backed by the tokio blocking thread pool

use floor_core::{Job, PropertySpec, Team, TeamError, TeamSource, TeamSourceContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;

pub struct TokioBlockingTeam {
    name: String,
    runtime: Handle,
    working: AtomicBool,
}

impl TokioBlockingTeam {
    pub fn new(name: impl Into<String>, runtime: Handle) -> Self {
        Self {
            name: name.into(),
            runtime,
            working: AtomicBool::new(false),
        }
    }
}

impl Team for TokioBlockingTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        self.working.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        if !self.working.load(Ordering::SeqCst) {
            return Err(TeamError::Stopped {
                team: self.name.clone(),
            });
        }
        let team = self.name.clone();
        // Dropped join handle: completion is reported by the job itself
        drop(
            self.runtime
                .spawn_blocking(move || crate::run_on_worker(&team, job)),
        );
        Ok(())
    }

    fn stop_working(&self) {
        self.working.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct TokioBlockingTeamSource;

impl TeamSource for TokioBlockingTeamSource {
    fn name(&self) -> &str {
        "tokio-blocking"
    }

    fn specification(&self) -> Vec<PropertySpec> {
        crate::common_properties()
    }

    fn create_team(&self, context: &TeamSourceContext) -> Result<Arc<dyn Team>, TeamError> {
        let runtime = match context.runtime() {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| TeamError::NoRuntime {
                team: context.team_name().to_string(),
            })?,
        };
        Ok(Arc::new(TokioBlockingTeam::new(context.team_name(), runtime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn jobs_run_on_blocking_pool() {
        let context = TeamSourceContext::new("blocking", BTreeMap::new());
        let team = TokioBlockingTeamSource.create_team(&context).unwrap();
        team.start_working().unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        team.assign_job(Job::new("send", move || {
            let _ = tx.send(42);
        }))
        .unwrap();
        assert_eq!(rx.await.unwrap(), 42);

        team.stop_working();
        assert!(team.assign_job(Job::new("late", || {})).is_err());
    }

    #[test]
    fn source_without_runtime_fails() {
        let context = TeamSourceContext::new("blocking", BTreeMap::new());
        let err = TokioBlockingTeamSource.create_team(&context).err().unwrap();
        assert_eq!(
            err,
            TeamError::NoRuntime {
                team: "blocking".to_string()
            }
        );
    }
}
