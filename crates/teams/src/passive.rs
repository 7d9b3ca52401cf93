// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team that runs each job on the assigning thread

use floor_core::{Job, PropertySpec, Team, TeamError, TeamSource, TeamSourceContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct PassiveTeam {
    name: String,
    stopped: AtomicBool,
}

impl PassiveTeam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stopped: AtomicBool::new(false),
        }
    }
}

impl Team for PassiveTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        self.stopped.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(TeamError::Stopped {
                team: self.name.clone(),
            });
        }
        job.run();
        Ok(())
    }

    fn stop_working(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct PassiveTeamSource;

impl TeamSource for PassiveTeamSource {
    fn name(&self) -> &str {
        "passive"
    }

    fn specification(&self) -> Vec<PropertySpec> {
        crate::common_properties()
    }

    fn create_team(&self, context: &TeamSourceContext) -> Result<Arc<dyn Team>, TeamError> {
        Ok(Arc::new(PassiveTeam::new(context.team_name())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn runs_inline_until_stopped() {
        let team = PassiveTeam::new("inline");
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        team.assign_job(Job::new("one", move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        team.stop_working();
        let err = team.assign_job(Job::new("two", || {})).unwrap_err();
        assert!(matches!(err, TeamError::Stopped { .. }));
    }
}
