// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-local aware execution
//!
//! Work moves between pooled threads, so resources that depend on the
//! identity of the calling thread need their thread-local state primed before
//! each job and cleared after it. A team tagged thread-local aware gets every
//! job wrapped with the office's hooks at dispatch time.

use floor_core::{Job, Team, TeamCapabilities, TeamError, ThreadLocalHook};
use std::sync::Arc;

/// Tags an existing team as thread-local aware
pub struct ThreadLocalAwareTeam {
    inner: Arc<dyn Team>,
}

impl ThreadLocalAwareTeam {
    pub fn new(inner: Arc<dyn Team>) -> Self {
        Self { inner }
    }
}

impl Team for ThreadLocalAwareTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        self.inner.start_working()
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        self.inner.assign_job(job)
    }

    fn stop_working(&self) {
        self.inner.stop_working()
    }

    fn capabilities(&self) -> TeamCapabilities {
        TeamCapabilities {
            thread_local_aware: true,
            ..self.inner.capabilities()
        }
    }
}

/// Wrap `job` so every hook is primed before it runs and cleared after
///
/// Hooks are cleared in reverse priming order.
pub fn with_hooks(job: Job, hooks: Arc<[Arc<dyn ThreadLocalHook>]>) -> Job {
    if hooks.is_empty() {
        return job;
    }
    let process = job.process().cloned();
    job.wrap(move |body| {
        for hook in hooks.iter() {
            hook.prime(process.as_ref());
        }
        body();
        for hook in hooks.iter().rev() {
            hook.clear();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PassiveTeam;
    use floor_core::ProcessId;
    use std::sync::Mutex;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ThreadLocalHook for Recording {
        fn prime(&self, process: Option<&ProcessId>) {
            let process = process.map(|p| p.to_string()).unwrap_or_default();
            self.log
                .lock()
                .unwrap()
                .push(format!("prime {} {}", self.label, process));
        }

        fn clear(&self) {
            self.log.lock().unwrap().push(format!("clear {}", self.label));
        }
    }

    #[test]
    fn hooks_surround_the_job() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let hooks: Arc<[Arc<dyn ThreadLocalHook>]> = Arc::from(vec![
            Arc::new(Recording {
                label: "a",
                log: Arc::clone(&log),
            }) as Arc<dyn ThreadLocalHook>,
            Arc::new(Recording {
                label: "b",
                log: Arc::clone(&log),
            }),
        ]);

        let body_log = Arc::clone(&log);
        let job = Job::new("work", move || body_log.lock().unwrap().push("body".to_string()))
            .for_process(ProcessId::from("p-7"));
        with_hooks(job, hooks).run();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["prime a p-7", "prime b p-7", "body", "clear b", "clear a"]
        );
    }

    #[test]
    fn tagging_sets_capability() {
        let team = ThreadLocalAwareTeam::new(Arc::new(PassiveTeam::new("p")));
        assert!(team.capabilities().thread_local_aware);
        assert!(!team.capabilities().requires_no_oversight);
    }
}
