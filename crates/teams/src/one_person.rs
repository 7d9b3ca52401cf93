// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team with a single dedicated worker thread
//!
//! Jobs run strictly in assignment order on one thread, which makes this the
//! team for work that relies on a fixed executing thread.

use floor_core::{Job, PropertySpec, Team, TeamError, TeamSource, TeamSourceContext};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::mpsc;

struct Worker {
    sender: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<()>,
}

pub struct OnePersonTeam {
    name: String,
    thread_name: String,
    worker: Mutex<Option<Worker>>,
}

impl OnePersonTeam {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            thread_name: name.clone(),
            name,
            worker: Mutex::new(None),
        }
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Id of the worker thread while the team is working
    pub fn worker_thread(&self) -> Option<ThreadId> {
        self.worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|w| w.handle.thread().id())
    }
}

impl Team for OnePersonTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.is_some() {
            return Ok(());
        }

        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let team = self.name.clone();
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    crate::run_on_worker(&team, job);
                }
                tracing::debug!(team, "worker finished");
            })
            .map_err(|e| TeamError::Spawn {
                team: self.name.clone(),
                reason: e.to_string(),
            })?;

        *worker = Some(Worker { sender, handle });
        Ok(())
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        let stopped = || TeamError::Stopped {
            team: self.name.clone(),
        };
        match worker.as_ref() {
            Some(w) => w.sender.send(job).map_err(|_| stopped()),
            None => Err(stopped()),
        }
    }

    fn stop_working(&self) {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(Worker { sender, handle }) = worker else {
            return;
        };
        // Closing the channel lets the worker drain queued jobs and exit
        drop(sender);
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::warn!(team = %self.name, "worker thread panicked");
        }
    }
}

#[derive(Debug, Default)]
pub struct OnePersonTeamSource;

impl TeamSource for OnePersonTeamSource {
    fn name(&self) -> &str {
        "one-person"
    }

    fn specification(&self) -> Vec<PropertySpec> {
        let mut spec = vec![PropertySpec::optional(
            "thread_name",
            "Name of the worker thread",
            "<team name>",
        )];
        spec.extend(crate::common_properties());
        spec
    }

    fn create_team(&self, context: &TeamSourceContext) -> Result<Arc<dyn Team>, TeamError> {
        let thread_name = context.property_or("thread_name", context.team_name());
        Ok(Arc::new(
            OnePersonTeam::new(context.team_name()).with_thread_name(thread_name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;

    #[test]
    fn jobs_run_in_order_on_one_thread() {
        let team = OnePersonTeam::new("single");
        team.start_working().unwrap();
        let worker = team.worker_thread().unwrap();

        let (tx, rx) = std_mpsc::channel();
        for i in 0..5 {
            let tx = tx.clone();
            team.assign_job(Job::new(format!("job-{i}"), move || {
                tx.send((i, thread::current().id())).unwrap();
            }))
            .unwrap();
        }
        team.stop_working();

        let seen: Vec<_> = rx.try_iter().collect();
        assert_eq!(seen.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(seen.iter().all(|(_, id)| *id == worker));
    }

    #[test]
    fn assignment_before_start_is_rejected() {
        let team = OnePersonTeam::new("idle");
        let err = team.assign_job(Job::new("early", || {})).unwrap_err();
        assert_eq!(err.to_string(), "team idle is not working");
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let team = OnePersonTeam::new("sturdy");
        team.start_working().unwrap();
        team.assign_job(Job::new("boom", || panic!("boom"))).unwrap();

        let (tx, rx) = std_mpsc::channel();
        team.assign_job(Job::new("after", move || tx.send(()).unwrap()))
            .unwrap();
        team.stop_working();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn source_uses_configured_thread_name() {
        let mut properties = std::collections::BTreeMap::new();
        properties.insert("thread_name".to_string(), "io-thread".to_string());
        let context = TeamSourceContext::new("io", properties);
        let team = OnePersonTeamSource.create_team(&context).unwrap();
        team.start_working().unwrap();

        let (tx, rx) = std_mpsc::channel();
        team.assign_job(Job::new("name", move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        }))
        .unwrap();
        team.stop_working();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("io-thread"));
    }
}
