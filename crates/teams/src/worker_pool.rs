// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size pool of worker threads pulling from one shared queue

use floor_core::{Job, PropertySpec, Team, TeamError, TeamSource, TeamSourceContext};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

pub const DEFAULT_POOL_SIZE: usize = 4;

struct Pool {
    sender: mpsc::UnboundedSender<Job>,
    handles: Vec<JoinHandle<()>>,
}

pub struct WorkerPoolTeam {
    name: String,
    size: usize,
    thread_name_prefix: String,
    pool: Mutex<Option<Pool>>,
}

impl WorkerPoolTeam {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        let name = name.into();
        Self {
            thread_name_prefix: name.clone(),
            name,
            size: size.max(1),
            pool: Mutex::new(None),
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Team for WorkerPoolTeam {
    fn start_working(&self) -> Result<(), TeamError> {
        let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        if pool.is_some() {
            return Ok(());
        }

        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let mut handles = Vec::with_capacity(self.size);
        for i in 0..self.size {
            let receiver = Arc::clone(&receiver);
            let team = self.name.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", self.thread_name_prefix, i + 1))
                .spawn(move || loop {
                    // Lock only to take the next job; run it unlocked
                    let next = receiver
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .blocking_recv();
                    match next {
                        Some(job) => crate::run_on_worker(&team, job),
                        None => break,
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    drop(sender);
                    join_all(&self.name, handles);
                    return Err(TeamError::Spawn {
                        team: self.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(team = %self.name, size = self.size, "worker pool started");
        *pool = Some(Pool { sender, handles });
        Ok(())
    }

    fn assign_job(&self, job: Job) -> Result<(), TeamError> {
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        let stopped = || TeamError::Stopped {
            team: self.name.clone(),
        };
        match pool.as_ref() {
            Some(p) => p.sender.send(job).map_err(|_| stopped()),
            None => Err(stopped()),
        }
    }

    fn stop_working(&self) {
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(Pool { sender, handles }) = pool {
            drop(sender);
            join_all(&self.name, handles);
        }
    }
}

fn join_all(team: &str, handles: Vec<JoinHandle<()>>) {
    let current = thread::current().id();
    for handle in handles {
        if handle.thread().id() == current {
            continue;
        }
        if handle.join().is_err() {
            tracing::warn!(team, "worker thread panicked");
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerPoolTeamSource;

impl TeamSource for WorkerPoolTeamSource {
    fn name(&self) -> &str {
        "worker-pool"
    }

    fn specification(&self) -> Vec<PropertySpec> {
        let mut spec = vec![
            PropertySpec::optional("size", "Number of worker threads", DEFAULT_POOL_SIZE.to_string()),
            PropertySpec::optional("thread_name_prefix", "Prefix for worker thread names", "<team name>"),
        ];
        spec.extend(crate::common_properties());
        spec
    }

    fn create_team(&self, context: &TeamSourceContext) -> Result<Arc<dyn Team>, TeamError> {
        let size: usize = context.parse_property("size", DEFAULT_POOL_SIZE)?;
        if size == 0 {
            return Err(TeamError::InvalidProperty {
                team: context.team_name().to_string(),
                property: "size".to_string(),
                value: "0".to_string(),
                reason: "a pool needs at least one worker".to_string(),
            });
        }
        let prefix = context.property_or("thread_name_prefix", context.team_name());
        Ok(Arc::new(
            WorkerPoolTeam::new(context.team_name(), size).with_thread_name_prefix(prefix),
        ))
    }
}
