// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Office floor lifecycle
//!
//! Opening starts every resource source, then every team, then the timeout
//! monitor and startup processes. Closing stops the monitor, then the teams,
//! then the resource sources. A closed floor cannot be reopened.

use crate::error::LifecycleError;
use crate::monitor::Monitor;
use crate::office::{Lifecycle, Office, OfficeContext};
use floor_core::{ExecuteContext, ManagedResourceSource};
use std::sync::{Arc, Mutex};

pub struct OfficeFloor {
    office: Office,
    monitor: Mutex<Option<Monitor>>,
}

impl OfficeFloor {
    pub(crate) fn new(office: Office) -> Self {
        Self {
            office,
            monitor: Mutex::new(None),
        }
    }

    pub fn office(&self) -> &Office {
        &self.office
    }

    pub fn open(&self) -> Result<(), LifecycleError> {
        let inner = self.office.inner();
        match inner.lifecycle() {
            Lifecycle::Open => return Err(LifecycleError::AlreadyOpen),
            Lifecycle::Closed => return Err(LifecycleError::Closed),
            Lifecycle::Built => {}
        }
        tracing::info!("opening office floor");

        let context: Arc<dyn ExecuteContext> = Arc::new(OfficeContext::new(inner));
        let sources = self.sources();
        for (index, (name, source)) in sources.iter().enumerate() {
            if let Err(e) = source.start(Arc::clone(&context)) {
                tracing::error!(resource = %name, error = %e, "resource source failed to start");
                stop_sources(&sources[..index]);
                inner.set_lifecycle(Lifecycle::Closed);
                return Err(LifecycleError::ResourceSource {
                    resource: name.clone(),
                    source: e,
                });
            }
        }

        let teams = &inner.meta.teams;
        for (index, member) in teams.iter().enumerate() {
            if let Err(e) = member.team.start_working() {
                tracing::error!(team = %member.name, error = %e, "team failed to start");
                for started in &teams[..index] {
                    started.team.stop_working();
                }
                stop_sources(&sources);
                inner.set_lifecycle(Lifecycle::Closed);
                return Err(LifecycleError::Team {
                    team: member.name.clone(),
                    source: e,
                });
            }
        }

        inner.set_lifecycle(Lifecycle::Open);
        if let Err(e) = self.start_monitor_and_startup() {
            tracing::error!(error = %e, "office floor failed to open");
            self.shut_down();
            return Err(e);
        }
        tracing::info!(
            teams = teams.len(),
            sources = sources.len(),
            "office floor open"
        );
        Ok(())
    }

    /// Stop the floor; closing again does nothing
    pub fn close(&self) {
        if self.office.inner().lifecycle() != Lifecycle::Open {
            self.office.inner().set_lifecycle(Lifecycle::Closed);
            return;
        }
        tracing::info!("closing office floor");
        self.shut_down();
        tracing::info!("office floor closed");
    }

    pub fn is_open(&self) -> bool {
        self.office.is_open()
    }

    fn start_monitor_and_startup(&self) -> Result<(), LifecycleError> {
        let inner = self.office.inner();
        let monitor = Monitor::start(inner, inner.meta.settings.monitor_interval)
            .map_err(LifecycleError::Monitor)?;
        *self.monitor.lock().unwrap_or_else(|e| e.into_inner()) = Some(monitor);

        for &function in &inner.meta.startup {
            let name = &inner.meta.functions[function].name;
            tracing::info!(function = %name, "running startup process");
            inner
                .invoke(name, None, None)
                .map_err(|source| LifecycleError::Startup {
                    function: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Stop the monitor, then the teams, then the resource sources
    fn shut_down(&self) {
        let inner = self.office.inner();
        inner.set_lifecycle(Lifecycle::Closed);
        let monitor = self.monitor.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(monitor) = monitor {
            monitor.stop();
        }
        for member in &inner.meta.teams {
            member.team.stop_working();
        }
        stop_sources(&self.sources());
    }

    /// Each distinct resource source once, in resource order
    fn sources(&self) -> Vec<(String, Arc<dyn ManagedResourceSource>)> {
        let mut resources: Vec<_> = self.office.inner().meta.resources.iter().collect();
        resources.sort_by_key(|(index, _)| **index);
        let mut sources: Vec<(String, Arc<dyn ManagedResourceSource>)> = Vec::new();
        for (_, resource) in resources {
            let seen = sources
                .iter()
                .any(|(_, s)| std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(&resource.source)));
            if !seen {
                sources.push((resource.name.clone(), Arc::clone(&resource.source)));
            }
        }
        sources
    }
}

fn stop_sources(sources: &[(String, Arc<dyn ManagedResourceSource>)]) {
    for (name, source) in sources {
        tracing::debug!(resource = %name, "stopping resource source");
        source.stop();
    }
}

impl Drop for OfficeFloor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for OfficeFloor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficeFloor")
            .field("office", &self.office)
            .finish()
    }
}

#[cfg(test)]
#[path = "floor_tests.rs"]
mod tests;
