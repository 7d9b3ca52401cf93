// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team contracts
//!
//! A team executes jobs handed to it by the engine. Teams are built by a
//! [`TeamSource`] from a [`TeamSourceContext`], and may be wrapped by a
//! [`TeamOversight`] unless their capabilities ask otherwise.

use crate::id::ProcessId;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// A unit of work assigned to a team
pub struct Job {
    name: String,
    process: Option<ProcessId>,
    run: Box<dyn FnOnce() + Send>,
}

impl Job {
    pub fn new(name: impl Into<String>, run: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            process: None,
            run: Box::new(run),
        }
    }

    /// Tag the job with the process it advances
    pub fn for_process(mut self, process: ProcessId) -> Self {
        self.process = Some(process);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process(&self) -> Option<&ProcessId> {
        self.process.as_ref()
    }

    /// Run the job to completion on the calling thread
    pub fn run(self) {
        (self.run)()
    }

    /// Replace the body while keeping name and process tag
    pub fn wrap(self, f: impl FnOnce(Box<dyn FnOnce() + Send>) + Send + 'static) -> Self {
        let inner = self.run;
        Self {
            name: self.name,
            process: self.process,
            run: Box::new(move || f(inner)),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("process", &self.process)
            .finish_non_exhaustive()
    }
}

/// Capabilities a team declares, checked at dispatch time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamCapabilities {
    /// Thread-local hooks must be primed and cleared around each job
    pub thread_local_aware: bool,
    /// Oversight must hand this team back unwrapped
    pub requires_no_oversight: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TeamError {
    #[error("team {team}: missing required property {property}")]
    MissingProperty { team: String, property: String },
    #[error("team {team}: invalid property {property}={value}: {reason}")]
    InvalidProperty {
        team: String,
        property: String,
        value: String,
        reason: String,
    },
    #[error("team {team}: no async runtime available")]
    NoRuntime { team: String },
    #[error("team {team}: unknown team source {source_name}")]
    UnknownSource { team: String, source_name: String },
    #[error("team {team}: failed to spawn worker: {reason}")]
    Spawn { team: String, reason: String },
    #[error("team {team} is not working")]
    Stopped { team: String },
}

/// A named worker pool
pub trait Team: Send + Sync {
    fn start_working(&self) -> Result<(), TeamError>;

    /// Hand a job to the team; never runs it after `stop_working`
    fn assign_job(&self, job: Job) -> Result<(), TeamError>;

    fn stop_working(&self);

    fn capabilities(&self) -> TeamCapabilities {
        TeamCapabilities::default()
    }
}

/// Describes one configuration property a team source understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    pub label: String,
    /// `None` marks the property as required
    pub default: Option<String>,
}

impl PropertySpec {
    pub fn required(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        label: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Everything a team source may consult while building its team
#[derive(Debug, Clone)]
pub struct TeamSourceContext {
    team_name: String,
    properties: BTreeMap<String, String>,
    runtime: Option<tokio::runtime::Handle>,
    span: tracing::Span,
}

impl TeamSourceContext {
    pub fn new(team_name: impl Into<String>, properties: BTreeMap<String, String>) -> Self {
        let team_name = team_name.into();
        let span = tracing::info_span!("team", name = %team_name);
        Self {
            team_name,
            properties,
            runtime: None,
            span,
        }
    }

    pub fn with_runtime(mut self, runtime: tokio::runtime::Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    /// Span the team's own logging should be recorded under
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    pub fn runtime(&self) -> Option<&tokio::runtime::Handle> {
        self.runtime.as_ref()
    }

    pub fn property(&self, name: &str) -> Result<&str, TeamError> {
        self.properties
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| TeamError::MissingProperty {
                team: self.team_name.clone(),
                property: name.to_string(),
            })
    }

    pub fn property_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.properties
            .get(name)
            .map(String::as_str)
            .unwrap_or(default)
    }

    /// Parse an optional property, falling back to `default` when unset
    pub fn parse_property<T>(&self, name: &str, default: T) -> Result<T, TeamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.properties.get(name) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| TeamError::InvalidProperty {
                team: self.team_name.clone(),
                property: name.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Report the first required property of `spec` that is not set
    pub fn check_specification(&self, spec: &[PropertySpec]) -> Result<(), TeamError> {
        for property in spec.iter().filter(|p| p.is_required()) {
            self.property(&property.name)?;
        }
        Ok(())
    }
}

/// Builds teams of one kind
pub trait TeamSource: Send + Sync {
    /// Name the source is registered under
    fn name(&self) -> &str;

    fn specification(&self) -> Vec<PropertySpec> {
        Vec::new()
    }

    fn create_team(&self, context: &TeamSourceContext) -> Result<Arc<dyn Team>, TeamError>;
}

/// May substitute the team a source built
pub trait TeamOversight: Send + Sync {
    fn oversee(&self, team_name: &str, team: Arc<dyn Team>) -> Arc<dyn Team>;
}

/// Primes and clears thread-local state around jobs on thread-local aware teams
pub trait ThreadLocalHook: Send + Sync {
    fn prime(&self, process: Option<&ProcessId>);
    fn clear(&self);
}

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;
