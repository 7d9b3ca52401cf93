// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable office metadata produced by the builder

use crate::administration::AdministrationSource;
use crate::function::ManagedFunction;
use floor_core::{
    EscalationProcedure, GovernanceDeactivation, GovernanceSource, Instigation,
    ManagedResourceSource, Object, ResourceIndex, ResourceScope, Team, TeamCapabilities,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Runtime settings taken from configuration
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub monitor_interval: Duration,
    pub default_resource_timeout: Duration,
    pub default_async_flow_timeout: Duration,
    pub governance_deactivation: GovernanceDeactivation,
}

impl Settings {
    pub fn from_config(config: &floor_config::OfficeConfig) -> Self {
        Self {
            monitor_interval: config.monitor_interval,
            default_resource_timeout: config.default_resource_timeout,
            default_async_flow_timeout: config.default_async_flow_timeout,
            governance_deactivation: config.governance_deactivation,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&floor_config::OfficeConfig::default())
    }
}

/// Type a function expects as its parameter
#[derive(Clone, Copy)]
pub(crate) struct ParameterType {
    pub name: &'static str,
    pub accepts: fn(&Object) -> bool,
}

impl ParameterType {
    pub fn of<T: std::any::Any + Send + Sync>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            accepts: |object| object.is::<T>(),
        }
    }

    /// A missing parameter is always accepted
    pub fn check(&self, parameter: Option<&Object>) -> bool {
        parameter.map_or(true, |p| (self.accepts)(p))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlowMeta {
    pub function: usize,
    pub instigation: Instigation,
}

pub(crate) struct ResourceMeta {
    pub name: String,
    pub scope: ResourceScope,
    pub source: Arc<dyn ManagedResourceSource>,
    pub dependencies: Vec<ResourceIndex>,
    pub extensions: Vec<String>,
    pub timeout: Duration,
    /// Dependencies first, this resource last
    pub load_order: Vec<ResourceIndex>,
}

pub(crate) struct AdministrationMeta {
    pub name: String,
    pub source: Arc<dyn AdministrationSource>,
    pub resources: Vec<ResourceIndex>,
    /// Local governance index -> office governance index
    pub governance: Vec<usize>,
    pub flows: Vec<FlowMeta>,
}

pub(crate) struct FunctionMeta {
    pub name: String,
    pub body: Arc<dyn ManagedFunction>,
    pub team: Option<usize>,
    pub objects: Vec<ResourceIndex>,
    pub parameter: Option<ParameterType>,
    pub flows: Vec<FlowMeta>,
    pub next: Option<usize>,
    pub escalation: EscalationProcedure<usize>,
    pub pre_administration: Vec<AdministrationMeta>,
    pub post_administration: Vec<AdministrationMeta>,
    /// Every resource this function needs loaded, in dependency order
    pub load_order: Vec<ResourceIndex>,
}

pub(crate) struct GovernanceMeta {
    pub name: String,
    pub source: Arc<dyn GovernanceSource>,
    pub resources: Vec<ResourceIndex>,
    pub team: Option<usize>,
}

pub(crate) struct TeamMeta {
    pub name: String,
    pub team: Arc<dyn Team>,
    pub capabilities: TeamCapabilities,
}

pub(crate) struct OfficeMeta {
    pub functions: Vec<FunctionMeta>,
    pub function_index: HashMap<String, usize>,
    pub resources: HashMap<ResourceIndex, ResourceMeta>,
    pub governances: Vec<GovernanceMeta>,
    pub teams: Vec<TeamMeta>,
    pub escalation: EscalationProcedure<usize>,
    pub startup: Vec<usize>,
    pub default_team: Option<usize>,
    pub settings: Settings,
}

impl OfficeMeta {
    pub fn function(&self, name: &str) -> Option<usize> {
        self.function_index.get(name).copied()
    }

    pub fn resource(&self, index: ResourceIndex) -> Option<&ResourceMeta> {
        self.resources.get(&index)
    }

    pub fn team_by_name(&self, name: &str) -> Option<&TeamMeta> {
        self.teams.iter().find(|t| t.name == name)
    }
}
