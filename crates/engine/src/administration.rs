// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administration duties run around a function

use crate::function::{FlowRequest, FlowRequests};
use crate::governance::{GovernanceContainer, GovernanceStep};
use floor_core::{Escalation, GovernanceAction, GovernanceError, Object};
use std::any::Any;
use std::sync::Arc;

/// One administration run
pub trait Administration: Send {
    fn administer(&mut self, context: &mut AdministrationContext<'_>) -> Result<(), Escalation>;
}

/// Produces one administration instance per run
pub trait AdministrationSource: Send + Sync {
    /// Name of the extension every administered resource must provide
    fn extension(&self) -> &str;

    /// Ask the office to bypass oversight of the function's team
    fn requires_no_oversight(&self) -> bool {
        false
    }

    fn create(&self) -> Result<Box<dyn Administration>, Escalation>;
}

/// Administration source built from a closure
pub struct AdministrationFn<F> {
    extension: String,
    duty: Arc<F>,
}

impl<F> AdministrationFn<F>
where
    F: Fn(&mut AdministrationContext<'_>) -> Result<(), Escalation> + Send + Sync + 'static,
{
    pub fn new(extension: impl Into<String>, duty: F) -> Self {
        Self {
            extension: extension.into(),
            duty: Arc::new(duty),
        }
    }
}

struct FnRun<F>(Arc<F>);

impl<F> Administration for FnRun<F>
where
    F: Fn(&mut AdministrationContext<'_>) -> Result<(), Escalation> + Send + Sync,
{
    fn administer(&mut self, context: &mut AdministrationContext<'_>) -> Result<(), Escalation> {
        (self.0)(context)
    }
}

impl<F> AdministrationSource for AdministrationFn<F>
where
    F: Fn(&mut AdministrationContext<'_>) -> Result<(), Escalation> + Send + Sync + 'static,
{
    fn extension(&self) -> &str {
        &self.extension
    }

    fn create(&self) -> Result<Box<dyn Administration>, Escalation> {
        Ok(Box::new(FnRun(Arc::clone(&self.duty))))
    }
}

/// What an administration sees during one run
pub struct AdministrationContext<'a> {
    extensions: Vec<Object>,
    governance: &'a mut [GovernanceContainer],
    mapping: &'a [usize],
    actions: Vec<GovernanceStep>,
    flows: FlowRequests,
}

impl<'a> AdministrationContext<'a> {
    pub(crate) fn new(
        extensions: Vec<Object>,
        governance: &'a mut [GovernanceContainer],
        mapping: &'a [usize],
        flows: FlowRequests,
    ) -> Self {
        Self {
            extensions,
            governance,
            mapping,
            actions: Vec::new(),
            flows,
        }
    }

    /// Extension views of the administered resources, in declaration order
    pub fn extensions(&self) -> &[Object] {
        &self.extensions
    }

    pub fn extension_as<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.extensions
            .get(index)
            .and_then(|e| Arc::clone(e).downcast::<T>().ok())
    }

    /// Governance declared at local `index` of this administration
    pub fn governance(&mut self, index: usize) -> Result<GovernanceControl<'_>, GovernanceError> {
        let thread_index = *self
            .mapping
            .get(index)
            .ok_or(GovernanceError::UnknownIndex { index })?;
        let container = self
            .governance
            .get_mut(thread_index)
            .ok_or(GovernanceError::UnknownIndex { index })?;
        Ok(GovernanceControl {
            container,
            actions: &mut self.actions,
        })
    }

    pub fn do_flow(&mut self, index: usize, parameter: Option<Object>) -> Result<(), Escalation> {
        self.flows.request(index, parameter, None)
    }

    pub fn do_flow_with_callback(
        &mut self,
        index: usize,
        parameter: Option<Object>,
        callback: impl FnOnce(Result<(), Escalation>) + Send + 'static,
    ) -> Result<(), Escalation> {
        self.flows.request(index, parameter, Some(Box::new(callback)))
    }

    /// Governance actions in call order, and flows requested
    pub(crate) fn finish(self) -> (Vec<GovernanceStep>, Vec<FlowRequest>) {
        (self.actions, self.flows.into_requests())
    }
}

/// Requests governance actions on one governance container
pub struct GovernanceControl<'c> {
    container: &'c mut GovernanceContainer,
    actions: &'c mut Vec<GovernanceStep>,
}

impl GovernanceControl<'_> {
    pub fn name(&self) -> &str {
        self.container.name()
    }

    pub fn activate(&mut self) -> Result<(), GovernanceError> {
        self.request(GovernanceAction::Activate)
    }

    pub fn enforce(&mut self) -> Result<(), GovernanceError> {
        self.request(GovernanceAction::Enforce)
    }

    pub fn disregard(&mut self) -> Result<(), GovernanceError> {
        self.request(GovernanceAction::Disregard)
    }

    fn request(&mut self, action: GovernanceAction) -> Result<(), GovernanceError> {
        if let Some(step) = self.container.request(action)? {
            self.actions.push(step);
        }
        Ok(())
    }
}
