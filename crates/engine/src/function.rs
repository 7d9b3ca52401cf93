// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed functions and the context they run with

use crate::container::ResourceHandle;
use crate::meta::FlowMeta;
use crate::process::ProcessShared;
use floor_core::{kinds, Escalation, FlowCallback, Instigation, Object, ProcessId, ResourceError};
use std::any::Any;
use std::sync::Arc;

/// Business logic of one function
///
/// Returns the argument for the declared next function, if any.
pub trait ManagedFunction: Send + Sync {
    fn execute(&self, context: &mut FunctionContext) -> Result<Option<Object>, Escalation>;
}

impl<F> ManagedFunction for F
where
    F: Fn(&mut FunctionContext) -> Result<Option<Object>, Escalation> + Send + Sync,
{
    fn execute(&self, context: &mut FunctionContext) -> Result<Option<Object>, Escalation> {
        self(context)
    }
}

/// A flow instigated by a function or administration, dispatched once it returns
pub(crate) struct FlowRequest {
    pub flow: FlowMeta,
    pub parameter: Option<Object>,
    pub callback: Option<FlowCallback>,
}

/// Validates and records flow requests against declared flows
pub(crate) struct FlowRequests {
    owner: String,
    flows: Vec<FlowMeta>,
    process: Arc<ProcessShared>,
    requested: Vec<FlowRequest>,
}

impl FlowRequests {
    pub fn new(owner: impl Into<String>, flows: Vec<FlowMeta>, process: Arc<ProcessShared>) -> Self {
        Self {
            owner: owner.into(),
            flows,
            process,
            requested: Vec::new(),
        }
    }

    pub fn request(
        &mut self,
        index: usize,
        parameter: Option<Object>,
        callback: Option<FlowCallback>,
    ) -> Result<(), Escalation> {
        let flow = *self.flows.get(index).ok_or_else(|| {
            Escalation::new(
                kinds::FLOW_UNKNOWN,
                format!("{} has no flow {index}", self.owner),
            )
        })?;

        let target = &self.process.office.meta.functions[flow.function];
        if let Some(expected) = &target.parameter {
            if !expected.check(parameter.as_ref()) {
                return Err(Escalation::new(
                    "flow.parameter",
                    format!(
                        "flow {index} of {} passes the wrong parameter type to {} (expected {})",
                        self.owner, target.name, expected.name
                    ),
                ));
            }
        }
        if callback.is_some() && flow.instigation == Instigation::Sequential {
            return Err(Escalation::new(
                "flow.callback",
                format!(
                    "flow {index} of {} is sequential and cannot take a callback",
                    self.owner
                ),
            ));
        }

        tracing::debug!(owner = %self.owner, target = %target.name, instigation = %flow.instigation, "flow requested");
        self.requested.push(FlowRequest {
            flow,
            parameter,
            callback,
        });
        Ok(())
    }

    pub fn into_requests(self) -> Vec<FlowRequest> {
        self.requested
    }
}

/// What a function sees while it executes
pub struct FunctionContext {
    name: String,
    process: Arc<ProcessShared>,
    objects: Vec<ResourceHandle>,
    parameter: Option<Object>,
    flows: FlowRequests,
}

impl FunctionContext {
    pub(crate) fn new(
        name: String,
        process: Arc<ProcessShared>,
        objects: Vec<ResourceHandle>,
        parameter: Option<Object>,
        flows: Vec<FlowMeta>,
    ) -> Self {
        let requests = FlowRequests::new(name.clone(), flows, Arc::clone(&process));
        Self {
            name,
            process,
            objects,
            parameter,
            flows: requests,
        }
    }

    /// Name of the executing function
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process_id(&self) -> &ProcessId {
        &self.process.id
    }

    /// Object of the dependency declared at `index`
    pub fn object(&self, index: usize) -> Result<Object, Escalation> {
        let handle = self.objects.get(index).ok_or_else(|| ResourceError::NoDependency {
            resource: self.name.clone(),
            index,
        })?;
        let resource = handle.lock().unwrap_or_else(|e| e.into_inner());
        Ok(resource.object())
    }

    pub fn object_as<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, Escalation> {
        self.object(index)?.downcast::<T>().map_err(|_| {
            ResourceError::ObjectType {
                resource: format!("{} object {index}", self.name),
                expected: std::any::type_name::<T>(),
            }
            .into()
        })
    }

    pub fn parameter(&self) -> Option<&Object> {
        self.parameter.as_ref()
    }

    pub fn parameter_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.parameter
            .as_ref()
            .and_then(|p| Arc::clone(p).downcast::<T>().ok())
    }

    /// The escalation an escalation handler was invoked for
    pub fn escalation(&self) -> Option<Arc<Escalation>> {
        self.parameter_as::<Escalation>()
    }

    /// Instigate the declared flow at `index`
    ///
    /// Sequential flows run after this function completes, in call order.
    /// Parallel and asynchronous flows start once this function returns. A
    /// parallel flow whose function has no team runs on the office's default
    /// team, or inline on the returning thread when there is none, so it only
    /// runs concurrently when a team is configured.
    pub fn do_flow(&mut self, index: usize, parameter: Option<Object>) -> Result<(), Escalation> {
        self.flows.request(index, parameter, None)
    }

    /// Instigate a parallel or asynchronous flow and be told how it ended
    pub fn do_flow_with_callback(
        &mut self,
        index: usize,
        parameter: Option<Object>,
        callback: impl FnOnce(Result<(), Escalation>) + Send + 'static,
    ) -> Result<(), Escalation> {
        self.flows.request(index, parameter, Some(Box::new(callback)))
    }

    /// Run `operation` serialized against every other process-safe operation
    /// of this process
    pub fn run_process_safe<R>(&self, operation: impl FnOnce() -> R) -> R {
        let _guard = self.process.safe.lock().unwrap_or_else(|e| e.into_inner());
        operation()
    }

    pub(crate) fn into_requests(self) -> Vec<FlowRequest> {
        self.flows.into_requests()
    }
}
