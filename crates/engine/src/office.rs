// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The office: built metadata plus the live processes running against it

use crate::escalation::EscalationHandler;
use crate::executor::{dispatch, run_chain, Worker};
use crate::meta::OfficeMeta;
use crate::process::{ProcessManager, ProcessShared};
use crate::spawn::{spawn_thread, ThreadStart};
use floor_core::{
    kinds, Clock, Escalation, ExecuteContext, FlowCallback, IdGen, InvokeError, Object, ProcessId,
    Team, ThreadLocalHook,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Built,
    Open,
    Closed,
}

pub(crate) struct OfficeInner {
    pub meta: OfficeMeta,
    pub clock: Arc<dyn Clock>,
    pub id_gen: Arc<dyn IdGen>,
    pub handler: Arc<dyn EscalationHandler>,
    pub hooks: Arc<[Arc<dyn ThreadLocalHook>]>,
    pub lifecycle: Mutex<Lifecycle>,
    processes: Mutex<HashMap<ProcessId, Arc<ProcessShared>>>,
}

impl OfficeInner {
    pub fn new(
        meta: OfficeMeta,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        handler: Arc<dyn EscalationHandler>,
        hooks: Arc<[Arc<dyn ThreadLocalHook>]>,
    ) -> Self {
        Self {
            meta,
            clock,
            id_gen,
            handler,
            hooks,
            lifecycle: Mutex::new(Lifecycle::Built),
            processes: Mutex::new(HashMap::new()),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_lifecycle(&self, lifecycle: Lifecycle) {
        *self.lifecycle.lock().unwrap_or_else(|e| e.into_inner()) = lifecycle;
    }

    /// Start a new process at `function`
    pub fn invoke(
        self: &Arc<Self>,
        function: &str,
        parameter: Option<Object>,
        callback: Option<FlowCallback>,
    ) -> Result<ProcessManager, InvokeError> {
        match self.lifecycle() {
            Lifecycle::Built => return Err(InvokeError::NotOpen),
            Lifecycle::Closed => return Err(InvokeError::Closed),
            Lifecycle::Open => {}
        }
        let index = self
            .meta
            .function(function)
            .ok_or_else(|| InvokeError::UnknownFunction(function.to_string()))?;
        if let Some(expected) = &self.meta.functions[index].parameter {
            if !expected.check(parameter.as_ref()) {
                return Err(InvokeError::ParameterType {
                    function: function.to_string(),
                    expected: expected.name.to_string(),
                });
            }
        }

        let id = ProcessId(self.id_gen.next());
        let (process, completion) = ProcessShared::new(id.clone(), Arc::clone(self), callback);
        self.processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), Arc::clone(&process));
        tracing::info!(process = %id, function, "process invoked");

        let manager = ProcessManager::new(Arc::clone(&process), completion);
        if let Some(chain) = spawn_thread(&process, ThreadStart::new(index, parameter)) {
            run_chain(chain, Worker::Foreign);
        }
        Ok(manager)
    }

    pub fn forget(&self, process: &ProcessId) {
        self.processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(process);
    }

    pub fn active_processes(&self) -> usize {
        self.processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Fail resource loads and asynchronous flows whose deadline has passed
    pub fn check_timeouts(&self, now: Instant) {
        let processes: Vec<Arc<ProcessShared>> = self
            .processes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        for process in processes {
            let (expired, timed_out) = {
                let mut data = process.lock();
                let expired = data.registry.expire(now);
                let timed_out: Vec<_> = data
                    .threads
                    .iter_mut()
                    .filter(|(_, t)| t.deadline.is_some_and(|d| d <= now))
                    .map(|(_, t)| {
                        t.deadline = None;
                        (t.function.clone(), t.callback.take())
                    })
                    .collect();
                (expired, timed_out)
            };

            for expired in expired {
                tracing::warn!(
                    process = %process.id,
                    resource = %expired.key.index(),
                    error = %expired.error,
                    waiting = expired.waiters.len(),
                    "resource load timed out"
                );
                dispatch(expired.waiters);
            }

            for (function, callback) in timed_out {
                let escalation = Escalation::new(
                    kinds::FLOW_TIMEOUT,
                    format!(
                        "asynchronous flow to {function} did not complete within {:?}",
                        self.meta.settings.default_async_flow_timeout
                    ),
                );
                tracing::warn!(process = %process.id, function = %function, "asynchronous flow timed out");
                match callback {
                    Some(callback) => callback(Err(escalation)),
                    None => {
                        self.handler.handle(&process.id, &escalation);
                        process.lock().fail(&escalation);
                    }
                }
            }
        }
    }
}

/// Process invocation handle given to managed resource sources
pub(crate) struct OfficeContext {
    office: Weak<OfficeInner>,
}

impl OfficeContext {
    pub fn new(office: &Arc<OfficeInner>) -> Self {
        Self {
            office: Arc::downgrade(office),
        }
    }
}

impl ExecuteContext for OfficeContext {
    fn invoke_process(
        &self,
        function: &str,
        parameter: Option<Object>,
        callback: Option<FlowCallback>,
    ) -> Result<ProcessId, InvokeError> {
        let office = self.office.upgrade().ok_or(InvokeError::Closed)?;
        let manager = office.invoke(function, parameter, callback)?;
        Ok(manager.id().clone())
    }
}

/// Cheap handle to a built office
#[derive(Clone)]
pub struct Office {
    inner: Arc<OfficeInner>,
}

impl Office {
    pub(crate) fn new(inner: Arc<OfficeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<OfficeInner> {
        &self.inner
    }

    /// Invoke a process starting at `function`
    ///
    /// Work with no team runs on the calling thread before this returns.
    pub fn invoke_process(
        &self,
        function: &str,
        parameter: Option<Object>,
    ) -> Result<ProcessManager, InvokeError> {
        self.inner.invoke(function, parameter, None)
    }

    /// Invoke a process and be told how it ended
    pub fn invoke_process_with_callback(
        &self,
        function: &str,
        parameter: Option<Object>,
        callback: impl FnOnce(Result<(), Escalation>) + Send + 'static,
    ) -> Result<ProcessManager, InvokeError> {
        self.inner.invoke(function, parameter, Some(Box::new(callback)))
    }

    /// Entry point for invokers holding no office reference
    pub fn execute_context(&self) -> Arc<dyn ExecuteContext> {
        Arc::new(OfficeContext::new(&self.inner))
    }

    /// Apply deadlines as of `now`; the monitor calls this on every tick
    pub fn check_timeouts(&self, now: Instant) {
        self.inner.check_timeouts(now);
    }

    /// Team as the office dispatches to it, after oversight
    pub fn team(&self, name: &str) -> Option<Arc<dyn Team>> {
        self.inner.meta.team_by_name(name).map(|t| Arc::clone(&t.team))
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.inner.meta.functions.iter().map(|f| f.name.as_str())
    }

    /// Processes that have not yet completed
    pub fn active_processes(&self) -> usize {
        self.inner.active_processes()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lifecycle() == Lifecycle::Open
    }
}

impl std::fmt::Debug for Office {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Office")
            .field("functions", &self.inner.meta.functions.len())
            .field("teams", &self.inner.meta.teams.len())
            .field("lifecycle", &self.inner.lifecycle())
            .finish()
    }
}

#[cfg(test)]
#[path = "office_tests.rs"]
mod tests;
