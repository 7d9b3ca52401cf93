// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread creation and teardown

use crate::escalation::Frame;
use crate::executor::{run_chain, Worker};
use crate::function::FlowRequest;
use crate::governance::GovernanceContainer;
use crate::process::{ProcessShared, ThreadRecord};
use crate::state::{Activation, FunctionState, ThreadChain};
use floor_core::{FlowCallback, Instigation, Object};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Everything needed to start a new thread of a process
pub(crate) struct ThreadStart {
    pub function: usize,
    pub parameter: Option<Object>,
    pub enclosing: Option<Arc<Frame>>,
    pub office_escalation: bool,
    pub callback: Option<FlowCallback>,
    pub deadline: Option<Instant>,
}

impl ThreadStart {
    pub fn new(function: usize, parameter: Option<Object>) -> Self {
        Self {
            function,
            parameter,
            enclosing: None,
            office_escalation: false,
            callback: None,
            deadline: None,
        }
    }
}

/// Register a new thread with its process
///
/// Returns `None` once the process is cancelled; the callback, if any, is told.
pub(crate) fn spawn_thread(process: &Arc<ProcessShared>, start: ThreadStart) -> Option<ThreadChain> {
    let ThreadStart {
        function,
        parameter,
        enclosing,
        office_escalation,
        callback,
        deadline,
    } = start;

    if process.is_cancelled() {
        if let Some(callback) = callback {
            callback(Err(process.cancellation()));
        }
        return None;
    }

    let office = &process.office;
    let name = office.meta.functions[function].name.clone();
    let thread = {
        let mut data = process.lock();
        let thread = data.next_thread();
        data.threads.insert(
            thread,
            ThreadRecord {
                function: name,
                callback,
                deadline,
            },
        );
        data.live_threads += 1;
        thread
    };
    tracing::debug!(
        process = %process.id,
        thread = thread.0,
        function = %office.meta.functions[function].name,
        "thread started"
    );

    let governance = office
        .meta
        .governances
        .iter()
        .enumerate()
        .map(|(index, g)| GovernanceContainer::new(index, g.name.clone()))
        .collect();
    let mut pending = VecDeque::new();
    pending.push_back(FunctionState::activate(
        function,
        parameter,
        enclosing,
        office_escalation,
    ));
    Some(ThreadChain {
        process: Arc::clone(process),
        thread,
        pending,
        governance,
        failure: None,
    })
}

/// Start the thread of a parallel or asynchronous flow
///
/// Without a callback the new thread escalates through the instigating
/// function's procedures; with one, failures go to the callback.
pub(crate) fn spawn_flow(process: &Arc<ProcessShared>, instigator: &Arc<Activation>, request: FlowRequest) {
    let FlowRequest {
        flow,
        parameter,
        callback,
    } = request;
    let enclosing = match callback {
        Some(_) => None,
        None => Some(Frame::new(
            instigator.function,
            instigator.enclosing.clone(),
        )),
    };
    let deadline = (flow.instigation == Instigation::Asynchronous).then(|| {
        let office = &process.office;
        office
            .clock
            .deadline(office.meta.settings.default_async_flow_timeout)
    });
    let start = ThreadStart {
        function: flow.function,
        parameter,
        enclosing,
        office_escalation: instigator.office_escalation,
        callback,
        deadline,
    };
    if let Some(chain) = spawn_thread(process, start) {
        run_chain(chain, Worker::Foreign);
    }
}

/// Tear down a finished thread, and its process once no thread is left
pub(crate) fn finish_thread(chain: ThreadChain) {
    let ThreadChain {
        process,
        thread,
        failure,
        ..
    } = chain;

    let (released, record, finished) = {
        let mut data = process.lock();
        let mut released = data.registry.release_thread(thread);
        let record = data.threads.remove(&thread);
        data.live_threads = data.live_threads.saturating_sub(1);
        let finished = if data.live_threads == 0 {
            released.extend(data.registry.release_all());
            Some((data.outcome.take(), data.completion.take(), data.callback.take()))
        } else {
            None
        };
        (released, record, finished)
    };
    drop(released);
    tracing::debug!(process = %process.id, thread = thread.0, failed = failure.is_some(), "thread finished");

    if let Some(callback) = record.and_then(|r| r.callback) {
        callback(match failure {
            Some(escalation) => Err(escalation),
            None => Ok(()),
        });
    }

    if let Some((outcome, completion, callback)) = finished {
        let result = match outcome {
            Some(escalation) => Err(escalation),
            None => Ok(()),
        };
        tracing::info!(process = %process.id, failed = result.is_err(), "process completed");
        process.office.forget(&process.id);
        if let Some(callback) = callback {
            callback(result.clone());
        }
        if let Some(completion) = completion {
            // Receiver may already be gone
            let _ = completion.send(result);
        }
    }
}
