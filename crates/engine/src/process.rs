// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process state and the handle returned to invokers

use crate::container::{FunctionKey, ResourceRegistry, ThreadKey};
use crate::office::OfficeInner;
use crate::state::ThreadChain;
use floor_core::{kinds, Escalation, FlowCallback, ProcessId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::oneshot;

/// Bookkeeping for one live thread of a process
pub(crate) struct ThreadRecord {
    /// Root function of the thread
    pub function: String,
    /// Told how the thread ended; taken when it fires
    pub callback: Option<FlowCallback>,
    /// Asynchronous flows fail with `flow.timeout` after this instant
    pub deadline: Option<Instant>,
}

pub(crate) struct ProcessData {
    pub registry: ResourceRegistry<ThreadChain>,
    pub threads: HashMap<ThreadKey, ThreadRecord>,
    pub live_threads: usize,
    next_thread: u64,
    next_function: u64,
    /// First unhandled escalation; reported on completion
    pub outcome: Option<Escalation>,
    pub completion: Option<oneshot::Sender<Result<(), Escalation>>>,
    pub callback: Option<FlowCallback>,
}

impl ProcessData {
    pub fn next_thread(&mut self) -> ThreadKey {
        self.next_thread += 1;
        ThreadKey(self.next_thread)
    }

    pub fn next_function(&mut self) -> FunctionKey {
        self.next_function += 1;
        FunctionKey(self.next_function)
    }

    /// Record an unhandled escalation, keeping the first one
    pub fn fail(&mut self, escalation: &Escalation) {
        if self.outcome.is_none() {
            self.outcome = Some(escalation.clone());
        }
    }
}

/// State shared by every thread of one process
pub(crate) struct ProcessShared {
    pub id: ProcessId,
    pub office: Arc<OfficeInner>,
    pub data: Mutex<ProcessData>,
    cancelled: AtomicBool,
    /// Serializes process-safe operations
    pub safe: Mutex<()>,
}

impl ProcessShared {
    pub fn new(
        id: ProcessId,
        office: Arc<OfficeInner>,
        callback: Option<FlowCallback>,
    ) -> (Arc<Self>, oneshot::Receiver<Result<(), Escalation>>) {
        let (tx, rx) = oneshot::channel();
        let process = Arc::new(Self {
            id,
            office,
            data: Mutex::new(ProcessData {
                registry: ResourceRegistry::new(),
                threads: HashMap::new(),
                live_threads: 0,
                next_thread: 0,
                next_function: 0,
                outcome: None,
                completion: Some(tx),
                callback,
            }),
            cancelled: AtomicBool::new(false),
            safe: Mutex::new(()),
        });
        (process, rx)
    }

    pub fn lock(&self) -> MutexGuard<'_, ProcessData> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::info!(process = %self.id, "process cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancellation(&self) -> Escalation {
        Escalation::new(
            kinds::PROCESS_CANCELLED,
            format!("process {} was cancelled", self.id),
        )
    }
}

/// Handle to an invoked process
///
/// Dropping the handle does not affect the process.
pub struct ProcessManager {
    process: Arc<ProcessShared>,
    completion: oneshot::Receiver<Result<(), Escalation>>,
}

impl ProcessManager {
    pub(crate) fn new(
        process: Arc<ProcessShared>,
        completion: oneshot::Receiver<Result<(), Escalation>>,
    ) -> Self {
        Self {
            process,
            completion,
        }
    }

    pub fn id(&self) -> &ProcessId {
        &self.process.id
    }

    /// Stop scheduling new work for the process
    ///
    /// Work already executing on a team runs to its next step.
    pub fn cancel(&self) {
        self.process.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.process.is_cancelled()
    }

    /// Wait for the process to finish
    ///
    /// Resolves to the first escalation no procedure handled, if any.
    pub async fn completion(self) -> Result<(), Escalation> {
        match self.completion.await {
            Ok(outcome) => outcome,
            Err(_) => Err(Escalation::failure(format!(
                "process {} ended without reporting completion",
                self.process.id
            ))),
        }
    }
}

impl std::fmt::Debug for ProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessManager")
            .field("id", &self.process.id)
            .field("cancelled", &self.process.is_cancelled())
            .finish()
    }
}
