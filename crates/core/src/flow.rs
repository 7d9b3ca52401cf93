// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow instigation and the process invocation boundary

use crate::escalation::Escalation;
use crate::id::ProcessId;
use crate::resource::Object;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a flow schedules its target function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instigation {
    /// Runs as the continuation of the current function, in call order
    Sequential,
    /// Runs on its own thread; the caller does not wait
    Parallel,
    /// Runs on its own thread; completion is reported through a callback
    Asynchronous,
}

impl Instigation {
    /// Whether this instigation creates a new thread state
    pub fn spawns_thread(self) -> bool {
        !matches!(self, Instigation::Sequential)
    }
}

impl std::fmt::Display for Instigation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Instigation::Sequential => "sequential",
            Instigation::Parallel => "parallel",
            Instigation::Asynchronous => "asynchronous",
        };
        write!(f, "{s}")
    }
}

/// Receives the outcome of an asynchronous flow or an invoked process
///
/// Invoked exactly once, possibly from a different thread than the one that
/// instigated the flow.
pub type FlowCallback = Box<dyn FnOnce(Result<(), Escalation>) + Send>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("office is not open")]
    NotOpen,
    #[error("office has been closed")]
    Closed,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("function {function} expects a parameter of type {expected}")]
    ParameterType {
        function: String,
        expected: String,
    },
}

/// Entry point for invoking new processes from outside a running function
///
/// Handed to managed resource sources on start, and the same boundary
/// transport adapters use.
pub trait ExecuteContext: Send + Sync {
    fn invoke_process(
        &self,
        function: &str,
        parameter: Option<Object>,
        callback: Option<FlowCallback>,
    ) -> Result<ProcessId, InvokeError>;
}
