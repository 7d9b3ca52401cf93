// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Escalation handler lookup and the top-level default handler

use floor_core::{Escalation, EscalationKind, EscalationProcedure, ProcessId};
use std::sync::Arc;

/// Receives escalations no procedure handled
pub trait EscalationHandler: Send + Sync {
    fn handle(&self, process: &ProcessId, escalation: &Escalation);
}

/// Writes unhandled escalations to stderr and the error log
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrEscalationHandler;

impl EscalationHandler for StderrEscalationHandler {
    fn handle(&self, process: &ProcessId, escalation: &Escalation) {
        tracing::error!(process = %process, kind = %escalation.kind(), error = %escalation.error(), "unhandled escalation");
        eprintln!("floor: process {process}: unhandled escalation {escalation}");
    }
}

/// A function whose escalation procedure encloses later work
#[derive(Debug)]
pub(crate) struct Frame {
    pub function: usize,
    pub parent: Option<Arc<Frame>>,
}

impl Frame {
    pub fn new(function: usize, parent: Option<Arc<Frame>>) -> Arc<Self> {
        Arc::new(Self { function, parent })
    }
}

/// Where an escalation goes
#[derive(Debug)]
pub(crate) enum Resolution {
    /// Run a handler function with the escalation as its parameter
    Handler {
        function: usize,
        enclosing: Option<Arc<Frame>>,
        office_escalation: bool,
    },
    /// Deliver to the callback of the thread's asynchronous flow
    Callback,
    /// Nothing matched: report through the default handler
    Unhandled,
}

/// Where the escalating work sits
pub(crate) struct Origin<'a> {
    /// Failing function and its enclosing frames, if any
    pub function: Option<(usize, &'a Option<Arc<Frame>>)>,
    /// The failing function is itself an office-level handler
    pub office_escalation: bool,
    /// The thread reports its outcome to a flow callback
    pub has_callback: bool,
}

/// Find the handler for `kind`, nearest scope first
///
/// Walks the failing function's procedure, then each enclosing frame, then the
/// thread's flow callback, then the office procedure. Within one procedure the
/// first matching entry wins. Office handlers that fail are not matched
/// against the office procedure again.
pub(crate) fn resolve<'p>(
    kind: &EscalationKind,
    origin: Origin<'_>,
    procedure_of: impl Fn(usize) -> &'p EscalationProcedure<usize>,
    office: &EscalationProcedure<usize>,
) -> Resolution {
    if let Some((function, enclosing)) = origin.function {
        if let Some(&handler) = procedure_of(function).find(kind) {
            return Resolution::Handler {
                function: handler,
                enclosing: enclosing.clone(),
                office_escalation: origin.office_escalation,
            };
        }
        let mut frame = enclosing.clone();
        while let Some(current) = frame {
            if let Some(&handler) = procedure_of(current.function).find(kind) {
                return Resolution::Handler {
                    function: handler,
                    enclosing: current.parent.clone(),
                    office_escalation: origin.office_escalation,
                };
            }
            frame = current.parent.clone();
        }
    }

    if origin.has_callback {
        return Resolution::Callback;
    }
    if origin.office_escalation {
        return Resolution::Unhandled;
    }
    match office.find(kind) {
        Some(&handler) => Resolution::Handler {
            function: handler,
            enclosing: None,
            office_escalation: true,
        },
        None => Resolution::Unhandled,
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
