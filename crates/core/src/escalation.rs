// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Escalations and escalation procedures
//!
//! An escalation is the engine's structured failure. Every escalation carries a
//! hierarchical [`EscalationKind`] (`resource.timeout` is-a `resource`) used to
//! match it against the handlers of an [`EscalationProcedure`].

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Built-in escalation kinds raised by the engine itself
pub mod kinds {
    /// Root kind; a handler keyed on it matches every escalation
    pub const ROOT: &str = "*";
    /// Default kind for business failures
    pub const FAILURE: &str = "failure";
    /// Function, administration, or governance code that panicked
    pub const PANIC: &str = "failure.panic";
    pub const RESOURCE: &str = "resource";
    pub const RESOURCE_TIMEOUT: &str = "resource.timeout";
    pub const GOVERNANCE: &str = "governance";
    pub const FLOW: &str = "flow";
    pub const FLOW_TIMEOUT: &str = "flow.timeout";
    pub const FLOW_UNKNOWN: &str = "flow.unknown";
    pub const TEAM: &str = "team";
    pub const PROCESS_CANCELLED: &str = "process.cancelled";
}

/// Hierarchical escalation kind made of dot-separated segments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscalationKind(String);

impl EscalationKind {
    pub fn new(kind: impl Into<String>) -> Self {
        EscalationKind(kind.into())
    }

    /// The kind every other kind descends from
    pub fn root() -> Self {
        EscalationKind(kinds::ROOT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == kinds::ROOT
    }

    /// True when this kind equals `ancestor` or descends from it
    pub fn is_a(&self, ancestor: &EscalationKind) -> bool {
        if ancestor.is_root() {
            return true;
        }
        match self.0.strip_prefix(ancestor.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.'),
            None => false,
        }
    }

    /// Immediate ancestor, `None` for the root
    pub fn parent(&self) -> Option<EscalationKind> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('.') {
            Some((parent, _)) => Some(EscalationKind::new(parent)),
            None => Some(EscalationKind::root()),
        }
    }
}

impl fmt::Display for EscalationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EscalationKind {
    fn from(s: &str) -> Self {
        EscalationKind::new(s)
    }
}

impl From<String> for EscalationKind {
    fn from(s: String) -> Self {
        EscalationKind(s)
    }
}

/// A failure travelling outward through escalation procedures
///
/// Cheap to clone; the underlying error is shared.
#[derive(Clone)]
pub struct Escalation {
    kind: EscalationKind,
    error: Arc<dyn Error + Send + Sync>,
}

impl Escalation {
    pub fn new(
        kind: impl Into<EscalationKind>,
        error: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind: kind.into(),
            error: Arc::from(error.into()),
        }
    }

    /// Business failure with the default `failure` kind
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(kinds::FAILURE, message.into())
    }

    pub fn kind(&self) -> &EscalationKind {
        &self.kind
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.error
    }

    /// Recover the concrete error that was escalated
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    pub fn is_a(&self, kind: &str) -> bool {
        self.kind.is_a(&EscalationKind::new(kind))
    }
}

impl fmt::Debug for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Escalation")
            .field("kind", &self.kind.as_str())
            .field("error", &self.error.to_string())
            .finish()
    }
}

impl fmt::Display for Escalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

impl Error for Escalation {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.error())
    }
}

/// Ordered (kind -> handler) pairs consulted for one scope
///
/// Handlers are matched in declaration order; the first whose key the
/// escalation is-a wins, so specific kinds must be declared before their
/// ancestors to take effect.
#[derive(Debug, Clone)]
pub struct EscalationProcedure<H> {
    handlers: Vec<(EscalationKind, H)>,
}

impl<H> EscalationProcedure<H> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: impl Into<EscalationKind>, handler: H) {
        self.handlers.push((kind.into(), handler));
    }

    pub fn find(&self, kind: &EscalationKind) -> Option<&H> {
        self.handlers
            .iter()
            .find(|(key, _)| kind.is_a(key))
            .map(|(_, handler)| handler)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EscalationKind, &H)> {
        self.handlers.iter().map(|(k, h)| (k, h))
    }

    /// Convert handler references, preserving order
    pub fn map<T>(self, mut f: impl FnMut(H) -> T) -> EscalationProcedure<T> {
        EscalationProcedure {
            handlers: self
                .handlers
                .into_iter()
                .map(|(kind, handler)| (kind, f(handler)))
                .collect(),
        }
    }
}

impl<H> Default for EscalationProcedure<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
