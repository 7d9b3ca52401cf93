// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed resource contracts
//!
//! A managed resource is a scoped object whose creation, loading, and
//! dependency wiring the engine controls. Resources declare what they need in
//! [`ResourceSourceMetaData`]; the engine hands resolved dependencies to
//! [`ManagedResource::load`] through a [`LoadContext`].
//!
//! Loading is synchronous unless the resource takes the context's single
//! [`CompletionToken`], in which case the load stays pending until the token
//! is completed, failed, or dropped.

use crate::escalation::{kinds, Escalation};
use crate::flow::ExecuteContext;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Value a resource exposes to the functions and resources depending on it
pub type Object = Arc<dyn Any + Send + Sync>;

/// Lifetime scope of a managed resource, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceScope {
    Process,
    Thread,
    Function,
}

impl ResourceScope {
    /// True when a resource in `inner` may depend on a resource in this scope
    pub fn encloses(self, inner: ResourceScope) -> bool {
        self <= inner
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceScope::Process => "process",
            ResourceScope::Thread => "thread",
            ResourceScope::Function => "function",
        }
    }
}

/// Identifies a managed resource by its scope and slot within that scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceIndex {
    pub scope: ResourceScope,
    pub slot: usize,
}

impl ResourceIndex {
    pub fn new(scope: ResourceScope, slot: usize) -> Self {
        Self { scope, slot }
    }
}

impl fmt::Display for ResourceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.scope.as_str(), self.slot)
    }
}

/// Load status of a managed resource container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Failures of the resource lifecycle, escalated to the awaiting function
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("failed to instantiate {resource}: {reason}")]
    Instantiate { resource: String, reason: String },
    #[error("failed to load {resource}: {reason}")]
    Load { resource: String, reason: String },
    #[error("{resource} did not finish loading within {timeout:?}")]
    Timeout { resource: String, timeout: Duration },
    #[error("{resource} requested asynchronous completion more than once for a single load")]
    DuplicateAsync { resource: String },
    #[error("{resource} dropped its completion token without completing")]
    Abandoned { resource: String },
    #[error("{index} is already bound")]
    AlreadyBound { index: ResourceIndex },
    #[error("{index} is not bound")]
    NotBound { index: ResourceIndex },
    #[error("{resource} has no dependency {index}")]
    NoDependency { resource: String, index: usize },
    #[error("{resource} does not provide extension {extension}")]
    ExtensionUnavailable { resource: String, extension: String },
    #[error("object of {resource} is not a {expected}")]
    ObjectType {
        resource: String,
        expected: &'static str,
    },
}

impl ResourceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceError::Instantiate { .. } => "resource.instantiate",
            ResourceError::Load { .. } => "resource.load",
            ResourceError::Timeout { .. } => kinds::RESOURCE_TIMEOUT,
            ResourceError::DuplicateAsync { .. } => "resource.duplicate_completion",
            ResourceError::Abandoned { .. } => "resource.abandoned",
            ResourceError::AlreadyBound { .. } => "resource.bound",
            ResourceError::NotBound { .. } => "resource.unbound",
            ResourceError::NoDependency { .. } => "resource.dependency",
            ResourceError::ExtensionUnavailable { .. } => "resource.extension",
            ResourceError::ObjectType { .. } => "resource.type",
        }
    }
}

impl From<ResourceError> for Escalation {
    fn from(e: ResourceError) -> Self {
        Escalation::new(e.kind(), e)
    }
}

/// Defects in the completion protocol of an asynchronous load
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("{resource} signalled completion more than once for a single load")]
    Duplicate { resource: String },
    #[error("{resource} signalled completion after its load had already failed")]
    AlreadyFailed { resource: String },
    #[error("{resource} signalled completion for a load that is no longer current")]
    Stale { resource: String },
}

/// Receiver of the single completion signal of one asynchronous load
pub type CompletionSink =
    Box<dyn FnOnce(Result<(), ResourceError>) -> Result<(), SignalError> + Send>;

/// One-shot completion handle for an asynchronous load
///
/// Completing or failing consumes the token. Dropping it unsignalled fails the
/// load with [`ResourceError::Abandoned`].
pub struct CompletionToken {
    resource: String,
    sink: Option<CompletionSink>,
}

impl CompletionToken {
    pub fn new(resource: impl Into<String>, sink: CompletionSink) -> Self {
        Self {
            resource: resource.into(),
            sink: Some(sink),
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource
    }

    /// Signal that the load finished successfully
    pub fn complete(mut self) -> Result<(), SignalError> {
        self.signal(Ok(()))
    }

    /// Signal that the load failed
    pub fn fail(mut self, reason: impl Into<String>) -> Result<(), SignalError> {
        let error = ResourceError::Load {
            resource: self.resource.clone(),
            reason: reason.into(),
        };
        self.signal(Err(error))
    }

    fn signal(&mut self, result: Result<(), ResourceError>) -> Result<(), SignalError> {
        match self.sink.take() {
            Some(sink) => sink(result),
            None => Ok(()),
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            tracing::warn!(resource = %self.resource, "completion token dropped unsignalled");
            let abandoned = ResourceError::Abandoned {
                resource: self.resource.clone(),
            };
            if let Err(e) = sink(Err(abandoned)) {
                tracing::debug!(error = %e, "abandoned load was already settled");
            }
        }
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("resource", &self.resource)
            .field("pending", &self.sink.is_some())
            .finish()
    }
}

/// Context handed to [`ManagedResource::load`]
pub struct LoadContext {
    resource: String,
    dependencies: Vec<Object>,
    sink: Option<CompletionSink>,
    asynchronous: bool,
}

impl LoadContext {
    pub fn new(resource: impl Into<String>, dependencies: Vec<Object>, sink: CompletionSink) -> Self {
        Self {
            resource: resource.into(),
            dependencies,
            sink: Some(sink),
            asynchronous: false,
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource
    }

    /// Resolved object of the dependency declared at `index`
    pub fn dependency(&self, index: usize) -> Result<&Object, ResourceError> {
        self.dependencies
            .get(index)
            .ok_or_else(|| ResourceError::NoDependency {
                resource: self.resource.clone(),
                index,
            })
    }

    /// Resolved dependency downcast to its concrete type
    pub fn dependency_as<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ResourceError> {
        let object = Arc::clone(self.dependency(index)?);
        object
            .downcast::<T>()
            .map_err(|_| ResourceError::ObjectType {
                resource: self.resource.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Switch this load to asynchronous completion
    ///
    /// Only one token may be taken per load; a second request is a defect in
    /// the resource and fails the load.
    pub fn asynchronous(&mut self) -> Result<CompletionToken, ResourceError> {
        match self.sink.take() {
            Some(sink) => {
                self.asynchronous = true;
                Ok(CompletionToken::new(self.resource.clone(), sink))
            }
            None => Err(ResourceError::DuplicateAsync {
                resource: self.resource.clone(),
            }),
        }
    }

    pub fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    /// Build a load failure for this resource
    pub fn failure(&self, reason: impl Into<String>) -> ResourceError {
        ResourceError::Load {
            resource: self.resource.clone(),
            reason: reason.into(),
        }
    }
}

/// One managed resource instance
pub trait ManagedResource: Send {
    /// Object handed to dependants once loaded
    fn object(&self) -> Object;

    /// Load the resource from its resolved dependencies
    fn load(&mut self, _context: &mut LoadContext) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Extension view used by administration and governance
    fn extension(&self, _name: &str) -> Option<Object> {
        None
    }
}

/// What a resource source declares about the resources it produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSourceMetaData {
    pub object_type: String,
    /// Dependency slot names, in the order `LoadContext::dependency` indexes them
    pub dependencies: Vec<String>,
    pub extensions: Vec<String>,
    /// Maximum LOADING duration; the office default applies when unset
    pub timeout: Option<Duration>,
    /// Ask the office to bypass team oversight
    pub requires_no_oversight: bool,
}

impl ResourceSourceMetaData {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            ..Self::default()
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>) -> Self {
        self.extensions.push(name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_oversight(mut self) -> Self {
        self.requires_no_oversight = true;
        self
    }
}

/// Produces managed resources and participates in the office lifecycle
pub trait ManagedResourceSource: Send + Sync {
    fn meta_data(&self) -> ResourceSourceMetaData;

    /// Called when the office opens; the context may invoke new processes later
    fn start(&self, _context: Arc<dyn ExecuteContext>) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Called when the office closes
    fn stop(&self) {}

    /// Create one instance per binding
    fn create(&self) -> Result<Box<dyn ManagedResource>, ResourceError>;
}

/// Source of plain, synchronously loaded resources with no dependencies
pub struct ValueSource<F> {
    object_type: String,
    factory: F,
}

impl<F> ValueSource<F>
where
    F: Fn() -> Object + Send + Sync,
{
    pub fn new(object_type: impl Into<String>, factory: F) -> Self {
        Self {
            object_type: object_type.into(),
            factory,
        }
    }
}

struct ValueResource(Object);

impl ManagedResource for ValueResource {
    fn object(&self) -> Object {
        Arc::clone(&self.0)
    }
}

impl<F> ManagedResourceSource for ValueSource<F>
where
    F: Fn() -> Object + Send + Sync,
{
    fn meta_data(&self) -> ResourceSourceMetaData {
        ResourceSourceMetaData::new(self.object_type.clone())
    }

    fn create(&self) -> Result<Box<dyn ManagedResource>, ResourceError> {
        Ok(Box::new(ValueResource((self.factory)())))
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
