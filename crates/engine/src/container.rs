// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed resource containers of one process
//!
//! Containers are stored in an arena keyed by scope and slot. A container
//! leaves LOADING only once `load` has returned AND exactly one completion
//! signal has arrived (a synchronous load counts as its own signal), or when
//! its deadline passes. Work waiting on a loading container is parked here
//! and handed back when the container settles.

use floor_core::{ManagedResource, ResourceError, ResourceIndex, ResourceStatus, SignalError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Shared handle to a resource instance; never locked while the process is
pub(crate) type ResourceHandle = Arc<Mutex<Box<dyn ManagedResource>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ThreadKey(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct FunctionKey(pub u64);

/// Live scope instance owning containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ScopeKey {
    Process,
    Thread(ThreadKey),
    Function(ThreadKey, FunctionKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ContainerKey {
    pub scope: ScopeKey,
    pub slot: usize,
}

impl ContainerKey {
    /// Key of `index` as seen from a thread and, for function scope, an activation
    pub fn resolve(
        thread: ThreadKey,
        function: Option<FunctionKey>,
        index: ResourceIndex,
    ) -> Result<Self, ResourceError> {
        let scope = match index.scope {
            floor_core::ResourceScope::Process => ScopeKey::Process,
            floor_core::ResourceScope::Thread => ScopeKey::Thread(thread),
            floor_core::ResourceScope::Function => ScopeKey::Function(
                thread,
                function.ok_or(ResourceError::NotBound { index })?,
            ),
        };
        Ok(Self {
            scope,
            slot: index.slot,
        })
    }

    pub fn index(&self) -> ResourceIndex {
        let scope = match self.scope {
            ScopeKey::Process => floor_core::ResourceScope::Process,
            ScopeKey::Thread(_) => floor_core::ResourceScope::Thread,
            ScopeKey::Function(..) => floor_core::ResourceScope::Function,
        };
        ResourceIndex::new(scope, self.slot)
    }
}

enum LoadState<W> {
    Unloaded,
    Loading {
        deadline: Instant,
        timeout: Duration,
        returned: bool,
        signal: Option<Result<(), ResourceError>>,
        waiters: Vec<W>,
    },
    Loaded,
    Failed(ResourceError),
}

struct Container<W> {
    name: String,
    handle: ResourceHandle,
    generation: u64,
    state: LoadState<W>,
}

/// Outcome of parking work on a container
pub(crate) enum Parked<W> {
    Waiting,
    Ready(W),
    Failed(ResourceError, W),
}

/// Waiters released when a container leaves LOADING
pub(crate) enum Settled<W> {
    Pending,
    Loaded(Vec<W>),
    Failed(ResourceError, Vec<W>),
}

/// A container failed by its deadline, with the work that was waiting on it
pub(crate) struct Expired<W> {
    pub key: ContainerKey,
    pub error: ResourceError,
    pub waiters: Vec<W>,
}

pub(crate) struct ResourceRegistry<W> {
    containers: HashMap<ContainerKey, Container<W>>,
    next_generation: u64,
}

impl<W> ResourceRegistry<W> {
    pub fn new() -> Self {
        Self {
            containers: HashMap::new(),
            next_generation: 1,
        }
    }

    /// Bind a fresh resource instance; a key is bound at most once per scope
    pub fn bind(
        &mut self,
        key: ContainerKey,
        name: impl Into<String>,
        resource: Box<dyn ManagedResource>,
    ) -> Result<(), ResourceError> {
        if self.containers.contains_key(&key) {
            return Err(ResourceError::AlreadyBound { index: key.index() });
        }
        self.containers.insert(
            key,
            Container {
                name: name.into(),
                handle: Arc::new(Mutex::new(resource)),
                generation: 0,
                state: LoadState::Unloaded,
            },
        );
        Ok(())
    }

    pub fn status(&self, key: ContainerKey) -> ResourceStatus {
        match self.containers.get(&key).map(|c| &c.state) {
            None | Some(LoadState::Unloaded) => ResourceStatus::Unloaded,
            Some(LoadState::Loading { .. }) => ResourceStatus::Loading,
            Some(LoadState::Loaded) => ResourceStatus::Loaded,
            Some(LoadState::Failed(_)) => ResourceStatus::Failed,
        }
    }

    /// Error a FAILED container settled with
    pub fn failure(&self, key: ContainerKey) -> Option<ResourceError> {
        match self.containers.get(&key).map(|c| &c.state) {
            Some(LoadState::Failed(e)) => Some(e.clone()),
            _ => None,
        }
    }

    pub fn is_bound(&self, key: ContainerKey) -> bool {
        self.containers.contains_key(&key)
    }

    /// Handle of a LOADED container
    pub fn loaded_handle(&self, key: ContainerKey) -> Result<ResourceHandle, ResourceError> {
        let container = self
            .containers
            .get(&key)
            .ok_or(ResourceError::NotBound { index: key.index() })?;
        match &container.state {
            LoadState::Loaded => Ok(Arc::clone(&container.handle)),
            LoadState::Failed(e) => Err(e.clone()),
            _ => Err(ResourceError::Load {
                resource: container.name.clone(),
                reason: "not loaded".to_string(),
            }),
        }
    }

    /// Move an UNLOADED container to LOADING and return the load generation
    pub fn begin_loading(
        &mut self,
        key: ContainerKey,
        now: Instant,
        timeout: Duration,
    ) -> Result<(u64, ResourceHandle), ResourceError> {
        let generation = self.next_generation;
        let container = self
            .containers
            .get_mut(&key)
            .ok_or(ResourceError::NotBound { index: key.index() })?;
        if !matches!(container.state, LoadState::Unloaded) {
            return Err(ResourceError::Load {
                resource: container.name.clone(),
                reason: "load already started".to_string(),
            });
        }
        container.generation = generation;
        container.state = LoadState::Loading {
            deadline: now + timeout,
            timeout,
            returned: false,
            signal: None,
            waiters: Vec::new(),
        };
        self.next_generation += 1;
        Ok((generation, Arc::clone(&container.handle)))
    }

    /// Record that `load` returned
    ///
    /// A synchronous load is its own completion signal. A failed load fails
    /// the container immediately, even if a completion token is still out.
    pub fn returned(
        &mut self,
        key: ContainerKey,
        generation: u64,
        result: Result<(), ResourceError>,
        asynchronous: bool,
    ) -> Settled<W> {
        let Some(container) = self.current(key, generation) else {
            return Settled::Pending;
        };
        let LoadState::Loading {
            returned, signal, ..
        } = &mut container.state
        else {
            return Settled::Pending;
        };
        *returned = true;
        match result {
            Err(e) => fail(container, e),
            Ok(()) => {
                if !asynchronous {
                    *signal = Some(Ok(()));
                }
                settle(container)
            }
        }
    }

    /// Record the completion signal of an asynchronous load
    pub fn signal(
        &mut self,
        key: ContainerKey,
        generation: u64,
        result: Result<(), ResourceError>,
    ) -> Result<Settled<W>, SignalError> {
        let resource = self
            .containers
            .get(&key)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| key.index().to_string());
        let Some(container) = self.current(key, generation) else {
            return Err(SignalError::Stale { resource });
        };
        match &mut container.state {
            LoadState::Loading { signal: None, .. } => {}
            LoadState::Failed(_) => return Err(SignalError::AlreadyFailed { resource }),
            _ => return Err(SignalError::Duplicate { resource }),
        }
        if let LoadState::Loading { signal, .. } = &mut container.state {
            *signal = Some(result);
        }
        Ok(settle(container))
    }

    /// Park work until the container settles, or hand it straight back
    pub fn park(&mut self, key: ContainerKey, waiter: W) -> Parked<W> {
        let Some(container) = self.containers.get_mut(&key) else {
            return Parked::Failed(ResourceError::NotBound { index: key.index() }, waiter);
        };
        match &mut container.state {
            LoadState::Loading { waiters, .. } => {
                waiters.push(waiter);
                Parked::Waiting
            }
            LoadState::Loaded => Parked::Ready(waiter),
            LoadState::Failed(e) => Parked::Failed(e.clone(), waiter),
            LoadState::Unloaded => Parked::Failed(
                ResourceError::Load {
                    resource: container.name.clone(),
                    reason: "load was never started".to_string(),
                },
                waiter,
            ),
        }
    }

    /// Fail every LOADING container whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> Vec<Expired<W>> {
        let mut expired = Vec::new();
        for (key, container) in self.containers.iter_mut() {
            let timeout = match &container.state {
                LoadState::Loading {
                    deadline, timeout, ..
                } if *deadline <= now => *timeout,
                _ => continue,
            };
            let error = ResourceError::Timeout {
                resource: container.name.clone(),
                timeout,
            };
            if let Settled::Failed(error, waiters) = fail(container, error) {
                expired.push(Expired {
                    key: *key,
                    error,
                    waiters,
                });
            }
        }
        expired
    }

    /// Unbind the containers of one scope instance
    ///
    /// Returns the released handles so the caller can drop them unlocked.
    pub fn release(&mut self, scope: ScopeKey) -> Vec<ResourceHandle> {
        self.release_where(|s| s == scope)
    }

    /// Unbind a thread's containers and those of its function scopes
    pub fn release_thread(&mut self, thread: ThreadKey) -> Vec<ResourceHandle> {
        self.release_where(|s| match s {
            ScopeKey::Thread(t) | ScopeKey::Function(t, _) => t == thread,
            ScopeKey::Process => false,
        })
    }

    pub fn release_all(&mut self) -> Vec<ResourceHandle> {
        self.release_where(|_| true)
    }

    fn release_where(&mut self, matches: impl Fn(ScopeKey) -> bool) -> Vec<ResourceHandle> {
        let keys: Vec<_> = self
            .containers
            .keys()
            .filter(|k| matches(k.scope))
            .copied()
            .collect();
        keys.into_iter()
            .filter_map(|k| self.containers.remove(&k))
            .map(|c| c.handle)
            .collect()
    }

    fn current(&mut self, key: ContainerKey, generation: u64) -> Option<&mut Container<W>> {
        self.containers
            .get_mut(&key)
            .filter(|c| c.generation == generation)
    }
}

fn settle<W>(container: &mut Container<W>) -> Settled<W> {
    let ready = matches!(
        &container.state,
        LoadState::Loading {
            returned: true,
            signal: Some(_),
            ..
        }
    );
    if !ready {
        return Settled::Pending;
    }
    let state = std::mem::replace(&mut container.state, LoadState::Loaded);
    match state {
        LoadState::Loading {
            signal: Some(Err(e)),
            waiters,
            ..
        } => {
            container.state = LoadState::Failed(e.clone());
            Settled::Failed(e, waiters)
        }
        LoadState::Loading { waiters, .. } => Settled::Loaded(waiters),
        other => {
            container.state = other;
            Settled::Pending
        }
    }
}

fn fail<W>(container: &mut Container<W>, error: ResourceError) -> Settled<W> {
    let state = std::mem::replace(&mut container.state, LoadState::Failed(error.clone()));
    match state {
        LoadState::Loading { waiters, .. } => Settled::Failed(error, waiters),
        other => {
            container.state = other;
            Settled::Pending
        }
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
