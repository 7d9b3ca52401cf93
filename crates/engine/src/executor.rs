// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread chain executor
//!
//! Runs the states of one thread chain in order until the chain is empty,
//! parks on a loading resource, or moves to another team. Locks are never
//! held across resource, administration, governance, or function code.

use crate::administration::AdministrationContext;
use crate::container::{ContainerKey, FunctionKey, Parked, ResourceHandle, ScopeKey, Settled};
use crate::escalation::{resolve, Frame, Origin, Resolution};
use crate::function::{FlowRequests, FunctionContext};
use crate::meta::OfficeMeta;
use crate::process::ProcessData;
use crate::spawn::{finish_thread, spawn_flow};
use crate::state::{Activation, AdminPhase, BodyOutcome, FunctionState, Step, ThreadChain};
use floor_core::{
    kinds, CompletionSink, Escalation, GovernanceAction, GovernanceError, Instigation, Job,
    LoadContext, Object, ResourceError, ResourceIndex, ResourceStatus,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Where a chain is currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Worker {
    /// A thread outside every team: an invoker or a completion signal
    Foreign,
    /// Already running work that needs no particular team
    Inline,
    Team(usize),
}

/// Run `chain` until it completes, parks, or is handed to another team
pub(crate) fn run_chain(mut chain: ThreadChain, mut worker: Worker) {
    let office = Arc::clone(&chain.process.office);
    loop {
        if chain.failure.is_none() && chain.process.is_cancelled() {
            cancel(&mut chain);
        }
        let Some(state) = chain.pending.front() else {
            if deactivate_governance(&mut chain, &office.meta) {
                continue;
            }
            break;
        };
        match (step_team(&office.meta, state), worker) {
            (Some(team), Worker::Team(current)) if team == current => {}
            (Some(team), _) => return assign(chain, team),
            (None, Worker::Foreign) => match office.meta.default_team {
                Some(team) => return assign(chain, team),
                None => worker = Worker::Inline,
            },
            (None, _) => {}
        }
        let Some(state) = chain.pending.pop_front() else {
            break;
        };
        match execute(chain, state) {
            Some(next) => chain = next,
            None => return,
        }
    }
    finish_thread(chain);
}

/// Resume chains released by a settled container
pub(crate) fn dispatch(chains: Vec<ThreadChain>) {
    for chain in chains {
        run_chain(chain, Worker::Foreign);
    }
}

pub(crate) fn release(settled: Settled<ThreadChain>) {
    match settled {
        Settled::Pending => {}
        Settled::Loaded(waiters) | Settled::Failed(_, waiters) => dispatch(waiters),
    }
}

fn step_team(meta: &OfficeMeta, state: &FunctionState) -> Option<usize> {
    let function_team = || {
        state
            .activation
            .as_ref()
            .and_then(|a| meta.functions[a.function].team)
    };
    match &state.step {
        Step::Activate { function, .. } => meta.functions[*function].team,
        Step::Governance { governance, .. } => meta
            .governances
            .get(*governance)
            .and_then(|g| g.team)
            .or_else(function_team),
        _ => function_team(),
    }
}

fn assign(chain: ThreadChain, team: usize) {
    let office = Arc::clone(&chain.process.office);
    let member = &office.meta.teams[team];
    let name = job_name(&chain, &office.meta);
    let process = chain.process.id.clone();

    let slot = Arc::new(Mutex::new(Some(chain)));
    let job_slot = Arc::clone(&slot);
    let mut job = Job::new(name, move || {
        let chain = job_slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(chain) = chain {
            run_chain(chain, Worker::Team(team));
        }
    })
    .for_process(process);
    if member.capabilities.thread_local_aware {
        job = floor_teams::with_hooks(job, Arc::clone(&office.hooks));
    }

    tracing::debug!(team = %member.name, job = job.name(), "assigning job");
    if let Err(e) = member.team.assign_job(job) {
        let chain = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut chain) = chain {
            tracing::error!(team = %member.name, error = %e, "team rejected job");
            unhandled(&mut chain, Escalation::new(kinds::TEAM, e));
            finish_thread(chain);
        }
    }
}

fn job_name(chain: &ThreadChain, meta: &OfficeMeta) -> String {
    let function = chain.pending.front().and_then(|state| match &state.step {
        Step::Activate { function, .. } => Some(*function),
        _ => state.activation.as_ref().map(|a| a.function),
    });
    match function {
        Some(f) => format!("{}/{}", meta.functions[f].name, chain.thread.0),
        None => format!("thread/{}", chain.thread.0),
    }
}

fn cancel(chain: &mut ThreadChain) {
    let escalation = chain.process.cancellation();
    let dropped = chain.abandon();
    tracing::info!(process = %chain.process.id, thread = chain.thread.0, dropped, "thread cancelled");
    chain.process.lock().fail(&escalation);
    chain.failure = Some(escalation);
}

/// Schedule deactivation of governance still active at thread end
fn deactivate_governance(chain: &mut ThreadChain, meta: &OfficeMeta) -> bool {
    let action = match chain.failure {
        Some(_) => GovernanceAction::Disregard,
        None => meta.settings.governance_deactivation.action(),
    };
    let mut states = Vec::new();
    for container in chain.governance.iter_mut().filter(|g| g.is_active()) {
        match container.request(action) {
            Ok(Some(step)) => states.push(FunctionState::governance(
                step.governance,
                step.action,
                None,
            )),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "cannot deactivate governance"),
        }
    }
    let scheduled = !states.is_empty();
    chain.push_front_all(states);
    scheduled
}

fn execute(mut chain: ThreadChain, state: FunctionState) -> Option<ThreadChain> {
    let FunctionState { step, activation } = state;
    let result = match step {
        Step::Activate {
            function,
            parameter,
            enclosing,
            office_escalation,
        } => {
            activate(&mut chain, function, parameter, enclosing, office_escalation);
            Ok(())
        }
        Step::Load(index) => return load(chain, index, activation),
        Step::Governance { governance, action } => {
            govern(&mut chain, governance, action, activation.as_ref())
        }
        Step::Administer { phase, index } => match &activation {
            Some(a) => administer(&mut chain, a, phase, index),
            None => Err(detached("administration")),
        },
        Step::Body => match &activation {
            Some(a) => body(&mut chain, a),
            None => Err(detached("function body")),
        },
        Step::Complete => match &activation {
            Some(a) => complete(&mut chain, a),
            None => Ok(()),
        },
    };
    if let Err(escalation) = result {
        escalate(&mut chain, activation.as_ref(), escalation);
    }
    Some(chain)
}

/// Run code supplied to the office, escalating a panic as `failure.panic`
fn guarded<T>(
    name: &str,
    work: impl FnOnce() -> Result<T, Escalation>,
) -> Result<T, Escalation> {
    catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|panic| {
        Err(Escalation::new(
            kinds::PANIC,
            format!("{name} panicked: {}", panicked(panic.as_ref())),
        ))
    })
}

fn panicked(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn detached(what: &str) -> Escalation {
    Escalation::failure(format!("{what} scheduled outside a function activation"))
}

fn activate(
    chain: &mut ThreadChain,
    function: usize,
    parameter: Option<Object>,
    enclosing: Option<Arc<Frame>>,
    office_escalation: bool,
) {
    let office = Arc::clone(&chain.process.office);
    let meta = &office.meta.functions[function];
    let scope = chain.process.lock().next_function();
    let activation = Arc::new(Activation {
        function,
        scope,
        parameter,
        enclosing,
        office_escalation,
        outcome: Mutex::new(None),
    });
    tracing::debug!(process = %chain.process.id, function = %meta.name, "function activated");

    let mut states: Vec<FunctionState> = meta
        .load_order
        .iter()
        .map(|index| FunctionState::within(&activation, Step::Load(*index)))
        .collect();
    states.extend((0..meta.pre_administration.len()).map(|index| {
        FunctionState::within(
            &activation,
            Step::Administer {
                phase: AdminPhase::Pre,
                index,
            },
        )
    }));
    states.push(FunctionState::within(&activation, Step::Body));
    states.extend((0..meta.post_administration.len()).map(|index| {
        FunctionState::within(
            &activation,
            Step::Administer {
                phase: AdminPhase::Post,
                index,
            },
        )
    }));
    states.push(FunctionState::within(&activation, Step::Complete));
    chain.push_front_all(states);
}

/// Park `chain` on a loading container, or hand it back if it settled
fn park(
    mut data: MutexGuard<'_, ProcessData>,
    key: ContainerKey,
    chain: ThreadChain,
) -> Option<ThreadChain> {
    match data.registry.park(key, chain) {
        Parked::Waiting => {
            tracing::debug!(resource = %key.index(), "waiting on resource");
            None
        }
        Parked::Ready(chain) | Parked::Failed(_, chain) => Some(chain),
    }
}

fn load(
    mut chain: ThreadChain,
    index: ResourceIndex,
    activation: Option<Arc<Activation>>,
) -> Option<ThreadChain> {
    let process = Arc::clone(&chain.process);
    let office = Arc::clone(&process.office);
    let function = activation.as_ref().map(|a| a.scope);
    let key = match ContainerKey::resolve(chain.thread, function, index) {
        Ok(key) => key,
        Err(e) => {
            escalate(&mut chain, activation.as_ref(), e.into());
            return Some(chain);
        }
    };
    let Some(resource) = office.meta.resource(index) else {
        escalate(
            &mut chain,
            activation.as_ref(),
            ResourceError::NotBound { index }.into(),
        );
        return Some(chain);
    };
    let state = FunctionState {
        step: Step::Load(index),
        activation: activation.clone(),
    };

    {
        let data = process.lock();
        if let Some(error) = data.registry.failure(key) {
            drop(data);
            escalate(&mut chain, activation.as_ref(), error.into());
            return Some(chain);
        }
        match data.registry.status(key) {
            ResourceStatus::Loaded => return Some(chain),
            ResourceStatus::Loading => {
                chain.pending.push_front(state);
                return park(data, key, chain);
            }
            ResourceStatus::Unloaded | ResourceStatus::Failed => {}
        }
    }

    let created = catch_unwind(AssertUnwindSafe(|| resource.source.create())).unwrap_or_else(|panic| {
        Err(ResourceError::Instantiate {
            resource: resource.name.clone(),
            reason: panicked(panic.as_ref()),
        })
    });
    let instance = match created {
        Ok(instance) => instance,
        Err(e) => {
            escalate(&mut chain, activation.as_ref(), e.into());
            return Some(chain);
        }
    };

    let (generation, handle, dependencies) = {
        let mut data = process.lock();
        if data.registry.is_bound(key) {
            // Bound by a concurrent thread of the same process
            drop(data);
            drop(instance);
            chain.pending.push_front(state);
            return Some(chain);
        }
        let dependencies: Result<Vec<ResourceHandle>, ResourceError> = resource
            .dependencies
            .iter()
            .map(|dependency| {
                let dependency = ContainerKey::resolve(chain.thread, function, *dependency)?;
                data.registry.loaded_handle(dependency)
            })
            .collect();
        let begun = dependencies.and_then(|dependencies| {
            data.registry.bind(key, resource.name.clone(), instance)?;
            let (generation, handle) =
                data.registry
                    .begin_loading(key, office.clock.now(), resource.timeout)?;
            Ok((generation, handle, dependencies))
        });
        match begun {
            Ok(begun) => begun,
            Err(e) => {
                drop(data);
                escalate(&mut chain, activation.as_ref(), e.into());
                return Some(chain);
            }
        }
    };

    let objects: Vec<Object> = dependencies
        .iter()
        .map(|d| d.lock().unwrap_or_else(|e| e.into_inner()).object())
        .collect();
    let signalled = Arc::clone(&process);
    let sink: CompletionSink = Box::new(move |result| {
        let settled = signalled.lock().registry.signal(key, generation, result)?;
        release(settled);
        Ok(())
    });

    let mut context = LoadContext::new(resource.name.clone(), objects, sink);
    let start = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| {
        handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .load(&mut context)
    }))
    .unwrap_or_else(|panic| {
        Err(ResourceError::Load {
            resource: resource.name.clone(),
            reason: panicked(panic.as_ref()),
        })
    });
    let asynchronous = context.is_asynchronous();
    drop(context);
    tracing::debug!(
        resource = %resource.name,
        asynchronous,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "load returned"
    );

    let mut data = process.lock();
    match data.registry.returned(key, generation, result, asynchronous) {
        Settled::Loaded(waiters) => {
            drop(data);
            dispatch(waiters);
            Some(chain)
        }
        Settled::Failed(error, waiters) => {
            drop(data);
            dispatch(waiters);
            escalate(&mut chain, activation.as_ref(), error.into());
            Some(chain)
        }
        Settled::Pending => {
            chain.pending.push_front(state);
            park(data, key, chain)
        }
    }
}

/// Handles of LOADED containers for `resources`
fn loaded_handles(
    chain: &ThreadChain,
    function: Option<FunctionKey>,
    resources: &[ResourceIndex],
) -> Result<Vec<(ResourceIndex, ResourceHandle)>, ResourceError> {
    let data = chain.process.lock();
    resources
        .iter()
        .map(|&index| {
            let key = ContainerKey::resolve(chain.thread, function, index)?;
            Ok((index, data.registry.loaded_handle(key)?))
        })
        .collect()
}

fn resource_name(meta: &OfficeMeta, index: ResourceIndex) -> String {
    meta.resource(index)
        .map_or_else(|| index.to_string(), |r| r.name.clone())
}

fn administer(
    chain: &mut ThreadChain,
    activation: &Arc<Activation>,
    phase: AdminPhase,
    index: usize,
) -> Result<(), Escalation> {
    let process = Arc::clone(&chain.process);
    let office = Arc::clone(&process.office);
    let function = &office.meta.functions[activation.function];
    let duties = match phase {
        AdminPhase::Pre => &function.pre_administration,
        AdminPhase::Post => &function.post_administration,
    };
    let admin = duties.get(index).ok_or_else(|| {
        Escalation::failure(format!("{} has no administration {index}", function.name))
    })?;

    let extension = admin.source.extension();
    let mut extensions = Vec::with_capacity(admin.resources.len());
    for (index, handle) in loaded_handles(chain, Some(activation.scope), &admin.resources)? {
        let view = handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extension(extension);
        extensions.push(view.ok_or_else(|| ResourceError::ExtensionUnavailable {
            resource: resource_name(&office.meta, index),
            extension: extension.to_string(),
        })?);
    }

    let mut duty = guarded(&admin.name, || admin.source.create())?;
    let flows = FlowRequests::new(admin.name.clone(), admin.flows.clone(), Arc::clone(&process));
    let mut context =
        AdministrationContext::new(extensions, &mut chain.governance, &admin.governance, flows);
    let span = tracing::info_span!("administration", name = %admin.name, function = %function.name);
    let result = span.in_scope(|| guarded(&admin.name, || duty.administer(&mut context)));
    let (actions, requests) = context.finish();
    result?;

    let mut states: Vec<FunctionState> = actions
        .into_iter()
        .map(|step| FunctionState::governance(step.governance, step.action, Some(Arc::clone(activation))))
        .collect();
    for request in requests {
        if request.flow.instigation == Instigation::Sequential {
            states.push(FunctionState::activate(
                request.flow.function,
                request.parameter,
                Some(Frame::new(activation.function, activation.enclosing.clone())),
                activation.office_escalation,
            ));
        } else {
            spawn_flow(&process, activation, request);
        }
    }
    chain.push_front_all(states);
    Ok(())
}

fn body(chain: &mut ThreadChain, activation: &Arc<Activation>) -> Result<(), Escalation> {
    let process = Arc::clone(&chain.process);
    let office = Arc::clone(&process.office);
    let function = &office.meta.functions[activation.function];
    let objects = loaded_handles(chain, Some(activation.scope), &function.objects)?
        .into_iter()
        .map(|(_, handle)| handle)
        .collect();
    let mut context = FunctionContext::new(
        function.name.clone(),
        Arc::clone(&process),
        objects,
        activation.parameter.clone(),
        function.flows.clone(),
    );

    let span = tracing::info_span!("function", name = %function.name, process = %process.id);
    let result = span.in_scope(|| {
        tracing::info!("executing");
        let start = Instant::now();
        let result = guarded(&function.name, || function.body.execute(&mut context));
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(elapsed_ms, "completed"),
            Err(e) => tracing::warn!(elapsed_ms, kind = %e.kind(), error = %e.error(), "failed"),
        }
        result
    });

    let mut sequential = Vec::new();
    for request in context.into_requests() {
        if request.flow.instigation == Instigation::Sequential {
            sequential.push((request.flow.function, request.parameter));
        } else {
            spawn_flow(&process, activation, request);
        }
    }

    let next_argument = result?;
    *activation.outcome.lock().unwrap_or_else(|e| e.into_inner()) = Some(BodyOutcome {
        sequential,
        next_argument,
    });
    Ok(())
}

fn complete(chain: &mut ThreadChain, activation: &Arc<Activation>) -> Result<(), Escalation> {
    let office = Arc::clone(&chain.process.office);
    let function = &office.meta.functions[activation.function];
    let released = chain
        .process
        .lock()
        .registry
        .release(ScopeKey::Function(chain.thread, activation.scope));
    drop(released);

    let outcome = activation
        .outcome
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take()
        .unwrap_or_default();
    let frame = Frame::new(activation.function, activation.enclosing.clone());
    let mut states: Vec<FunctionState> = outcome
        .sequential
        .into_iter()
        .map(|(target, parameter)| {
            FunctionState::activate(
                target,
                parameter,
                Some(Arc::clone(&frame)),
                activation.office_escalation,
            )
        })
        .collect();

    if let Some(next) = function.next {
        let target = &office.meta.functions[next];
        if let Some(expected) = &target.parameter {
            if !expected.check(outcome.next_argument.as_ref()) {
                return Err(Escalation::new(
                    "flow.parameter",
                    format!(
                        "{} passes the wrong argument type to {} (expected {})",
                        function.name, target.name, expected.name
                    ),
                ));
            }
        }
        states.push(FunctionState::activate(
            next,
            outcome.next_argument,
            activation.enclosing.clone(),
            activation.office_escalation,
        ));
    }

    tracing::debug!(function = %function.name, continuations = states.len(), "function complete");
    chain.push_front_all(states);
    Ok(())
}

fn govern(
    chain: &mut ThreadChain,
    governance: usize,
    action: GovernanceAction,
    activation: Option<&Arc<Activation>>,
) -> Result<(), Escalation> {
    let office = Arc::clone(&chain.process.office);
    let meta = office
        .meta
        .governances
        .get(governance)
        .ok_or(GovernanceError::UnknownIndex { index: governance })?;
    let function = activation.map(|a| a.scope);

    match action {
        GovernanceAction::Activate => {
            let unloaded: Vec<ResourceIndex> = {
                let data = chain.process.lock();
                meta.resources
                    .iter()
                    .filter(|&&index| {
                        ContainerKey::resolve(chain.thread, function, index)
                            .map_or(true, |key| data.registry.status(key) != ResourceStatus::Loaded)
                    })
                    .copied()
                    .collect()
            };
            if !unloaded.is_empty() {
                // Load governed resources first, then activate again
                let mut states: Vec<FunctionState> = unloaded
                    .iter()
                    .filter_map(|index| office.meta.resource(*index))
                    .flat_map(|resource| resource.load_order.iter())
                    .map(|index| FunctionState {
                        step: Step::Load(*index),
                        activation: activation.cloned(),
                    })
                    .collect();
                states.push(FunctionState::governance(
                    governance,
                    action,
                    activation.cloned(),
                ));
                chain.push_front_all(states);
                return Ok(());
            }

            let extension = meta.source.extension();
            let mut instance = guarded(&meta.name, || meta.source.create())?;
            for (index, handle) in loaded_handles(chain, function, &meta.resources)? {
                let view = handle
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .extension(extension);
                let view = view.ok_or_else(|| ResourceError::ExtensionUnavailable {
                    resource: resource_name(&office.meta, index),
                    extension: extension.to_string(),
                })?;
                guarded(&meta.name, || instance.govern(view))?;
            }
            let container = chain
                .governance
                .get_mut(governance)
                .ok_or(GovernanceError::UnknownIndex { index: governance })?;
            container.activated(instance);
        }
        GovernanceAction::Enforce | GovernanceAction::Disregard => {
            let container = chain
                .governance
                .get_mut(governance)
                .ok_or(GovernanceError::UnknownIndex { index: governance })?;
            if let Some(mut instance) = container.finish(action) {
                guarded(&meta.name, || match action {
                    GovernanceAction::Enforce => instance.enforce(),
                    _ => instance.disregard(),
                })?;
            }
        }
    }
    tracing::debug!(governance = %meta.name, action = action.as_str(), "governance");
    Ok(())
}

/// Route an escalation to its handler, the thread callback, or the default handler
pub(crate) fn escalate(
    chain: &mut ThreadChain,
    activation: Option<&Arc<Activation>>,
    escalation: Escalation,
) {
    let office = Arc::clone(&chain.process.office);
    let dropped = chain.abandon();
    tracing::warn!(
        process = %chain.process.id,
        kind = %escalation.kind(),
        error = %escalation.error(),
        dropped,
        "escalation"
    );

    let has_callback = chain
        .process
        .lock()
        .threads
        .get(&chain.thread)
        .is_some_and(|t| t.callback.is_some());
    let origin = Origin {
        function: activation.map(|a| (a.function, &a.enclosing)),
        office_escalation: activation.is_some_and(|a| a.office_escalation),
        has_callback,
    };
    let resolution = resolve(
        escalation.kind(),
        origin,
        |f| &office.meta.functions[f].escalation,
        &office.meta.escalation,
    );
    match resolution {
        Resolution::Handler {
            function,
            enclosing,
            office_escalation,
        } => {
            tracing::debug!(handler = %office.meta.functions[function].name, "escalation handled");
            let parameter: Object = Arc::new(escalation);
            chain.pending.push_front(FunctionState::activate(
                function,
                Some(parameter),
                enclosing,
                office_escalation,
            ));
        }
        Resolution::Callback => chain.failure = Some(escalation),
        Resolution::Unhandled => unhandled(chain, escalation),
    }
}

/// Report through the default handler and end the thread
fn unhandled(chain: &mut ThreadChain, escalation: Escalation) {
    let process = Arc::clone(&chain.process);
    process.office.handler.handle(&process.id, &escalation);
    process.lock().fail(&escalation);
    chain.abandon();
    chain.failure = Some(escalation);
}
