// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{FunctionContext, LifecycleError, OfficeBuilder};
use floor_core::{
    ExecuteContext, InvokeError, ManagedResource, ManagedResourceSource, Object, ResourceError,
    ResourceScope, ResourceSourceMetaData, Team, TeamError, ValueSource,
};
use floor_teams::{FakeTeam, TeamCall};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn noop(_: &mut FunctionContext) -> Result<Option<Object>, floor_core::Escalation> {
    Ok(None)
}

/// Source remembering the context it was started with
#[derive(Default)]
struct Trigger {
    context: Mutex<Option<Arc<dyn ExecuteContext>>>,
    started: AtomicUsize,
    stopped: AtomicUsize,
    fail_start: bool,
}

impl Trigger {
    fn invoke(&self, function: &str) -> Result<(), InvokeError> {
        let context = self
            .context
            .lock()
            .unwrap()
            .clone()
            .ok_or(InvokeError::NotOpen)?;
        context.invoke_process(function, None, None).map(|_| ())
    }
}

impl ManagedResourceSource for Trigger {
    fn meta_data(&self) -> ResourceSourceMetaData {
        ResourceSourceMetaData::new("trigger")
    }

    fn start(&self, context: Arc<dyn ExecuteContext>) -> Result<(), ResourceError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ResourceError::Instantiate {
                resource: "trigger".to_string(),
                reason: "port in use".to_string(),
            });
        }
        *self.context.lock().unwrap() = Some(context);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }

    fn create(&self) -> Result<Box<dyn ManagedResource>, ResourceError> {
        Err(ResourceError::Instantiate {
            resource: "trigger".to_string(),
            reason: "only used to invoke".to_string(),
        })
    }
}

struct Broken;

impl Team for Broken {
    fn start_working(&self) -> Result<(), TeamError> {
        Err(TeamError::Spawn {
            team: "broken".to_string(),
            reason: "no threads left".to_string(),
        })
    }

    fn assign_job(&self, _job: floor_core::Job) -> Result<(), TeamError> {
        Ok(())
    }

    fn stop_working(&self) {}
}

#[test]
fn invoke_before_open_is_rejected() {
    let mut builder = OfficeBuilder::new();
    builder.function("a", noop);
    let floor = builder.build().unwrap();

    assert_eq!(
        floor.office().invoke_process("a", None).unwrap_err(),
        InvokeError::NotOpen
    );
}

#[test]
fn open_twice_is_rejected() {
    let floor = OfficeBuilder::new().build().unwrap();
    floor.open().unwrap();
    assert!(floor.is_open());
    assert!(matches!(floor.open(), Err(LifecycleError::AlreadyOpen)));
}

#[test]
fn closed_floor_cannot_reopen_or_invoke() {
    let mut builder = OfficeBuilder::new();
    builder.function("a", noop);
    let floor = builder.build().unwrap();
    floor.open().unwrap();
    floor.close();
    floor.close();

    assert!(!floor.is_open());
    assert!(matches!(floor.open(), Err(LifecycleError::Closed)));
    assert_eq!(
        floor.office().invoke_process("a", None).unwrap_err(),
        InvokeError::Closed
    );
}

#[test]
fn teams_start_on_open_and_stop_on_close() {
    let team = FakeTeam::new("pool");
    let mut builder = OfficeBuilder::new();
    builder.team("pool", Arc::new(team.clone()));
    let floor = builder.build().unwrap();

    floor.open().unwrap();
    assert_eq!(team.calls(), vec![TeamCall::Start]);
    drop(floor);
    assert_eq!(team.calls(), vec![TeamCall::Start, TeamCall::Stop]);
}

#[test]
fn shared_source_starts_once_and_can_invoke() {
    let trigger = Arc::new(Trigger::default());
    let ran = Arc::new(AtomicUsize::new(0));
    let mut builder = OfficeBuilder::new();
    builder.resource("http", ResourceScope::Process, trigger.clone());
    builder.resource("https", ResourceScope::Process, trigger.clone());
    let counter = Arc::clone(&ran);
    builder.function("handle", move |_: &mut FunctionContext| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });
    let floor = builder.build().unwrap();

    floor.open().unwrap();
    assert_eq!(trigger.started.load(Ordering::SeqCst), 1);
    trigger.invoke("handle").unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_eq!(trigger.invoke("missing"), Err(InvokeError::UnknownFunction("missing".to_string())));

    floor.close();
    assert_eq!(trigger.stopped.load(Ordering::SeqCst), 1);
    assert_eq!(trigger.invoke("handle"), Err(InvokeError::Closed));
}

#[test]
fn failed_source_start_stops_earlier_sources() {
    let first = Arc::new(Trigger::default());
    let second = Arc::new(Trigger {
        fail_start: true,
        ..Trigger::default()
    });
    let mut builder = OfficeBuilder::new();
    builder.resource("first", ResourceScope::Process, first.clone());
    builder.resource("second", ResourceScope::Process, second.clone());
    let floor = builder.build().unwrap();

    let error = floor.open().unwrap_err();
    assert!(matches!(error, LifecycleError::ResourceSource { ref resource, .. } if resource == "second"));
    assert_eq!(first.stopped.load(Ordering::SeqCst), 1);
    assert_eq!(second.stopped.load(Ordering::SeqCst), 0);
    assert!(matches!(floor.open(), Err(LifecycleError::Closed)));
}

#[test]
fn failed_team_start_stops_everything_started() {
    let trigger = Arc::new(Trigger::default());
    let started = FakeTeam::new("started");
    let mut builder = OfficeBuilder::new();
    builder
        .team("started", Arc::new(started.clone()))
        .team("broken", Arc::new(Broken));
    builder.resource("trigger", ResourceScope::Process, trigger.clone());
    let floor = builder.build().unwrap();

    let error = floor.open().unwrap_err();
    assert!(matches!(error, LifecycleError::Team { ref team, .. } if team == "broken"));
    assert_eq!(started.calls(), vec![TeamCall::Start, TeamCall::Stop]);
    assert_eq!(trigger.stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn startup_functions_run_on_open() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ran);
    let mut builder = OfficeBuilder::new();
    builder.function("boot", move |_: &mut FunctionContext| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    });
    builder.function("idle", noop);
    builder.startup("boot");
    let floor = builder.build().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    floor.open().unwrap();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn startup_function_needing_a_parameter_never_starts_anything() {
    let trigger = Arc::new(Trigger::default());
    let team = FakeTeam::new("workers");
    let mut builder = OfficeBuilder::new();
    builder.team("workers", Arc::new(team.clone()));
    builder.resource("trigger", ResourceScope::Process, trigger.clone());
    builder.function("boot", noop).parameter::<u32>();
    builder.startup("boot");

    let Err(error) = builder.build() else {
        panic!("expected the startup function to be rejected");
    };
    assert_eq!(error.issues()[0].subject, "boot");
    assert_eq!(trigger.started.load(Ordering::SeqCst), 0);
    assert!(team.calls().is_empty());
}

#[test]
fn value_source_needs_no_lifecycle() {
    let outcome = Arc::new(Mutex::new(None));
    let mut builder = OfficeBuilder::new();
    builder.resource(
        "answer",
        ResourceScope::Process,
        Arc::new(ValueSource::new("u32", || Arc::new(42u32) as Object)),
    );
    builder
        .function("read", |context: &mut FunctionContext| {
            let answer = context.object_as::<u32>(0)?;
            match *answer {
                42 => Ok(None),
                other => Err(floor_core::Escalation::failure(format!("read {other}"))),
            }
        })
        .object("answer");
    let floor = builder.build().unwrap();
    floor.open().unwrap();

    let seen = Arc::clone(&outcome);
    floor
        .office()
        .invoke_process_with_callback("read", None, move |result| {
            *seen.lock().unwrap() = Some(result.is_ok());
        })
        .unwrap();
    assert_eq!(*outcome.lock().unwrap(), Some(true));
}
