// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::administration::{AdministrationContext, AdministrationFn};
use floor_core::{
    kinds, Governance, ManagedResource, PropertySpec, ResourceError, TeamSourceContext, ValueSource,
};
use floor_teams::FakeTeam;
use std::collections::BTreeMap;

/// Source declaring `slots` dependency slots and the given extensions
struct Linked {
    slots: usize,
    extensions: Vec<&'static str>,
}

impl Linked {
    fn new(slots: usize) -> Arc<dyn ManagedResourceSource> {
        Arc::new(Self {
            slots,
            extensions: Vec::new(),
        })
    }

    fn with_extension(extension: &'static str) -> Arc<dyn ManagedResourceSource> {
        Arc::new(Self {
            slots: 0,
            extensions: vec![extension],
        })
    }
}

struct Unit;

impl ManagedResource for Unit {
    fn object(&self) -> Object {
        Arc::new(())
    }
}

impl ManagedResourceSource for Linked {
    fn meta_data(&self) -> ResourceSourceMetaData {
        let mut meta = ResourceSourceMetaData::new("unit");
        for slot in 0..self.slots {
            meta = meta.with_dependency(format!("slot{slot}"));
        }
        for extension in &self.extensions {
            meta = meta.with_extension(*extension);
        }
        meta
    }

    fn create(&self) -> Result<Box<dyn ManagedResource>, ResourceError> {
        Ok(Box::new(Unit))
    }
}

fn value() -> Arc<dyn ManagedResourceSource> {
    Arc::new(ValueSource::new("unit", || Arc::new(()) as Object))
}

struct NoopGovernance;

impl Governance for NoopGovernance {
    fn govern(&mut self, _extension: Object) -> Result<(), Escalation> {
        Ok(())
    }

    fn enforce(&mut self) -> Result<(), Escalation> {
        Ok(())
    }
}

struct Audit;

impl GovernanceSource for Audit {
    fn extension(&self) -> &str {
        "audit"
    }

    fn create(&self) -> Result<Box<dyn Governance>, Escalation> {
        Ok(Box::new(NoopGovernance))
    }
}

struct NeedsHost;

impl TeamSource for NeedsHost {
    fn name(&self) -> &str {
        "needs-host"
    }

    fn specification(&self) -> Vec<PropertySpec> {
        vec![PropertySpec::required("host", "Host to connect to")]
    }

    fn create_team(&self, context: &TeamSourceContext) -> Result<Arc<dyn Team>, TeamError> {
        Ok(Arc::new(FakeTeam::new(context.team_name())))
    }
}

struct Passthrough;

impl TeamOversight for Passthrough {
    fn oversee(&self, team_name: &str, _team: Arc<dyn Team>) -> Arc<dyn Team> {
        Arc::new(FakeTeam::new(format!("overseen-{team_name}")))
    }
}

fn noop(_: &mut FunctionContext) -> Result<Option<Object>, Escalation> {
    Ok(None)
}

fn team_config(source: &str) -> TeamConfig {
    TeamConfig {
        source: Some(source.to_string()),
        size: None,
        no_oversight: false,
        properties: BTreeMap::new(),
    }
}

fn issues(builder: &mut OfficeBuilder) -> Vec<ConstructionIssue> {
    match builder.build() {
        Ok(_) => panic!("expected construction issues"),
        Err(BuildError(issues)) => issues,
    }
}

fn kinds_of(issues: &[ConstructionIssue]) -> Vec<IssueKind> {
    issues.iter().map(|i| i.kind).collect()
}

#[test]
fn empty_office_builds() {
    let floor = OfficeBuilder::new().build().unwrap();
    assert_eq!(floor.office().function_names().count(), 0);
    assert!(!floor.is_open());
}

#[test]
fn duplicate_function_is_reported() {
    let mut builder = OfficeBuilder::new();
    builder.function("a", noop);
    builder.function("a", noop);

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::DuplicateName]);
    assert_eq!(issues[0].subject, "a");
}

#[test]
fn startup_function_requiring_a_parameter_is_reported() {
    let mut builder = OfficeBuilder::new();
    builder.function("boot", noop).parameter::<u32>();
    builder.function("warm", noop);
    builder.startup("boot").startup("warm");

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::InvalidConfiguration]);
    assert_eq!(issues[0].subject, "boot");
    assert!(issues[0].message.contains("u32"));
}

#[test]
fn duplicate_names_in_different_categories_are_allowed() {
    let mut builder = OfficeBuilder::new();
    builder.resource("shared", ResourceScope::Process, value());
    builder.function("shared", noop);
    builder.build().unwrap();
}

#[test]
fn unknown_references_are_all_reported() {
    let mut builder = OfficeBuilder::new();
    builder
        .function("a", noop)
        .object("missing-resource")
        .flow("missing-flow", Instigation::Parallel)
        .next("missing-next")
        .team("missing-team")
        .on_escalation(kinds::FAILURE, "missing-handler");
    builder.startup("missing-startup");

    let issues = issues(&mut builder);
    assert_eq!(issues.len(), 6);
    assert!(issues.iter().all(|i| i.kind == IssueKind::UnknownReference));
    let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
    assert!(messages.contains(&"unknown resource missing-resource"));
    assert!(messages.contains(&"unknown function missing-next"));
    assert!(messages.contains(&"unknown team missing-team"));
}

#[test]
fn dependency_cycle_is_reported_with_its_path() {
    let mut builder = OfficeBuilder::new();
    builder
        .resource("a", ResourceScope::Process, Linked::new(1))
        .depends_on("b");
    builder
        .resource("b", ResourceScope::Process, Linked::new(1))
        .depends_on("a");

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::DependencyCycle]);
    assert_eq!(issues[0].message, "a -> b -> a");
}

#[test]
fn self_dependency_is_a_cycle() {
    let mut builder = OfficeBuilder::new();
    builder
        .resource("a", ResourceScope::Thread, Linked::new(1))
        .depends_on("a");

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::DependencyCycle]);
    assert_eq!(issues[0].message, "a -> a");
}

#[test]
fn wider_scope_cannot_depend_on_narrower() {
    let mut builder = OfficeBuilder::new();
    builder.resource("per-call", ResourceScope::Function, value());
    builder
        .resource("shared", ResourceScope::Process, Linked::new(1))
        .depends_on("per-call");

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::ScopeViolation]);
    assert_eq!(issues[0].subject, "shared");
}

#[test]
fn narrower_scope_may_depend_on_wider() {
    let mut builder = OfficeBuilder::new();
    builder.resource("shared", ResourceScope::Process, value());
    builder
        .resource("per-thread", ResourceScope::Thread, Linked::new(1))
        .depends_on("shared");
    builder
        .resource("per-call", ResourceScope::Function, Linked::new(1))
        .depends_on("per-thread");
    builder.function("a", noop).object("per-call");
    builder.build().unwrap();
}

#[test]
fn unbound_dependency_slot_is_reported() {
    let mut builder = OfficeBuilder::new();
    builder.resource("a", ResourceScope::Process, Linked::new(2));
    builder
        .resource("b", ResourceScope::Process, value())
        .depends_on("a");

    let issues = issues(&mut builder);
    assert_eq!(
        kinds_of(&issues),
        vec![IssueKind::SlotMismatch, IssueKind::SlotMismatch]
    );
}

#[test]
fn governance_needs_extension_and_wide_scope() {
    let mut builder = OfficeBuilder::new();
    builder.resource("plain", ResourceScope::Thread, value());
    builder.resource("per-call", ResourceScope::Function, Linked::with_extension("audit"));
    builder
        .governance("audit", Arc::new(Audit))
        .govern("plain")
        .govern("per-call");

    let issues = issues(&mut builder);
    let mut found = kinds_of(&issues);
    found.sort_by_key(|k| k.as_str());
    assert_eq!(
        found,
        vec![IssueKind::MissingExtension, IssueKind::ScopeViolation]
    );
}

#[test]
fn administration_needs_extension() {
    let mut builder = OfficeBuilder::new();
    builder.resource("plain", ResourceScope::Thread, value());
    let source = Arc::new(AdministrationFn::new("audit", |_: &mut AdministrationContext<'_>| Ok(())));
    builder
        .function("a", noop)
        .pre_administration(AdministrationDecl::new("check", source).resource("plain"));

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::MissingExtension]);
    assert_eq!(issues[0].subject, "check");
}

#[test]
fn missing_team_property_is_reported() {
    let mut builder = OfficeBuilder::new();
    builder
        .register_team_source(Arc::new(NeedsHost))
        .configured_team("remote", team_config("needs-host"));

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::MissingProperty]);
    assert_eq!(issues[0].subject, "remote");
}

#[test]
fn unknown_team_source_is_reported() {
    let mut builder = OfficeBuilder::new();
    builder.configured_team("t", team_config("carrier-pigeon"));

    let issues = issues(&mut builder);
    assert_eq!(kinds_of(&issues), vec![IssueKind::TeamSource]);
}

#[test]
fn configured_team_is_built_from_its_source() {
    let mut builder = OfficeBuilder::new();
    let mut config = team_config("needs-host");
    config
        .properties
        .insert("host".to_string(), toml::Value::String("localhost".to_string()));
    builder
        .register_team_source(Arc::new(NeedsHost))
        .configured_team("remote", config);
    let floor = builder.build().unwrap();
    assert!(floor.office().team("remote").is_some());
}

#[test]
fn oversight_wraps_teams_unless_exempt() {
    let overseen = Arc::new(FakeTeam::new("overseen")) as Arc<dyn Team>;
    let exempt = Arc::new(FakeTeam::new("exempt").requiring_no_oversight()) as Arc<dyn Team>;
    let mut builder = OfficeBuilder::new();
    builder
        .team("overseen", Arc::clone(&overseen))
        .team("exempt", Arc::clone(&exempt))
        .oversight(Arc::new(Passthrough));
    let floor = builder.build().unwrap();

    let office = floor.office();
    assert!(!Arc::ptr_eq(&office.team("overseen").unwrap(), &overseen));
    assert!(Arc::ptr_eq(&office.team("exempt").unwrap(), &exempt));
}

#[test]
fn resource_requiring_no_oversight_exempts_its_team() {
    struct Raw;

    impl ManagedResourceSource for Raw {
        fn meta_data(&self) -> ResourceSourceMetaData {
            ResourceSourceMetaData::new("raw").without_oversight()
        }

        fn create(&self) -> Result<Box<dyn ManagedResource>, ResourceError> {
            Ok(Box::new(Unit))
        }
    }

    let team = Arc::new(FakeTeam::new("io")) as Arc<dyn Team>;
    let mut builder = OfficeBuilder::new();
    builder
        .team("io", Arc::clone(&team))
        .oversight(Arc::new(Passthrough));
    builder.resource("raw", ResourceScope::Thread, Arc::new(Raw));
    builder.function("read", noop).team("io").object("raw");
    let floor = builder.build().unwrap();

    assert!(Arc::ptr_eq(&floor.office().team("io").unwrap(), &team));
}

#[test]
fn function_load_order_puts_dependencies_first() {
    let mut builder = OfficeBuilder::new();
    builder.resource("base", ResourceScope::Process, value());
    builder
        .resource("mid", ResourceScope::Thread, Linked::new(1))
        .depends_on("base");
    builder
        .resource("top", ResourceScope::Function, Linked::new(2))
        .depends_on("mid")
        .depends_on("base");
    builder.function("a", noop).object("top").object("base");
    let floor = builder.build().unwrap();

    let meta = &floor.office().inner().meta;
    let names: Vec<&str> = meta.functions[0]
        .load_order
        .iter()
        .map(|index| meta.resource(*index).unwrap().name.as_str())
        .collect();
    assert_eq!(names, vec!["base", "mid", "top"]);
}

#[test]
fn config_settings_and_startup_are_applied() {
    let config = floor_config::parse_config(
        r#"
        monitor_interval = "50ms"
        default_async_flow_timeout = "2s"
        startup = ["boot"]
        "#,
    )
    .unwrap();
    let mut builder = OfficeBuilder::new();
    builder.apply_config(&config);
    builder.function("boot", noop);
    let floor = builder.build().unwrap();

    let meta = &floor.office().inner().meta;
    assert_eq!(meta.settings.monitor_interval, Duration::from_millis(50));
    assert_eq!(meta.settings.default_async_flow_timeout, Duration::from_secs(2));
    assert_eq!(meta.startup, vec![0]);
}
