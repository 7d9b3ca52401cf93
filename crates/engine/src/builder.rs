// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Office builder
//!
//! Collects declarations by name, then resolves them into office metadata.
//! Every defect found is reported as a [`ConstructionIssue`]; nothing is
//! built unless there are none.

use crate::administration::AdministrationSource;
use crate::error::BuildError;
use crate::escalation::{EscalationHandler, StderrEscalationHandler};
use crate::floor::OfficeFloor;
use crate::function::{FunctionContext, ManagedFunction};
use crate::meta::{
    AdministrationMeta, FlowMeta, FunctionMeta, GovernanceMeta, OfficeMeta, ParameterType,
    ResourceMeta, Settings, TeamMeta,
};
use crate::office::{Office, OfficeInner};
use floor_config::{OfficeConfig, TeamConfig};
use floor_core::{
    Clock, ConstructionIssue, Escalation, EscalationKind, EscalationProcedure,
    GovernanceDeactivation, GovernanceSource, IdGen, Instigation, IssueKind,
    ManagedResourceSource, Object, ResourceIndex, ResourceScope, ResourceSourceMetaData,
    SystemClock, Team, TeamError, TeamOversight, TeamSource, ThreadLocalHook, UuidIdGen,
};
use floor_teams::TeamSourceRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

enum TeamDecl {
    Direct(Arc<dyn Team>),
    Configured(TeamConfig),
}

/// A managed resource declaration
pub struct ResourceDecl {
    name: String,
    scope: ResourceScope,
    source: Arc<dyn ManagedResourceSource>,
    depends_on: Vec<String>,
    timeout: Option<Duration>,
}

impl ResourceDecl {
    /// Bind the next dependency slot of the source to resource `name`
    pub fn depends_on(&mut self, name: impl Into<String>) -> &mut Self {
        self.depends_on.push(name.into());
        self
    }

    /// Maximum LOADING duration, overriding the source and office defaults
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An administration run before or after a function
pub struct AdministrationDecl {
    name: String,
    source: Arc<dyn AdministrationSource>,
    resources: Vec<String>,
    governance: Vec<String>,
    flows: Vec<(String, Instigation)>,
}

impl AdministrationDecl {
    pub fn new(name: impl Into<String>, source: Arc<dyn AdministrationSource>) -> Self {
        Self {
            name: name.into(),
            source,
            resources: Vec::new(),
            governance: Vec::new(),
            flows: Vec::new(),
        }
    }

    /// Administer resource `name`; its extension is passed at the next index
    pub fn resource(mut self, name: impl Into<String>) -> Self {
        self.resources.push(name.into());
        self
    }

    /// Make governance `name` available at the next local index
    pub fn governance(mut self, name: impl Into<String>) -> Self {
        self.governance.push(name.into());
        self
    }

    pub fn flow(mut self, function: impl Into<String>, instigation: Instigation) -> Self {
        self.flows.push((function.into(), instigation));
        self
    }
}

/// A function declaration
pub struct FunctionDecl {
    name: String,
    body: Arc<dyn ManagedFunction>,
    team: Option<String>,
    objects: Vec<String>,
    parameter: Option<ParameterType>,
    flows: Vec<(String, Instigation)>,
    next: Option<String>,
    escalation: Vec<(EscalationKind, String)>,
    pre_administration: Vec<AdministrationDecl>,
    post_administration: Vec<AdministrationDecl>,
}

impl FunctionDecl {
    /// Team responsible for running the function
    pub fn team(&mut self, name: impl Into<String>) -> &mut Self {
        self.team = Some(name.into());
        self
    }

    /// Depend on resource `name`; its object is available at the next index
    pub fn object(&mut self, name: impl Into<String>) -> &mut Self {
        self.objects.push(name.into());
        self
    }

    /// Reject parameters that are not a `T`
    pub fn parameter<T: std::any::Any + Send + Sync>(&mut self) -> &mut Self {
        self.parameter = Some(ParameterType::of::<T>());
        self
    }

    /// Declare the flow at the next index
    pub fn flow(&mut self, function: impl Into<String>, instigation: Instigation) -> &mut Self {
        self.flows.push((function.into(), instigation));
        self
    }

    /// Function to continue with, receiving this function's return value
    pub fn next(&mut self, function: impl Into<String>) -> &mut Self {
        self.next = Some(function.into());
        self
    }

    /// Handle escalations of `kind` (or any narrower kind) with `handler`
    pub fn on_escalation(
        &mut self,
        kind: impl Into<EscalationKind>,
        handler: impl Into<String>,
    ) -> &mut Self {
        self.escalation.push((kind.into(), handler.into()));
        self
    }

    pub fn pre_administration(&mut self, administration: AdministrationDecl) -> &mut Self {
        self.pre_administration.push(administration);
        self
    }

    pub fn post_administration(&mut self, administration: AdministrationDecl) -> &mut Self {
        self.post_administration.push(administration);
        self
    }
}

/// A governance declaration
pub struct GovernanceDecl {
    name: String,
    source: Arc<dyn GovernanceSource>,
    resources: Vec<String>,
    team: Option<String>,
}

impl GovernanceDecl {
    /// Govern resource `name` through its extension
    pub fn govern(&mut self, name: impl Into<String>) -> &mut Self {
        self.resources.push(name.into());
        self
    }

    pub fn team(&mut self, name: impl Into<String>) -> &mut Self {
        self.team = Some(name.into());
        self
    }
}

pub struct OfficeBuilder {
    teams: Vec<(String, TeamDecl)>,
    resources: Vec<ResourceDecl>,
    functions: Vec<FunctionDecl>,
    governances: Vec<GovernanceDecl>,
    escalation: Vec<(EscalationKind, String)>,
    startup: Vec<String>,
    default_team: Option<String>,
    oversight: Option<Arc<dyn TeamOversight>>,
    hooks: Vec<Arc<dyn ThreadLocalHook>>,
    clock: Arc<dyn Clock>,
    id_gen: Arc<dyn IdGen>,
    handler: Arc<dyn EscalationHandler>,
    settings: Settings,
    sources: TeamSourceRegistry,
    runtime: Option<tokio::runtime::Handle>,
}

impl Default for OfficeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OfficeBuilder {
    pub fn new() -> Self {
        Self {
            teams: Vec::new(),
            resources: Vec::new(),
            functions: Vec::new(),
            governances: Vec::new(),
            escalation: Vec::new(),
            startup: Vec::new(),
            default_team: None,
            oversight: None,
            hooks: Vec::new(),
            clock: Arc::new(SystemClock),
            id_gen: Arc::new(UuidIdGen),
            handler: Arc::new(StderrEscalationHandler),
            settings: Settings::default(),
            sources: TeamSourceRegistry::builtin(),
            runtime: None,
        }
    }

    /// Take settings, teams, startup functions, and default team from config
    pub fn apply_config(&mut self, config: &OfficeConfig) -> &mut Self {
        self.settings = Settings::from_config(config);
        for (name, team) in &config.teams {
            self.teams
                .push((name.clone(), TeamDecl::Configured(team.clone())));
        }
        self.startup.extend(config.startup.iter().cloned());
        if let Some(team) = &config.default_team {
            self.default_team = Some(team.clone());
        }
        self
    }

    /// Declare a team built outside the office
    pub fn team(&mut self, name: impl Into<String>, team: Arc<dyn Team>) -> &mut Self {
        self.teams.push((name.into(), TeamDecl::Direct(team)));
        self
    }

    /// Declare a team built by a registered team source
    pub fn configured_team(&mut self, name: impl Into<String>, config: TeamConfig) -> &mut Self {
        self.teams.push((name.into(), TeamDecl::Configured(config)));
        self
    }

    pub fn register_team_source(&mut self, source: Arc<dyn TeamSource>) -> &mut Self {
        self.sources.register(source);
        self
    }

    /// Runtime handed to team sources that schedule onto tokio
    pub fn runtime(&mut self, runtime: tokio::runtime::Handle) -> &mut Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn resource(
        &mut self,
        name: impl Into<String>,
        scope: ResourceScope,
        source: Arc<dyn ManagedResourceSource>,
    ) -> &mut ResourceDecl {
        self.resources.push(ResourceDecl {
            name: name.into(),
            scope,
            source,
            depends_on: Vec::new(),
            timeout: None,
        });
        let last = self.resources.len() - 1;
        &mut self.resources[last]
    }

    pub fn function<F>(&mut self, name: impl Into<String>, body: F) -> &mut FunctionDecl
    where
        F: Fn(&mut FunctionContext) -> Result<Option<Object>, Escalation> + Send + Sync + 'static,
    {
        self.managed_function(name, Arc::new(body))
    }

    pub fn managed_function(
        &mut self,
        name: impl Into<String>,
        body: Arc<dyn ManagedFunction>,
    ) -> &mut FunctionDecl {
        self.functions.push(FunctionDecl {
            name: name.into(),
            body,
            team: None,
            objects: Vec::new(),
            parameter: None,
            flows: Vec::new(),
            next: None,
            escalation: Vec::new(),
            pre_administration: Vec::new(),
            post_administration: Vec::new(),
        });
        let last = self.functions.len() - 1;
        &mut self.functions[last]
    }

    pub fn governance(
        &mut self,
        name: impl Into<String>,
        source: Arc<dyn GovernanceSource>,
    ) -> &mut GovernanceDecl {
        self.governances.push(GovernanceDecl {
            name: name.into(),
            source,
            resources: Vec::new(),
            team: None,
        });
        let last = self.governances.len() - 1;
        &mut self.governances[last]
    }

    /// Office-level handler, consulted after every function and thread level
    pub fn on_escalation(
        &mut self,
        kind: impl Into<EscalationKind>,
        handler: impl Into<String>,
    ) -> &mut Self {
        self.escalation.push((kind.into(), handler.into()));
        self
    }

    pub fn startup(&mut self, function: impl Into<String>) -> &mut Self {
        self.startup.push(function.into());
        self
    }

    /// Team that picks up work arriving from threads outside every team
    pub fn default_team(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_team = Some(name.into());
        self
    }

    pub fn oversight(&mut self, oversight: Arc<dyn TeamOversight>) -> &mut Self {
        self.oversight = Some(oversight);
        self
    }

    pub fn thread_local_hook(&mut self, hook: Arc<dyn ThreadLocalHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    pub fn clock(&mut self, clock: Arc<dyn Clock>) -> &mut Self {
        self.clock = clock;
        self
    }

    pub fn id_gen(&mut self, id_gen: Arc<dyn IdGen>) -> &mut Self {
        self.id_gen = id_gen;
        self
    }

    /// Receiver of escalations no procedure handles
    pub fn escalation_handler(&mut self, handler: Arc<dyn EscalationHandler>) -> &mut Self {
        self.handler = handler;
        self
    }

    pub fn resource_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.settings.default_resource_timeout = timeout;
        self
    }

    pub fn async_flow_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.settings.default_async_flow_timeout = timeout;
        self
    }

    pub fn monitor_interval(&mut self, interval: Duration) -> &mut Self {
        self.settings.monitor_interval = interval;
        self
    }

    pub fn governance_deactivation(&mut self, deactivation: GovernanceDeactivation) -> &mut Self {
        self.settings.governance_deactivation = deactivation;
        self
    }

    /// Resolve every declaration; the builder is left empty
    pub fn build(&mut self) -> Result<OfficeFloor, BuildError> {
        let mut issues = Vec::new();

        let teams = std::mem::take(&mut self.teams);
        let team_names = index_names("team", teams.iter().map(|(n, _)| n.as_str()), &mut issues);
        let built_teams = self.build_teams(&teams, &mut issues);

        let resources = std::mem::take(&mut self.resources);
        let resolved = resolve_resources(&resources, &self.settings, &mut issues);

        let governances = std::mem::take(&mut self.governances);
        let governance_names = index_names(
            "governance",
            governances.iter().map(|g| g.name.as_str()),
            &mut issues,
        );
        let governance_meta: Vec<GovernanceMeta> = governances
            .iter()
            .map(|g| {
                let mut governed = Vec::new();
                for name in &g.resources {
                    let Some(position) =
                        lookup(&resolved.names, "resource", &g.name, name, &mut issues)
                    else {
                        continue;
                    };
                    if resources[position].scope == ResourceScope::Function {
                        issues.push(ConstructionIssue::new(
                            IssueKind::ScopeViolation,
                            &g.name,
                            format!("cannot govern function-scoped resource {name}"),
                        ));
                    }
                    check_extension(&resolved, position, g.source.extension(), &g.name, &mut issues);
                    governed.push(resolved.indices[position]);
                }
                GovernanceMeta {
                    name: g.name.clone(),
                    source: Arc::clone(&g.source),
                    resources: governed,
                    team: g
                        .team
                        .as_ref()
                        .and_then(|t| lookup(&team_names, "team", &g.name, t, &mut issues)),
                }
            })
            .collect();

        let functions = std::mem::take(&mut self.functions);
        let function_names = index_names(
            "function",
            functions.iter().map(|f| f.name.as_str()),
            &mut issues,
        );
        let refs = References {
            teams: &team_names,
            functions: &function_names,
            governances: &governance_names,
            resources: &resolved,
        };
        let function_meta: Vec<FunctionMeta> = functions
            .iter()
            .map(|f| refs.function(f, &mut issues))
            .collect();

        let mut escalation = EscalationProcedure::new();
        for (kind, handler) in std::mem::take(&mut self.escalation) {
            if let Some(handler) = lookup(&function_names, "function", "office", &handler, &mut issues) {
                escalation.push(kind, handler);
            }
        }
        let startup: Vec<usize> = std::mem::take(&mut self.startup)
            .iter()
            .filter_map(|f| lookup(&function_names, "function", "startup", f, &mut issues))
            .collect();
        // Startup processes are invoked without an argument
        for &function in &startup {
            if let Some(parameter) = &function_meta[function].parameter {
                issues.push(ConstructionIssue::new(
                    IssueKind::InvalidConfiguration,
                    &function_meta[function].name,
                    format!("startup function requires a {} parameter", parameter.name),
                ));
            }
        }
        let default_team = self
            .default_team
            .take()
            .and_then(|t| lookup(&team_names, "team", "default_team", &t, &mut issues));

        if !issues.is_empty() {
            for issue in &issues {
                tracing::warn!(subject = %issue.subject, kind = issue.kind.as_str(), "{}", issue.message);
            }
            return Err(BuildError(issues));
        }

        let exempt = oversight_exemptions(&function_meta, &resolved, built_teams.len());
        let team_meta: Vec<TeamMeta> = teams
            .iter()
            .zip(built_teams)
            .enumerate()
            .filter_map(|(index, ((name, _), built))| {
                let (team, no_oversight) = built?;
                let capabilities = team.capabilities();
                let team = match &self.oversight {
                    Some(oversight)
                        if !(no_oversight || capabilities.requires_no_oversight || exempt[index]) =>
                    {
                        oversight.oversee(name, team)
                    }
                    _ => {
                        tracing::debug!(team = %name, "team runs without oversight");
                        team
                    }
                };
                Some(TeamMeta {
                    name: name.clone(),
                    team,
                    capabilities,
                })
            })
            .collect();

        let resource_meta: HashMap<ResourceIndex, ResourceMeta> = resources
            .iter()
            .enumerate()
            .map(|(position, r)| {
                let index = resolved.indices[position];
                let meta = ResourceMeta {
                    name: r.name.clone(),
                    scope: r.scope,
                    source: Arc::clone(&r.source),
                    dependencies: resolved.edges[position]
                        .iter()
                        .map(|d| resolved.indices[*d])
                        .collect(),
                    extensions: resolved.metadata[position].extensions.clone(),
                    timeout: resolved.timeouts[position],
                    load_order: resolved.load_order(&[position]),
                };
                (index, meta)
            })
            .collect();

        let function_index = function_names;
        let meta = OfficeMeta {
            functions: function_meta,
            function_index,
            resources: resource_meta,
            governances: governance_meta,
            teams: team_meta,
            escalation,
            startup,
            default_team,
            settings: self.settings.clone(),
        };
        tracing::info!(
            functions = meta.functions.len(),
            resources = meta.resources.len(),
            teams = meta.teams.len(),
            "office built"
        );

        let hooks: Arc<[Arc<dyn ThreadLocalHook>]> = std::mem::take(&mut self.hooks).into();
        let inner = OfficeInner::new(
            meta,
            Arc::clone(&self.clock),
            Arc::clone(&self.id_gen),
            Arc::clone(&self.handler),
            hooks,
        );
        Ok(OfficeFloor::new(Office::new(Arc::new(inner))))
    }

    /// Build every team, with its no-oversight request
    fn build_teams(
        &self,
        teams: &[(String, TeamDecl)],
        issues: &mut Vec<ConstructionIssue>,
    ) -> Vec<Option<(Arc<dyn Team>, bool)>> {
        teams
            .iter()
            .map(|(name, decl)| match decl {
                TeamDecl::Direct(team) => Some((Arc::clone(team), false)),
                TeamDecl::Configured(config) => {
                    let mut context = config.context(name);
                    if let Some(runtime) = &self.runtime {
                        context = context.with_runtime(runtime.clone());
                    }
                    match self.sources.create_team(config.source(), &context) {
                        Ok(team) => Some((team, config.no_oversight)),
                        Err(e) => {
                            issues.push(team_issue(name, e));
                            None
                        }
                    }
                }
            })
            .collect()
    }
}

fn team_issue(team: &str, error: TeamError) -> ConstructionIssue {
    let kind = match error {
        TeamError::MissingProperty { .. } => IssueKind::MissingProperty,
        _ => IssueKind::TeamSource,
    };
    ConstructionIssue::new(kind, team, error.to_string())
}

/// Map names to declaration positions, reporting duplicates
fn index_names<'a>(
    what: &str,
    names: impl Iterator<Item = &'a str>,
    issues: &mut Vec<ConstructionIssue>,
) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (position, name) in names.enumerate() {
        if index.contains_key(name) {
            issues.push(ConstructionIssue::new(
                IssueKind::DuplicateName,
                name,
                format!("{what} {name} is declared more than once"),
            ));
            continue;
        }
        index.insert(name.to_string(), position);
    }
    index
}

fn lookup(
    names: &HashMap<String, usize>,
    what: &str,
    subject: &str,
    target: &str,
    issues: &mut Vec<ConstructionIssue>,
) -> Option<usize> {
    let found = names.get(target).copied();
    if found.is_none() {
        issues.push(ConstructionIssue::new(
            IssueKind::UnknownReference,
            subject,
            format!("unknown {what} {target}"),
        ));
    }
    found
}

/// Resources with their slots, dependency edges, and source metadata
struct ResolvedResources {
    names: HashMap<String, usize>,
    indices: Vec<ResourceIndex>,
    metadata: Vec<ResourceSourceMetaData>,
    /// Declaration positions each resource depends on, in slot order
    edges: Vec<Vec<usize>>,
    timeouts: Vec<Duration>,
}

impl ResolvedResources {
    /// Dependencies before dependants, each resource once
    fn load_order(&self, positions: &[usize]) -> Vec<ResourceIndex> {
        let mut visited = vec![false; self.edges.len()];
        let mut order = Vec::new();
        for &position in positions {
            self.visit(position, &mut visited, &mut order);
        }
        order.into_iter().map(|p| self.indices[p]).collect()
    }

    fn visit(&self, position: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        if visited[position] {
            return;
        }
        visited[position] = true;
        for &dependency in &self.edges[position] {
            self.visit(dependency, visited, order);
        }
        order.push(position);
    }
}

fn resolve_resources(
    resources: &[ResourceDecl],
    settings: &Settings,
    issues: &mut Vec<ConstructionIssue>,
) -> ResolvedResources {
    let names = index_names(
        "resource",
        resources.iter().map(|r| r.name.as_str()),
        issues,
    );

    let mut slots: HashMap<ResourceScope, usize> = HashMap::new();
    let indices: Vec<ResourceIndex> = resources
        .iter()
        .map(|r| {
            let slot = slots.entry(r.scope).or_default();
            let index = ResourceIndex::new(r.scope, *slot);
            *slot += 1;
            index
        })
        .collect();
    let metadata: Vec<ResourceSourceMetaData> = resources.iter().map(|r| r.source.meta_data()).collect();

    let mut edges = Vec::with_capacity(resources.len());
    for (position, resource) in resources.iter().enumerate() {
        let declared = &metadata[position].dependencies;
        if resource.depends_on.len() != declared.len() {
            issues.push(ConstructionIssue::new(
                IssueKind::SlotMismatch,
                &resource.name,
                format!(
                    "source declares {} dependency slot(s) [{}] but {} bound",
                    declared.len(),
                    declared.join(", "),
                    resource.depends_on.len()
                ),
            ));
        }
        let mut dependencies = Vec::new();
        for name in &resource.depends_on {
            let Some(dependency) = lookup(&names, "resource", &resource.name, name, issues) else {
                continue;
            };
            let scope = resources[dependency].scope;
            if !scope.encloses(resource.scope) {
                issues.push(ConstructionIssue::new(
                    IssueKind::ScopeViolation,
                    &resource.name,
                    format!(
                        "{} resource cannot depend on {} resource {name}",
                        resource.scope.as_str(),
                        scope.as_str()
                    ),
                ));
            }
            dependencies.push(dependency);
        }
        edges.push(dependencies);
    }

    for cycle in find_cycles(&edges) {
        let path: Vec<&str> = cycle.iter().map(|p| resources[*p].name.as_str()).collect();
        issues.push(ConstructionIssue::new(
            IssueKind::DependencyCycle,
            path.first().copied().unwrap_or_default(),
            path.join(" -> "),
        ));
    }

    let timeouts = resources
        .iter()
        .zip(&metadata)
        .map(|(r, m)| {
            r.timeout
                .or(m.timeout)
                .unwrap_or(settings.default_resource_timeout)
        })
        .collect();

    ResolvedResources {
        names,
        indices,
        metadata,
        edges,
        timeouts,
    }
}

/// Each cycle once, as a closed path of declaration positions
fn find_cycles(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }

    fn walk(
        node: usize,
        edges: &[Vec<usize>],
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        cycles: &mut Vec<Vec<usize>>,
    ) {
        marks[node] = Mark::Open;
        stack.push(node);
        for &next in &edges[node] {
            match marks[next] {
                Mark::New => walk(next, edges, marks, stack, cycles),
                Mark::Open => {
                    if let Some(start) = stack.iter().position(|&n| n == next) {
                        let mut cycle = stack[start..].to_vec();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        stack.pop();
        marks[node] = Mark::Done;
    }

    let mut marks = vec![Mark::New; edges.len()];
    let mut cycles = Vec::new();
    for node in 0..edges.len() {
        if marks[node] == Mark::New {
            walk(node, edges, &mut marks, &mut Vec::new(), &mut cycles);
        }
    }
    cycles
}

fn check_extension(
    resolved: &ResolvedResources,
    position: usize,
    extension: &str,
    subject: &str,
    issues: &mut Vec<ConstructionIssue>,
) {
    if !resolved.metadata[position]
        .extensions
        .iter()
        .any(|e| e == extension)
    {
        let resource = resolved
            .names
            .iter()
            .find(|(_, p)| **p == position)
            .map_or("resource", |(n, _)| n.as_str());
        issues.push(ConstructionIssue::new(
            IssueKind::MissingExtension,
            subject,
            format!("{resource} does not provide extension {extension}"),
        ));
    }
}

/// Name tables used to resolve function declarations
struct References<'a> {
    teams: &'a HashMap<String, usize>,
    functions: &'a HashMap<String, usize>,
    governances: &'a HashMap<String, usize>,
    resources: &'a ResolvedResources,
}

impl References<'_> {
    fn function(&self, decl: &FunctionDecl, issues: &mut Vec<ConstructionIssue>) -> FunctionMeta {
        let subject = decl.name.as_str();
        let team = decl
            .team
            .as_ref()
            .and_then(|t| lookup(self.teams, "team", subject, t, issues));

        let mut positions = Vec::new();
        let objects: Vec<ResourceIndex> = decl
            .objects
            .iter()
            .filter_map(|r| lookup(&self.resources.names, "resource", subject, r, issues))
            .inspect(|p| positions.push(*p))
            .map(|p| self.resources.indices[p])
            .collect();

        let mut escalation = EscalationProcedure::new();
        for (kind, handler) in &decl.escalation {
            if let Some(handler) = lookup(self.functions, "function", subject, handler, issues) {
                escalation.push(kind.clone(), handler);
            }
        }

        let mut administration = |decls: &[AdministrationDecl], positions: &mut Vec<usize>| {
            decls
                .iter()
                .map(|a| self.administration(a, positions, issues))
                .collect::<Vec<_>>()
        };
        let pre_administration = administration(&decl.pre_administration, &mut positions);
        let post_administration = administration(&decl.post_administration, &mut positions);

        FunctionMeta {
            name: decl.name.clone(),
            body: Arc::clone(&decl.body),
            team,
            objects,
            parameter: decl.parameter,
            flows: self.flows(subject, &decl.flows, issues),
            next: decl
                .next
                .as_ref()
                .and_then(|n| lookup(self.functions, "function", subject, n, issues)),
            escalation,
            pre_administration,
            post_administration,
            load_order: self.resources.load_order(&positions),
        }
    }

    fn flows(
        &self,
        subject: &str,
        flows: &[(String, Instigation)],
        issues: &mut Vec<ConstructionIssue>,
    ) -> Vec<FlowMeta> {
        flows
            .iter()
            .filter_map(|(target, instigation)| {
                lookup(self.functions, "function", subject, target, issues).map(|function| FlowMeta {
                    function,
                    instigation: *instigation,
                })
            })
            .collect()
    }

    fn administration(
        &self,
        decl: &AdministrationDecl,
        positions: &mut Vec<usize>,
        issues: &mut Vec<ConstructionIssue>,
    ) -> AdministrationMeta {
        let subject = decl.name.as_str();
        let mut resources = Vec::new();
        for name in &decl.resources {
            if let Some(position) = lookup(&self.resources.names, "resource", subject, name, issues) {
                check_extension(self.resources, position, decl.source.extension(), subject, issues);
                positions.push(position);
                resources.push(self.resources.indices[position]);
            }
        }
        AdministrationMeta {
            name: decl.name.clone(),
            source: Arc::clone(&decl.source),
            resources,
            governance: decl
                .governance
                .iter()
                .filter_map(|g| lookup(self.governances, "governance", subject, g, issues))
                .collect(),
            flows: self.flows(subject, &decl.flows, issues),
        }
    }
}

/// Teams whose functions use a resource or administration asking for no oversight
fn oversight_exemptions(
    functions: &[FunctionMeta],
    resolved: &ResolvedResources,
    teams: usize,
) -> Vec<bool> {
    let mut exempt = vec![false; teams];
    let requires_no_oversight: HashMap<ResourceIndex, bool> = resolved
        .indices
        .iter()
        .zip(&resolved.metadata)
        .map(|(index, m)| (*index, m.requires_no_oversight))
        .collect();

    for function in functions {
        let Some(team) = function.team else {
            continue;
        };
        let by_resource = function
            .load_order
            .iter()
            .any(|r| requires_no_oversight.get(r).copied().unwrap_or(false));
        let by_administration = function
            .pre_administration
            .iter()
            .chain(&function.post_administration)
            .any(|a| a.source.requires_no_oversight());
        if by_resource || by_administration {
            if let Some(flag) = exempt.get_mut(team) {
                *flag = true;
            }
        }
    }
    exempt
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
