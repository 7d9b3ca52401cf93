// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team sources resolved by name

use crate::{
    OnePersonTeamSource, PassiveTeamSource, ThreadLocalAwareTeam, TokioBlockingTeamSource,
    WorkerPoolTeamSource, THREAD_LOCAL_AWARE,
};
use floor_core::{Team, TeamError, TeamSource, TeamSourceContext};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct TeamSourceRegistry {
    sources: BTreeMap<String, Arc<dyn TeamSource>>,
}

impl TeamSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every team source this crate ships
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PassiveTeamSource));
        registry.register(Arc::new(OnePersonTeamSource));
        registry.register(Arc::new(WorkerPoolTeamSource));
        registry.register(Arc::new(TokioBlockingTeamSource));
        registry
    }

    /// Register a source under its own name, replacing any previous one
    pub fn register(&mut self, source: Arc<dyn TeamSource>) {
        self.sources.insert(source.name().to_string(), source);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TeamSource>> {
        self.sources.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn TeamSource>)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a team from the named source
    ///
    /// Required properties are checked against the source's specification
    /// first. A team configured `thread_local_aware` is tagged accordingly.
    pub fn create_team(
        &self,
        source_name: &str,
        context: &TeamSourceContext,
    ) -> Result<Arc<dyn Team>, TeamError> {
        let source = self.get(source_name).ok_or_else(|| TeamError::UnknownSource {
            team: context.team_name().to_string(),
            source_name: source_name.to_string(),
        })?;
        context.check_specification(&source.specification())?;

        let team = {
            let _guard = context.span().enter();
            tracing::debug!(source = source_name, "creating team");
            source.create_team(context)?
        };

        if context.parse_property(THREAD_LOCAL_AWARE, false)? {
            return Ok(Arc::new(ThreadLocalAwareTeam::new(team)));
        }
        Ok(team)
    }
}
