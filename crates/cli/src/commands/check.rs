// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `floor check` - Validate an office configuration

use crate::output::{print_list, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use floor_config::OfficeConfig;
use floor_core::{ConstructionIssue, IssueKind, TeamError};
use floor_teams::TeamSourceRegistry;
use std::path::PathBuf;

#[derive(Args)]
pub struct CheckArgs {
    /// Office configuration file (TOML)
    pub path: PathBuf,
}

pub fn check(args: CheckArgs, format: OutputFormat) -> Result<()> {
    let config = floor_config::load_config(&args.path)
        .with_context(|| format!("invalid configuration {}", args.path.display()))?;
    let runtime = tokio::runtime::Handle::try_current().ok();
    let issues = team_issues(&config, &TeamSourceRegistry::builtin(), runtime);

    if !issues.is_empty() {
        print_list(&issues, format);
        anyhow::bail!(
            "{} construction issue(s) in {}",
            issues.len(),
            args.path.display()
        );
    }

    match format {
        OutputFormat::Text => println!(
            "{}: ok ({} team(s), {} startup function(s))",
            args.path.display(),
            config.teams.len(),
            config.startup.len()
        ),
        OutputFormat::Json => print_list::<ConstructionIssue>(&[], format),
    }
    Ok(())
}

/// Build every configured team, collecting what prevents it from being built
fn team_issues(
    config: &OfficeConfig,
    registry: &TeamSourceRegistry,
    runtime: Option<tokio::runtime::Handle>,
) -> Vec<ConstructionIssue> {
    let mut issues = Vec::new();
    for (name, team) in &config.teams {
        let mut context = team.context(name);
        if let Some(runtime) = &runtime {
            context = context.with_runtime(runtime.clone());
        }
        match registry.create_team(team.source(), &context) {
            Ok(_) => tracing::debug!(team = %name, source = team.source(), "team builds"),
            Err(e) => {
                let kind = match e {
                    TeamError::MissingProperty { .. } => IssueKind::MissingProperty,
                    _ => IssueKind::TeamSource,
                };
                issues.push(ConstructionIssue::new(kind, name, e.to_string()));
            }
        }
    }
    issues
}
