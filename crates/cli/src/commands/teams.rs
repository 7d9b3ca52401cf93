// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `floor teams` - List built-in team sources

use crate::output::{print_list, OutputFormat};
use floor_teams::TeamSourceRegistry;
use serde::Serialize;
use std::fmt;

#[derive(Serialize)]
struct Property {
    name: String,
    label: String,
    default: Option<String>,
}

#[derive(Serialize)]
struct SourceSummary {
    name: String,
    properties: Vec<Property>,
}

impl fmt::Display for SourceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for property in &self.properties {
            let default = match &property.default {
                Some(value) => format!("default {value}"),
                None => "required".to_string(),
            };
            write!(f, "\n  {:<20} {} ({default})", property.name, property.label)?;
        }
        Ok(())
    }
}

pub fn teams(format: OutputFormat) {
    let registry = TeamSourceRegistry::builtin();
    let mut sources: Vec<SourceSummary> = registry
        .iter()
        .map(|(name, source)| SourceSummary {
            name: name.to_string(),
            properties: source
                .specification()
                .into_iter()
                .map(|spec| Property {
                    name: spec.name,
                    label: spec.label,
                    default: spec.default,
                })
                .collect(),
        })
        .collect();
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    print_list(&sources, format);
}
