// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Office TOML parsing

use floor_core::{GovernanceDeactivation, TeamSourceContext};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during office config parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

fn default_monitor_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_resource_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_async_flow_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Engine settings for one office
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OfficeConfig {
    /// Tick of the timeout monitor
    #[serde(default = "default_monitor_interval", with = "humantime_serde")]
    pub monitor_interval: Duration,
    /// LOADING limit for resources that declare none
    #[serde(default = "default_resource_timeout", with = "humantime_serde")]
    pub default_resource_timeout: Duration,
    #[serde(default = "default_async_flow_timeout", with = "humantime_serde")]
    pub default_async_flow_timeout: Duration,
    #[serde(default)]
    pub governance_deactivation: GovernanceDeactivation,
    /// Functions invoked as processes when the office opens
    #[serde(default)]
    pub startup: Vec<String>,
    /// Team that resumes work signalled from threads outside any team
    #[serde(default)]
    pub default_team: Option<String>,
    #[serde(default, rename = "team")]
    pub teams: BTreeMap<String, TeamConfig>,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            monitor_interval: default_monitor_interval(),
            default_resource_timeout: default_resource_timeout(),
            default_async_flow_timeout: default_async_flow_timeout(),
            governance_deactivation: GovernanceDeactivation::default(),
            startup: Vec::new(),
            default_team: None,
            teams: BTreeMap::new(),
        }
    }
}

/// One `[team.<name>]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub size: Option<usize>,
    /// Hand the team to the office exactly as its source built it
    #[serde(default)]
    pub no_oversight: bool,
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
}

impl TeamConfig {
    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or_default()
    }

    /// Properties as strings, with `size` folded in
    pub fn string_properties(&self) -> BTreeMap<String, String> {
        let mut properties: BTreeMap<String, String> = self
            .properties
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();
        if let Some(size) = self.size {
            properties.insert("size".to_string(), size.to_string());
        }
        properties
    }

    pub fn context(&self, team_name: &str) -> TeamSourceContext {
        TeamSourceContext::new(team_name, self.string_properties())
    }
}

/// Parse an office config from TOML content
pub fn parse_config(content: &str) -> Result<OfficeConfig, ParseError> {
    let config: OfficeConfig = toml::from_str(content)?;

    if config.monitor_interval.is_zero() {
        return Err(ParseError::InvalidFormat(
            "monitor_interval must be greater than zero".to_string(),
        ));
    }

    for (name, team) in &config.teams {
        match team.source.as_deref() {
            None => return Err(ParseError::MissingField(format!("team.{name}.source"))),
            Some("") => {
                return Err(ParseError::InvalidFormat(format!(
                    "team.{name}.source must not be empty"
                )))
            }
            Some(_) => {}
        }
    }

    if let Some(default_team) = &config.default_team {
        if !config.teams.contains_key(default_team) {
            return Err(ParseError::InvalidFormat(format!(
                "default_team {default_team} is not a configured team"
            )));
        }
    }

    Ok(config)
}

/// Read and parse an office config file
pub fn load_config(path: &Path) -> Result<OfficeConfig, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
#[path = "office_tests.rs"]
mod tests;
