//! Configuration file
//!
//! A single JSON document. Every section is optional; validation runs once
//! after load so a bad file fails at startup rather than on the first
//! request.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::default_sub_count;
use crate::filter::{FilterCompiler, Predicate, RawFilters};
use crate::http_server::HttpServerConfig;
use crate::observability::Severity;
use crate::paginate::PaginationConfig;

use super::errors::{CliError, CliResult};

/// Permission gate installed in front of the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    /// Actor must be a member of the project
    #[default]
    ProjectMembers,
    /// No checks
    AllowAll,
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Filter mapping counted per group as `sub_count`. Internal field
    /// names are allowed. Absent means triaged archived drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_count: Option<RawFilters>,

    /// JSON dataset seeding the in-memory store, relative to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub permissions: PermissionMode,

    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_log_level() -> Severity {
    Severity::Info
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            pagination: PaginationConfig::default(),
            sub_count: None,
            data_file: None,
            permissions: PermissionMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        if let (Some(data_file), Some(dir)) = (&config.data_file, path.parent()) {
            if data_file.is_relative() {
                config.data_file = Some(dir.join(data_file));
            }
        }

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        self.pagination
            .validate()
            .map_err(|e| CliError::config_error(format!("Invalid pagination: {}", e)))?;

        self.server
            .bind_addr()
            .map_err(|e| CliError::config_error(format!("Invalid server: {}", e)))?;

        self.sub_count_predicate()?;

        Ok(())
    }

    /// Compiled per-group secondary predicate
    pub fn sub_count_predicate(&self) -> CliResult<Predicate> {
        match &self.sub_count {
            None => Ok(default_sub_count()),
            Some(raw) => FilterCompiler::internal()
                .compile(raw)
                .map_err(|e| CliError::config_error(format!("Invalid sub_count: {}", e))),
        }
    }

    /// Pretty JSON written by `init`
    pub fn to_json_pretty(&self) -> CliResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
