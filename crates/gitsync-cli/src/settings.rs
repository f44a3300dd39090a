//! Settings loading.
//!
//! Values come from an optional settings file, overridden by `GITSYNC__*`
//! environment variables (`GITSYNC__COMMAND_TIMEOUT_SECS=120`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use gitsync_git::EngineConfig;
use serde::Deserialize;

use crate::error::CliError;

const ENV_PREFIX: &str = "GITSYNC";
const ENV_SEPARATOR: &str = "__";

/// Settings of the `gitsync` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default log filter.
    pub log_level: String,
    /// Print a metrics summary to stderr after each command.
    pub metrics: bool,
    pub git_binary: Option<PathBuf>,
    pub command_timeout_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    /// SSH port for operations whose URL carries none.
    pub ssh_port: u16,
    pub key_dir: Option<PathBuf>,
    pub strict_host_key_checking: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics: false,
            git_binary: None,
            command_timeout_secs: None,
            probe_timeout_secs: None,
            ssh_port: 22,
            key_dir: None,
            strict_host_key_checking: false,
        }
    }
}

impl Settings {
    /// Loads settings from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// Builds the engine configuration these settings describe.
    pub fn engine_config(&self) -> Result<EngineConfig, CliError> {
        let mut builder = EngineConfig::builder()
            .default_ssh_port(self.ssh_port)
            .strict_host_key_checking(self.strict_host_key_checking);
        if let Some(binary) = &self.git_binary {
            builder = builder.git_binary(binary);
        }
        if let Some(secs) = self.command_timeout_secs {
            builder = builder.command_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.probe_timeout_secs {
            builder = builder.probe_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.key_dir {
            builder = builder.key_dir(dir);
        }
        builder
            .build()
            .map_err(|reason| CliError::Settings(reason.to_string()))
    }
}
