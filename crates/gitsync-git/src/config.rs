//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the synchronization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// The git executable (looked up on `PATH` when relative).
    #[serde(default = "default_git_binary")]
    git_binary: PathBuf,

    /// Upper bound for a single git invocation.
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    command_timeout: Duration,

    /// Upper bound for the anonymous HTTP pre-flight request.
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    probe_timeout: Duration,

    /// Port used by operations that do not receive one explicitly.
    #[serde(default = "default_ssh_port")]
    default_ssh_port: u16,

    /// Directory for ephemeral key files (defaults to the OS temp dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_dir: Option<PathBuf>,

    /// Whether ssh verifies host keys against known_hosts.
    #[serde(default)]
    strict_host_key_checking: bool,
}

fn default_git_binary() -> PathBuf {
    PathBuf::from("git")
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_ssh_port() -> u16 {
    22
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_binary: default_git_binary(),
            command_timeout: default_command_timeout(),
            probe_timeout: default_probe_timeout(),
            default_ssh_port: default_ssh_port(),
            key_dir: None,
            strict_host_key_checking: false,
        }
    }
}

impl EngineConfig {
    /// Creates a new builder for EngineConfig.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Returns the git executable.
    pub fn git_binary(&self) -> &PathBuf {
        &self.git_binary
    }

    /// Returns the per-command timeout.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the HTTP pre-flight timeout.
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Returns the fallback SSH port.
    pub fn default_ssh_port(&self) -> u16 {
        self.default_ssh_port
    }

    /// Returns the directory for ephemeral key files.
    pub fn key_dir(&self) -> Option<&PathBuf> {
        self.key_dir.as_ref()
    }

    /// Returns whether ssh verifies host keys.
    pub fn strict_host_key_checking(&self) -> bool {
        self.strict_host_key_checking
    }

    /// Checks the values a deserialized config may carry.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.git_binary.as_os_str().is_empty() {
            return Err("gitBinary cannot be empty");
        }
        if self.command_timeout.is_zero() {
            return Err("commandTimeout must be positive");
        }
        if self.probe_timeout.is_zero() {
            return Err("probeTimeout must be positive");
        }
        if self.default_ssh_port == 0 {
            return Err("defaultSshPort must be positive");
        }
        Ok(())
    }
}

/// Builder for EngineConfig.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    git_binary: Option<PathBuf>,
    command_timeout: Option<Duration>,
    probe_timeout: Option<Duration>,
    default_ssh_port: Option<u16>,
    key_dir: Option<PathBuf>,
    strict_host_key_checking: bool,
}

impl EngineConfigBuilder {
    /// Sets the git executable.
    pub fn git_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.git_binary = Some(path.into());
        self
    }

    /// Sets the per-command timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP pre-flight timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Sets the fallback SSH port.
    pub fn default_ssh_port(mut self, port: u16) -> Self {
        self.default_ssh_port = Some(port);
        self
    }

    /// Sets the directory for ephemeral key files.
    pub fn key_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_dir = Some(path.into());
        self
    }

    /// Sets whether ssh verifies host keys.
    pub fn strict_host_key_checking(mut self, strict: bool) -> Self {
        self.strict_host_key_checking = strict;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn build(self) -> Result<EngineConfig, &'static str> {
        let config = EngineConfig {
            git_binary: self.git_binary.unwrap_or_else(default_git_binary),
            command_timeout: self
                .command_timeout
                .unwrap_or_else(default_command_timeout),
            probe_timeout: self.probe_timeout.unwrap_or_else(default_probe_timeout),
            default_ssh_port: self.default_ssh_port.unwrap_or_else(default_ssh_port),
            key_dir: self.key_dir,
            strict_host_key_checking: self.strict_host_key_checking,
        };
        config.validate()?;
        Ok(config)
    }
}

mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfig::builder().build().unwrap();

        assert_eq!(config.git_binary(), &PathBuf::from("git"));
        assert_eq!(config.command_timeout(), Duration::from_secs(600));
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
        assert_eq!(config.default_ssh_port(), 22);
        assert!(config.key_dir().is_none());
        assert!(!config.strict_host_key_checking());
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_builder_full() {
        let config = EngineConfig::builder()
            .git_binary("/usr/local/bin/git")
            .command_timeout(Duration::from_secs(60))
            .probe_timeout(Duration::from_secs(5))
            .default_ssh_port(29418)
            .key_dir("/var/run/gitsync")
            .strict_host_key_checking(true)
            .build()
            .unwrap();

        assert_eq!(config.git_binary(), &PathBuf::from("/usr/local/bin/git"));
        assert_eq!(config.command_timeout(), Duration::from_secs(60));
        assert_eq!(config.default_ssh_port(), 29418);
        assert_eq!(config.key_dir(), Some(&PathBuf::from("/var/run/gitsync")));
        assert!(config.strict_host_key_checking());
    }

    #[test]
    fn test_builder_rejects_zero_values() {
        assert!(
            EngineConfig::builder()
                .command_timeout(Duration::ZERO)
                .build()
                .is_err()
        );
        assert!(EngineConfig::builder().default_ssh_port(0).build().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"commandTimeout": 120, "defaultSshPort": 2222}"#).unwrap();

        assert_eq!(config.command_timeout(), Duration::from_secs(120));
        assert_eq!(config.default_ssh_port(), 2222);
        assert_eq!(config.probe_timeout(), Duration::from_secs(30));
        assert_eq!(config.git_binary(), &PathBuf::from("git"));
    }
}
