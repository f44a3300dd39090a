//! Runner that spawns the system git binary.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use super::{CommandOutput, CommandRunner, GitCommand, redact};
use crate::config::EngineConfig;
use crate::error::{GitSyncError, Result};

/// Variables passed through from the parent process. Everything else is
/// dropped so that user-level git and ssh configuration cannot leak in.
const INHERITED_ENV: &[&str] = &["PATH", "HOME", "TMPDIR", "SYSTEMROOT"];

/// Variables every invocation gets.
const BASE_ENV: &[(&str, &str)] = &[
    ("LC_ALL", "C"),
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
];

/// Spawns git with a cleared environment, a null stdin and a deadline.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    git_binary: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    /// Creates a runner for the given binary and per-command deadline.
    pub fn new(git_binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            git_binary: git_binary.into(),
            timeout,
        }
    }

    /// Creates a runner from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.git_binary().clone(), config.command_timeout())
    }

    fn build(&self, command: &GitCommand) -> Command {
        let mut cmd = Command::new(&self.git_binary);
        cmd.args(command.get_args());

        cmd.env_clear();
        for key in INHERITED_ENV {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        for (key, value) in BASE_ENV {
            cmd.env(key, value);
        }
        for (key, value) in command.get_envs() {
            cmd.env(key, value);
        }

        if let Some(dir) = command.get_current_dir() {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &GitCommand) -> Result<CommandOutput> {
        debug!(command = %command, "spawning git");

        let child = self
            .build(command)
            .spawn()
            .map_err(|source| GitSyncError::Spawn {
                program: self.git_binary.display().to_string(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| GitSyncError::Timeout {
                operation: command.subcommand().to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let result = CommandOutput {
            status: output.status.code(),
            output: redact(&combined),
        };
        trace!(status = ?result.status, output = %result.output, "git finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_runs_git_version() {
        if !git_available() {
            return;
        }
        let runner = ProcessRunner::default();
        let output = runner
            .run(&GitCommand::new().arg("--version"))
            .await
            .unwrap();
        assert!(output.is_success());
        assert!(output.output.starts_with("git version"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::default();
        let output = runner
            .run(
                &GitCommand::new()
                    .args(["rev-parse", "--git-dir"])
                    .current_dir(dir.path()),
            )
            .await
            .unwrap();
        assert!(!output.is_success());
        assert!(output.output.contains("not a git repository"));
    }

    #[test]
    fn test_environment_is_scrubbed() {
        let runner = ProcessRunner::default();
        let command = runner.build(
            &GitCommand::new()
                .arg("fetch")
                .env("GIT_SSH_COMMAND", "ssh -F /dev/null"),
        );
        let envs: Vec<_> = command
            .as_std()
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_str()?.to_string(), v?.to_str()?.to_string())))
            .collect();

        let value = |key: &str| {
            envs.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(value("GIT_TERMINAL_PROMPT"), Some("0"));
        assert_eq!(value("GIT_CONFIG_GLOBAL"), Some("/dev/null"));
        assert_eq!(value("LC_ALL"), Some("C"));
        assert_eq!(value("GIT_SSH_COMMAND"), Some("ssh -F /dev/null"));
        assert!(value("SSH_AUTH_SOCK").is_none());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = ProcessRunner::new("/nonexistent/git", Duration::from_secs(5));
        let err = runner
            .run(&GitCommand::new().arg("--version"))
            .await
            .unwrap_err();
        assert!(matches!(err, GitSyncError::Spawn { .. }));
    }
}
