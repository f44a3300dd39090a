//! The synchronization engine.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use gitsync_core::{Credential, RepositoryLocation};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::credential::{KeyScope, ssh_command, with_basic_auth};
use crate::error::{GitSyncError, Result};
use crate::metrics::{self, CommandOutcome};
use crate::outcome::{GitOperation, is_benign};
use crate::runner::{CommandOutput, CommandRunner, GitCommand, ProcessRunner};

/// Entry point for every synchronization operation.
///
/// The engine holds no per-repository state: each call works on the
/// directory it is given, materializes its own credentials and cleans them
/// up before returning. It is cheap to clone and safe to share between
/// tasks operating on different directories.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use gitsync_git::{EngineConfig, GitEngine};
///
/// # async fn example() -> gitsync_git::Result<()> {
/// let engine = GitEngine::new(EngineConfig::default())?;
/// let exists = engine
///     .commit_exists(Path::new("/work/api"), "a1b2c3d4e5f6789012345678901234567890abcd")
///     .await?;
/// println!("commit present: {exists}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitEngine {
    config: Arc<EngineConfig>,
    runner: Arc<dyn CommandRunner>,
}

impl GitEngine {
    /// Creates an engine that runs the system git binary.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| GitSyncError::InvalidConfig(e.to_string()))?;
        let runner = Arc::new(ProcessRunner::from_config(&config));
        Ok(Self::with_runner(config, runner))
    }

    /// Creates an engine that executes git through `runner`.
    pub fn with_runner(config: EngineConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs a command and records it, without interpreting the exit status.
    pub(crate) async fn run(&self, command: &GitCommand) -> Result<CommandOutput> {
        self.execute(command, None).await
    }

    async fn execute(
        &self,
        command: &GitCommand,
        tolerate: Option<GitOperation>,
    ) -> Result<CommandOutput> {
        let started = Instant::now();
        let result = self.runner.run(command).await;
        let outcome = match &result {
            Ok(output) if output.is_success() => CommandOutcome::Success,
            Ok(output) if tolerate.is_some_and(|kind| is_benign(kind, &output.output)) => {
                CommandOutcome::Benign
            },
            Ok(_) => CommandOutcome::Failure,
            Err(_) => CommandOutcome::Error,
        };
        metrics::record_command(command.subcommand(), outcome, started.elapsed());
        result
    }

    /// Runs a command that must exit with status zero.
    pub(crate) async fn run_checked(
        &self,
        operation: &str,
        target: &str,
        command: GitCommand,
    ) -> Result<CommandOutput> {
        self.run(&command).await?.check(operation, target)
    }

    /// Runs a command whose failure is acceptable when its output matches
    /// the benign outcomes of `kind`.
    pub(crate) async fn run_tolerating(
        &self,
        kind: GitOperation,
        target: &str,
        command: GitCommand,
    ) -> Result<CommandOutput> {
        let output = self.execute(&command, Some(kind)).await?;
        if output.is_success() {
            return Ok(output);
        }
        if is_benign(kind, &output.output) {
            debug!(operation = %kind, output = %output.output.trim(), "treating failure as success");
            return Ok(output);
        }
        Err(output.into_error(&kind.to_string(), target))
    }

    /// Materializes `key` for the duration of `f`, handing it the
    /// `GIT_SSH_COMMAND` value to use. The key file is removed whether or
    /// not `f` succeeds.
    pub(crate) async fn with_ssh_key<T, F, Fut>(
        &self,
        key: &str,
        user: &str,
        port: u16,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let scope = KeyScope::create(key, user, self.config.key_dir().map(|p| p.as_path()))?;
        let ssh = ssh_command(
            scope.path(),
            user,
            port,
            self.config.strict_host_key_checking(),
        );

        let result = f(ssh).await;
        let closed = scope.close();

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "failed to remove ssh key after error");
                Err(e)
            },
        }
    }

    /// Runs `f` with the URL and optional `GIT_SSH_COMMAND` that reach
    /// `location` with `credential`.
    ///
    /// SSH keys are materialized for the duration of `f`; basic-auth
    /// credentials are embedded in the URL and require an HTTP(S) location.
    pub(crate) async fn with_credential<T, F, Fut>(
        &self,
        location: &RepositoryLocation,
        credential: Option<&Credential>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(String, Option<String>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let url = location.to_git_url();
        match credential {
            Some(Credential::SshKey { user, key }) => {
                let port = location.port_or(self.config.default_ssh_port());
                self.with_ssh_key(key, user, port, |ssh| f(url, Some(ssh)))
                    .await
            },
            Some(basic @ Credential::Basic { .. }) => {
                if !location.transport().is_http() {
                    return Err(GitSyncError::InvalidConfig(format!(
                        "basic auth cannot be used with {location}"
                    )));
                }
                f(with_basic_auth(&url, basic)?, None).await
            },
            None => f(url, None).await,
        }
    }
}

/// Adds `GIT_SSH_COMMAND` to a command when an ssh command is given.
pub(crate) fn with_ssh(command: GitCommand, ssh: Option<&str>) -> GitCommand {
    match ssh {
        Some(ssh) => command.env("GIT_SSH_COMMAND", ssh),
        None => command,
    }
}
