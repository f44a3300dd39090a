//! Engine metrics recorded through the `metrics` facade.
//!
//! Nothing is exported unless the embedding process installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

/// Git invocations, labelled by subcommand and outcome.
pub const GIT_COMMANDS_TOTAL: &str = "gitsync_git_commands_total";
/// Wall time of git invocations, labelled by subcommand.
pub const GIT_COMMAND_SECONDS: &str = "gitsync_git_command_seconds";
/// Ephemeral key files materialized.
pub const KEY_SCOPES_TOTAL: &str = "gitsync_key_scopes_total";

/// How a git invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exit status zero.
    Success,
    /// Non-zero exit that the operation treats as success.
    Benign,
    /// Non-zero exit.
    Failure,
    /// Killed at the deadline, or could not be spawned.
    Error,
}

impl CommandOutcome {
    /// Returns the label value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Benign => "benign",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

/// Describes the engine metrics. Call once after installing a recorder.
pub fn register_metrics() {
    metrics::describe_counter!(GIT_COMMANDS_TOTAL, "Total number of git invocations");
    metrics::describe_histogram!(
        GIT_COMMAND_SECONDS,
        metrics::Unit::Seconds,
        "Time spent in git invocations"
    );
    metrics::describe_counter!(KEY_SCOPES_TOTAL, "Total number of ephemeral SSH key files");
}

/// Records one finished git invocation.
pub fn record_command(subcommand: &str, outcome: CommandOutcome, elapsed: Duration) {
    counter!(
        GIT_COMMANDS_TOTAL,
        "subcommand" => subcommand.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(GIT_COMMAND_SECONDS, "subcommand" => subcommand.to_string())
        .record(elapsed.as_secs_f64());
}

/// Records one materialized key file.
pub fn record_key_scope() {
    counter!(KEY_SCOPES_TOTAL).increment(1);
}
