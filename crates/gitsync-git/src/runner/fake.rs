//! In-memory command runner for tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{CommandOutput, CommandRunner, GitCommand};
use crate::error::{GitSyncError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Timeout,
}

#[derive(Debug)]
struct Rule {
    pattern: Vec<String>,
    reply: Reply,
    remaining: Option<usize>,
}

/// A [`CommandRunner`] that records every command and answers from a list of
/// canned replies.
///
/// A rule matches when its pattern appears as a contiguous run in the
/// command's arguments. Rules are tried in insertion order; commands that
/// match nothing succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<GitCommand>>,
}

impl FakeRunner {
    /// Creates a runner where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every matching command with `output`.
    pub fn reply(&self, pattern: &[&str], output: CommandOutput) -> &Self {
        self.push(pattern, Reply::Output(output), None)
    }

    /// Answers only the next matching command with `output`.
    pub fn reply_once(&self, pattern: &[&str], output: CommandOutput) -> &Self {
        self.push(pattern, Reply::Output(output), Some(1))
    }

    /// Makes every matching command fail with exit code 128.
    pub fn fail(&self, pattern: &[&str], output: &str) -> &Self {
        self.reply(pattern, CommandOutput::failure(128, output))
    }

    /// Makes every matching command time out.
    pub fn time_out(&self, pattern: &[&str]) -> &Self {
        self.push(pattern, Reply::Timeout, None)
    }

    fn push(&self, pattern: &[&str], reply: Reply, remaining: Option<usize>) -> &Self {
        self.rules.lock().push(Rule {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            reply,
            remaining,
        });
        self
    }

    /// Returns every command run so far.
    pub fn calls(&self) -> Vec<GitCommand> {
        self.calls.lock().clone()
    }

    /// Returns the argument vectors of every command run so far.
    pub fn call_args(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .map(|c| c.get_args().to_vec())
            .collect()
    }

    /// Returns the subcommands run so far, in order.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|c| c.subcommand().to_string())
            .collect()
    }

    /// Returns the commands whose arguments contain `pattern`.
    pub fn calls_matching(&self, pattern: &[&str]) -> Vec<GitCommand> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.contains_args(pattern))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &GitCommand) -> Result<CommandOutput> {
        self.calls.lock().push(command.clone());

        let reply = {
            let mut rules = self.rules.lock();
            let hit = rules.iter_mut().find(|rule| {
                rule.remaining != Some(0)
                    && command.contains_args(
                        &rule.pattern.iter().map(String::as_str).collect::<Vec<_>>(),
                    )
            });
            hit.map(|rule| {
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                rule.reply.clone()
            })
        };

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Timeout) => Err(GitSyncError::Timeout {
                operation: command.subcommand().to_string(),
                seconds: Duration::from_secs(1).as_secs(),
            }),
            None => Ok(CommandOutput::success("")),
        }
    }
}
