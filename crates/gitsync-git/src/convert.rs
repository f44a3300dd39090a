//! Turning a bare mirror into a normal working copy in place.
//!
//! The conversion is resumable: every step is skipped or repeated safely
//! when a previous run stopped part way, so re-running it on a half
//! converted directory finishes the job instead of failing.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::engine::GitEngine;
use crate::error::{GitSyncError, Result};
use crate::runner::GitCommand;

/// The steps of a bare-to-normal conversion, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStep {
    /// Create the `.git` subdirectory.
    CreateGitDir,
    /// Move every other top-level entry into `.git`.
    MoveEntries,
    /// Set `core.bare=false` and `remote.origin.mirror=false`.
    Configure,
    /// `reset --hard` to populate the worktree.
    ResetWorktree,
}

impl fmt::Display for ConversionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateGitDir => "create git dir",
            Self::MoveEntries => "move entries",
            Self::Configure => "configure",
            Self::ResetWorktree => "reset worktree",
        };
        f.write_str(name)
    }
}

impl GitEngine {
    /// Converts the bare repository at `dir` into a non-bare working copy.
    ///
    /// Afterwards `dir/.git` holds the former object store, `core.bare`
    /// reads `false` and the worktree matches `HEAD`. A directory that is
    /// already configured as non-bare only gets its worktree reset.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub async fn bare_to_normal(&self, dir: &Path) -> Result<()> {
        let git_dir = dir.join(".git");

        if self.is_configured_non_bare(&git_dir).await? {
            debug!("already configured as non-bare");
        } else {
            tokio::fs::create_dir_all(&git_dir)
                .await
                .map_err(|e| GitSyncError::conversion(ConversionStep::CreateGitDir, dir, e.to_string()))?;

            let moved = move_entries(dir, &git_dir).await?;
            debug!(moved, "moved repository entries into .git");

            for (key, value) in [("core.bare", "false"), ("remote.origin.mirror", "false")] {
                let command = GitCommand::new()
                    .git_dir(&git_dir)
                    .args(["config", "--local", key, value]);
                self.run_checked("config", &git_dir.display().to_string(), command)
                    .await
                    .map_err(|e| {
                        GitSyncError::conversion(ConversionStep::Configure, dir, e.to_string())
                    })?;
            }
        }

        let command = GitCommand::new().args(["reset", "--hard"]).current_dir(dir);
        self.run_checked("reset", &dir.display().to_string(), command)
            .await
            .map_err(|e| GitSyncError::conversion(ConversionStep::ResetWorktree, dir, e.to_string()))?;

        info!("converted bare mirror into working copy");
        Ok(())
    }

    /// Returns true if `git_dir` exists and its local config says
    /// `core.bare=false`.
    async fn is_configured_non_bare(&self, git_dir: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(git_dir.join("config")).await? {
            return Ok(false);
        }
        let command = GitCommand::new()
            .git_dir(git_dir)
            .args(["config", "--local", "--get", "--bool", "core.bare"]);
        let output = self.run(&command).await?;
        // Exit 1 means the key is unset.
        Ok(output.is_success() && output.output.trim() == "false")
    }
}

/// Moves every entry of `dir` except `.git` into `git_dir`, returning how
/// many were moved. Entries already moved by an earlier run are simply gone
/// from `dir`; an entry present in both places is a conflict.
async fn move_entries(dir: &Path, git_dir: &Path) -> Result<usize> {
    let step_err = |message: String| GitSyncError::conversion(ConversionStep::MoveEntries, dir, message);

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| step_err(e.to_string()))?;

    let mut moved = 0;
    while let Some(entry) = entries.next_entry().await.map_err(|e| step_err(e.to_string()))? {
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let target = git_dir.join(&name);
        if tokio::fs::try_exists(&target)
            .await
            .map_err(|e| step_err(e.to_string()))?
        {
            return Err(step_err(format!(
                "{} already exists in .git",
                name.to_string_lossy()
            )));
        }
        tokio::fs::rename(entry.path(), &target)
            .await
            .map_err(|e| step_err(format!("cannot move {}: {e}", name.to_string_lossy())))?;
        moved += 1;
    }
    Ok(moved)
}
