//! Branch and tag management on a working copy.
//!
//! Branches and tags are created by writing raw references, never by
//! checking anything out, and then pushed to `origin`. Creating a name that
//! already exists is a successful no-op.

use std::path::Path;

use gitsync_core::PushSpec;
use tracing::{info, instrument};

use crate::engine::GitEngine;
use crate::error::{GitSyncError, Result};
use crate::repository::{GitRef, WorkingCopy, parse_object_id};
use crate::runner::GitCommand;

impl GitEngine {
    /// Creates `branch` at `from_commit` (or `HEAD`) and pushes every branch
    /// to `origin`.
    ///
    /// Returns without changes if the branch already exists locally.
    #[instrument(skip(self, key), fields(destination = %destination.display()))]
    pub async fn create_remote_branch(
        &self,
        key: &str,
        user: &str,
        destination: &Path,
        branch: &str,
        from_commit: Option<&str>,
        port: u16,
    ) -> Result<()> {
        let git_ref = GitRef::branch(branch)?;
        let copy = WorkingCopy::new(destination);

        if copy.ref_exists(&git_ref).await? {
            info!("branch already exists, nothing to create");
            return Ok(());
        }

        let start = match from_commit.map(str::trim).filter(|c| !c.is_empty()) {
            Some(hash) => {
                let oid = parse_object_id(hash)?;
                if !copy.commit_exists(hash).await? {
                    return Err(GitSyncError::CommitNotFound {
                        hash: hash.to_string(),
                        path: destination.to_path_buf(),
                    });
                }
                oid
            },
            None => copy.head_commit().await?,
        };

        copy.write_reference(&git_ref, start).await?;
        info!(%start, "branch reference written");

        self.push(key, user, destination, port, &[PushSpec::All])
            .await
    }

    /// Creates `tag` at the tip of `source_branch` and pushes that tag alone
    /// to `origin`.
    ///
    /// Returns without changes if the tag already exists locally.
    #[instrument(skip(self, key), fields(destination = %destination.display()))]
    pub async fn create_remote_tag(
        &self,
        key: &str,
        user: &str,
        destination: &Path,
        source_branch: &str,
        tag: &str,
    ) -> Result<()> {
        let git_ref = GitRef::tag(tag)?;
        let copy = WorkingCopy::new(destination);

        if copy.ref_exists(&git_ref).await? {
            info!("tag already exists, nothing to create");
            return Ok(());
        }

        let tip = copy.resolve_branch(source_branch).await?;
        copy.write_reference(&git_ref, tip).await?;
        info!(%tip, "tag reference written");

        let port = self.origin_port(destination).await?;
        let spec = PushSpec::Refspec(git_ref.same_name_refspec());
        self.push(key, user, destination, port, &[spec]).await
    }

    /// Returns true if `hash` is a commit in the working copy.
    pub async fn commit_exists(&self, destination: &Path, hash: &str) -> Result<bool> {
        WorkingCopy::new(destination).commit_exists(hash).await
    }

    /// Returns the name of the checked out branch.
    pub async fn current_branch_name(&self, destination: &Path) -> Result<String> {
        WorkingCopy::new(destination).current_branch_name().await
    }

    /// Deletes a local branch, merged or not.
    #[instrument(skip(self), fields(destination = %destination.display()))]
    pub async fn remove_branch(&self, destination: &Path, branch: &str) -> Result<()> {
        let git_ref = GitRef::branch(branch)?;
        let command = GitCommand::new()
            .args(["branch", "-D"])
            .arg(git_ref.name())
            .current_dir(destination);
        self.run_checked("remove branch", &destination.display().to_string(), command)
            .await?;
        info!("branch removed");
        Ok(())
    }

    /// Renames a local branch.
    #[instrument(skip(self), fields(destination = %destination.display()))]
    pub async fn rename_branch(&self, destination: &Path, current: &str, new: &str) -> Result<()> {
        let from = GitRef::branch(current)?;
        let to = GitRef::branch(new)?;
        let command = GitCommand::new()
            .args(["branch", "-m"])
            .args([from.name(), to.name()])
            .current_dir(destination);
        self.run_checked("rename branch", &destination.display().to_string(), command)
            .await?;
        info!("branch renamed");
        Ok(())
    }

    /// Creates `child` from `parent` and checks it out.
    #[instrument(skip(self), fields(destination = %destination.display()))]
    pub async fn create_child_branch(
        &self,
        destination: &Path,
        parent: &str,
        child: &str,
    ) -> Result<()> {
        let parent = GitRef::branch(parent)?;
        let child = GitRef::branch(child)?;
        let command = GitCommand::new()
            .args(["checkout", "-b"])
            .args([child.name(), parent.name()])
            .current_dir(destination);
        self.run_checked("create child branch", &destination.display().to_string(), command)
            .await?;
        info!("child branch created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::runner::fake::FakeRunner;

    fn engine(runner: &Arc<FakeRunner>) -> GitEngine {
        GitEngine::with_runner(EngineConfig::default(), runner.clone())
    }

    #[tokio::test]
    async fn test_branch_maintenance_commands() {
        let runner = Arc::new(FakeRunner::new());
        let engine = engine(&runner);
        let dest = Path::new("/work/api");

        engine.remove_branch(dest, "old").await.unwrap();
        engine.rename_branch(dest, "a", "b").await.unwrap();
        engine
            .create_child_branch(dest, "main", "feature/x")
            .await
            .unwrap();

        assert_eq!(
            runner.call_args(),
            vec![
                vec!["branch", "-D", "old"],
                vec!["branch", "-m", "a", "b"],
                vec!["checkout", "-b", "feature/x", "main"],
            ]
        );
        assert!(
            runner
                .calls()
                .iter()
                .all(|c| c.get_current_dir() == Some(dest))
        );
    }

    #[tokio::test]
    async fn test_failure_carries_operation_and_output() {
        let runner = Arc::new(FakeRunner::new());
        runner.fail(&["branch", "-D"], "error: branch 'old' not found.");

        let err = engine(&runner)
            .remove_branch(Path::new("/work/api"), "old")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("remove branch failed for /work/api"));
        assert!(message.contains("branch 'old' not found"));
    }

    #[tokio::test]
    async fn test_option_like_names_never_reach_git() {
        let runner = Arc::new(FakeRunner::new());
        let engine = engine(&runner);
        let dest = Path::new("/work/api");

        assert!(engine.remove_branch(dest, "-f").await.is_err());
        assert!(engine.rename_branch(dest, "a", "--force").await.is_err());
        assert!(engine.create_child_branch(dest, "-", "x").await.is_err());
        assert!(
            engine
                .create_remote_tag("key", "ci", dest, "main", "--delete")
                .await
                .is_err()
        );
        assert!(runner.calls().is_empty());
    }
}
