//! Mirror acquisition: shallow mirror clone, unshallow, conversion.
//!
//! A mirror clone at depth one transfers only the tips of every ref. The
//! history is then deepened in place and the bare mirror converted into a
//! working copy, which is cheaper than a full non-mirror clone.

use std::path::{Path, PathBuf};

use gitsync_core::{Credential, RepositoryLocation};
use tracing::{debug, info, instrument, warn};

use crate::convert::ConversionStep;
use crate::credential::with_basic_auth;
use crate::engine::{GitEngine, with_ssh};
use crate::error::{GitSyncError, Result};
use crate::outcome::GitOperation;
use crate::repository::WorkingCopy;
use crate::runner::{GitCommand, redact};

impl GitEngine {
    /// Clones `url` over SSH into `destination` and turns it into a complete,
    /// checked out working copy.
    ///
    /// A destination that is already populated is reused: a leftover bare
    /// mirror is unshallowed and converted, a converted copy only has its
    /// history completed. A non-empty directory holding neither is rejected
    /// before anything in it is moved.
    #[instrument(skip(self, key), fields(url = %url, destination = %destination.display()))]
    pub async fn clone_mirror_and_unshallow(
        &self,
        key: &str,
        user: &str,
        url: &RepositoryLocation,
        destination: &Path,
        port: u16,
    ) -> Result<()> {
        let credential = Credential::ssh_key(user, key);
        credential.validate()?;

        let port = url.port_or(port);
        let git_url = url.to_git_url();

        self.with_ssh_key(key, user, port, |ssh| async move {
            self.acquire(&git_url, destination, Some(&ssh)).await
        })
        .await?;

        info!("repository acquired");
        Ok(())
    }

    /// Clones an HTTP(S) `url` into `destination` the same way as
    /// [`clone_mirror_and_unshallow`](Self::clone_mirror_and_unshallow).
    ///
    /// Without credentials an anonymous GET first checks that the location
    /// is readable. With credentials they are embedded in the URL for the
    /// transfer only; `remote.origin.url` is reset to the plain URL before
    /// returning, on success and on failure.
    #[instrument(skip(self, password), fields(url = %url, destination = %destination.display()))]
    pub async fn clone_over_https(
        &self,
        url: &RepositoryLocation,
        username: Option<&str>,
        password: Option<&str>,
        destination: &Path,
    ) -> Result<()> {
        if !url.transport().is_http() {
            return Err(GitSyncError::Core(gitsync_core::CoreError::invalid_location(
                url.as_str(),
                "expected an http or https location",
            )));
        }

        let clean = url.to_git_url();
        let transfer_url = match Credential::basic_from_parts(username, password) {
            Some(credential) => {
                credential.validate()?;
                with_basic_auth(&clean, &credential)?
            },
            None => {
                self.preflight_anonymous(url).await?;
                clean.clone()
            },
        };

        let result = self.acquire(&transfer_url, destination, None).await;
        let scrubbed = self.scrub_origin_url(destination, &clean).await;

        match (result, scrubbed) {
            (Ok(()), Ok(())) => {
                info!("repository acquired");
                Ok(())
            },
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(e), Err(scrub_err)) => {
                warn!(error = %scrub_err, "failed to reset origin url after error");
                Err(e)
            },
        }
    }

    /// Clone (unless populated), unshallow the bare mirror, convert, pull.
    async fn acquire(&self, url: &str, destination: &Path, ssh: Option<&str>) -> Result<()> {
        let copy = WorkingCopy::new(destination);
        let target = redact(url);
        let ssh_env = |command: GitCommand| with_ssh(command, ssh);

        if copy.is_populated().await? {
            if !copy.is_repository().await {
                return Err(GitSyncError::conversion(
                    ConversionStep::CreateGitDir,
                    destination,
                    "destination is not empty and holds no git repository",
                ));
            }
            debug!("destination already populated, reusing it");
        } else {
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let clone = GitCommand::new()
                .args(["clone", "--mirror", "--depth", "1", "--no-single-branch"])
                .arg(url)
                .path_arg(destination);
            self.run_checked("mirror clone", &target, ssh_env(clone))
                .await?;
            debug!("shallow mirror cloned");
        }

        // Only a not yet converted mirror keeps its shallow marker at the top.
        if tokio::fs::try_exists(destination.join("shallow")).await? {
            let unshallow = GitCommand::new()
                .git_dir(destination)
                .args(["fetch", "--unshallow", "origin"]);
            self.run_tolerating(GitOperation::Unshallow, &target, ssh_env(unshallow))
                .await?;
            debug!("mirror unshallowed");
        }

        self.bare_to_normal(destination).await?;

        let pull = GitCommand::new()
            .args(["pull", "origin", "--unshallow", "--no-rebase"])
            .current_dir(destination);
        self.run_tolerating(GitOperation::Unshallow, &target, ssh_env(pull))
            .await?;

        Ok(())
    }

    /// Points `remote.origin.url` back at `clean` if a repository exists.
    async fn scrub_origin_url(&self, destination: &Path, clean: &str) -> Result<()> {
        let Some(git_dir) = repository_dir(destination).await? else {
            return Ok(());
        };
        let command = GitCommand::new()
            .git_dir(&git_dir)
            .args(["config", "--local", "remote.origin.url", clean]);
        self.run_checked("config", &git_dir.display().to_string(), command)
            .await?;
        Ok(())
    }
}

/// Returns the git directory in `destination`, converted or bare.
async fn repository_dir(destination: &Path) -> Result<Option<PathBuf>> {
    let converted = destination.join(".git");
    if tokio::fs::try_exists(converted.join("config")).await? {
        return Ok(Some(converted));
    }
    if tokio::fs::try_exists(destination.join("config")).await? {
        return Ok(Some(destination.to_path_buf()));
    }
    Ok(None)
}
