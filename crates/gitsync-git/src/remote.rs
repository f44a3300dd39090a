//! Remote synchronization: push, fetch, checkout and remote ref listing.

use std::path::Path;

use gitsync_core::{Credential, PushSpec, RepositoryLocation};
use tracing::{debug, info, instrument};

use crate::engine::{GitEngine, with_ssh};
use crate::error::{GitSyncError, Result};
use crate::outcome::GitOperation;
use crate::repository::{GitRef, WorkingCopy};
use crate::runner::GitCommand;

/// A reference advertised by a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Full reference name, e.g. `refs/heads/main`.
    pub name: String,
    /// Object id the reference points to.
    pub oid: String,
}

impl GitEngine {
    /// Pushes `specs` to `origin`; no specs pushes the current branch.
    ///
    /// A push with nothing to send succeeds.
    #[instrument(skip(self, key, specs), fields(destination = %destination.display()))]
    pub async fn push(
        &self,
        key: &str,
        user: &str,
        destination: &Path,
        port: u16,
        specs: &[PushSpec],
    ) -> Result<()> {
        let default_spec = [PushSpec::default()];
        let specs = if specs.is_empty() { &default_spec[..] } else { specs };
        let target = destination.display().to_string();

        self.with_ssh_key(key, user, port, |ssh| async move {
            let command = GitCommand::new()
                .args(["push", "origin"])
                .args(specs.iter().map(PushSpec::as_arg))
                .current_dir(destination);
            self.run_tolerating(GitOperation::Push, &target, with_ssh(command, Some(&ssh)))
                .await
        })
        .await?;

        info!(specs = ?specs.iter().map(PushSpec::as_arg).collect::<Vec<_>>(), "pushed");
        Ok(())
    }

    /// Fetches a single branch from `origin` into the local branch of the
    /// same name.
    ///
    /// The checked out branch may be the target; only its reference moves,
    /// the worktree is left as it is.
    #[instrument(skip(self, key), fields(destination = %destination.display()))]
    pub async fn fetch(&self, key: &str, user: &str, destination: &Path, branch: &str) -> Result<()> {
        let git_ref = GitRef::branch(branch)?;
        let port = self.origin_port(destination).await?;
        let target = destination.display().to_string();

        self.with_ssh_key(key, user, port, |ssh| async move {
            let command = GitCommand::new()
                .args(["fetch", "--update-head-ok", "origin"])
                .arg(git_ref.same_name_refspec())
                .current_dir(destination);
            self.run_tolerating(GitOperation::Fetch, &target, with_ssh(command, Some(&ssh)))
                .await
        })
        .await?;

        info!("fetched");
        Ok(())
    }

    /// Checks out `branch`, discarding local modifications.
    ///
    /// With `remote` set, every ref of `origin` is fetched first and the
    /// branch is created only if `origin` does not have it; otherwise the
    /// fetched branch is checked out. Without `remote`, the branch is created
    /// when it does not exist locally.
    #[instrument(skip(self, credential), fields(destination = %destination.display()))]
    pub async fn checkout(
        &self,
        credential: Option<&Credential>,
        destination: &Path,
        branch: &str,
        remote: bool,
    ) -> Result<()> {
        let git_ref = GitRef::branch(branch)?;
        let copy = WorkingCopy::new(destination);
        let target = destination.display().to_string();
        let target = target.as_str();

        let on_remote = if remote {
            let origin = self.origin_url(destination).await?;
            self.with_credential(&origin, credential, |url, ssh| async move {
                let command = GitCommand::new()
                    .args(["fetch", "--update-head-ok"])
                    .arg(url)
                    .arg("refs/*:refs/*")
                    .current_dir(destination);
                let command = with_ssh(command, ssh.as_deref());
                self.run_tolerating(GitOperation::FetchAll, target, command)
                    .await
            })
            .await?;

            let full = git_ref.full_ref();
            self.list_remote_refs(&origin, credential)
                .await?
                .iter()
                .any(|r| r.name == full)
        } else {
            false
        };
        let locally = copy.ref_exists(&git_ref).await?;

        let create = should_create_branch(remote, on_remote, locally);
        debug!(on_remote, locally, create, "resolved checkout mode");

        let mut command = GitCommand::new().args(["checkout", "--force"]);
        if create {
            command = command.arg("-b");
        }
        let command = command.arg(git_ref.name()).current_dir(destination);
        self.run_checked("checkout", target, command).await?;

        info!(create, "checked out");
        Ok(())
    }

    /// Lists the refs `location` advertises.
    #[instrument(skip(self, credential), fields(location = %location))]
    pub async fn list_remote_refs(
        &self,
        location: &RepositoryLocation,
        credential: Option<&Credential>,
    ) -> Result<Vec<RemoteRef>> {
        let target = location.to_string();
        let output = self
            .with_credential(location, credential, |url, ssh| async move {
                let command = GitCommand::new().arg("ls-remote").arg(url);
                let command = with_ssh(command, ssh.as_deref());
                self.run_checked("ls-remote", &target, command).await
            })
            .await?;

        Ok(parse_ls_remote(&output.output))
    }

    /// Returns the branch the remote's `HEAD` points to.
    #[instrument(skip(self, credential), fields(location = %location))]
    pub async fn default_branch_name(
        &self,
        location: &RepositoryLocation,
        credential: Option<&Credential>,
    ) -> Result<String> {
        let target = location.to_string();
        let output = self
            .with_credential(location, credential, |url, ssh| async move {
                let command = GitCommand::new()
                    .args(["ls-remote", "--symref"])
                    .arg(url)
                    .arg("HEAD");
                let command = with_ssh(command, ssh.as_deref());
                self.run_checked("ls-remote", &target, command).await
            })
            .await?;

        parse_symref_head(&output.output).ok_or_else(|| GitSyncError::RefNotFound {
            name: "HEAD".to_string(),
            path: location.as_str().into(),
        })
    }

    /// Returns the `origin` URL configured in `destination`.
    pub async fn origin_url(&self, destination: &Path) -> Result<RepositoryLocation> {
        let command = GitCommand::new()
            .args(["config", "--get", "remote.origin.url"])
            .current_dir(destination);
        let output = self
            .run_checked("config", &destination.display().to_string(), command)
            .await?;
        Ok(RepositoryLocation::parse(output.output.trim())?)
    }

    /// Returns the SSH port for `origin`, falling back to the configured
    /// default.
    pub(crate) async fn origin_port(&self, destination: &Path) -> Result<u16> {
        let default = self.config().default_ssh_port();
        Ok(self.origin_url(destination).await?.port_or(default))
    }
}

/// Decides whether checkout has to create the branch.
///
/// With `remote`, a branch `origin` already has was fetched and is checked
/// out as is; a branch missing on `origin` is created unless it already
/// exists locally.
pub fn should_create_branch(remote: bool, on_remote: bool, locally: bool) -> bool {
    if remote && on_remote {
        return false;
    }
    !locally
}

/// Parses `git ls-remote` output, skipping anything that is not a ref line
/// (ssh warnings share the output stream).
pub fn parse_ls_remote(output: &str) -> Vec<RemoteRef> {
    output
        .lines()
        .filter_map(|line| {
            let (oid, name) = line.split_once('\t')?;
            let oid = oid.trim();
            if oid.len() < 40 || !oid.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            Some(RemoteRef {
                name: name.trim().to_string(),
                oid: oid.to_string(),
            })
        })
        .collect()
}

/// Extracts the branch from `ref: refs/heads/<name>\tHEAD`.
fn parse_symref_head(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (target, name) = line.strip_prefix("ref: ")?.split_once('\t')?;
        if name.trim() != "HEAD" {
            return None;
        }
        target.strip_prefix("refs/heads/").map(str::to_string)
    })
}
