//! Local repository reads and raw reference writes using gix.

use std::path::{Path, PathBuf};

use gix::refs::transaction::PreviousValue;
use tracing::debug;

use super::refs::{GitRef, parse_object_id};
use crate::error::{GitSyncError, Result};

/// A directory on local disk holding a git repository.
///
/// All gix work runs on the blocking thread pool; every call opens the
/// repository afresh, so a `WorkingCopy` never caches state that the git
/// binary could invalidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    path: PathBuf,
}

impl WorkingCopy {
    /// Creates a handle for the given directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the working copy directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the `.git` directory.
    pub fn git_dir(&self) -> PathBuf {
        self.path.join(".git")
    }

    /// Returns true if the directory exists.
    pub async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Returns true if the directory exists and has at least one entry.
    pub async fn is_populated(&self) -> Result<bool> {
        let mut entries = match tokio::fs::read_dir(&self.path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        Ok(entries.next_entry().await?.is_some())
    }

    /// Returns true if the directory holds a bare repository at the top level
    /// or has a `.git` subdirectory from an earlier conversion.
    pub async fn is_repository(&self) -> bool {
        if self.has_git_dir().await {
            return true;
        }
        let is_dir = |name: &'static str| {
            let path = self.path.join(name);
            async move { tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir()) }
        };
        let is_file = |name: &'static str| {
            let path = self.path.join(name);
            async move { tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) }
        };
        is_file("HEAD").await && is_file("config").await && is_dir("objects").await
    }

    /// Returns true if the directory has a `.git` subdirectory.
    pub async fn has_git_dir(&self) -> bool {
        tokio::fs::metadata(self.git_dir())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Returns the commit `HEAD` points to.
    pub async fn head_commit(&self) -> Result<gix::ObjectId> {
        self.blocking(|path| {
            let repo = open(path)?;
            let mut head = repo
                .head()
                .map_err(|e| GitSyncError::git(path, format!("cannot read HEAD: {e}")))?;
            let commit = head
                .peel_to_commit_in_place()
                .map_err(|e| GitSyncError::git(path, format!("cannot peel HEAD: {e}")))?;
            Ok(commit.id)
        })
        .await
    }

    /// Returns the short name of the checked out branch.
    pub async fn current_branch_name(&self) -> Result<String> {
        self.blocking(|path| {
            let repo = open(path)?;
            let name = repo
                .head_name()
                .map_err(|e| GitSyncError::git(path, format!("cannot read HEAD: {e}")))?
                .ok_or_else(|| GitSyncError::git(path, "HEAD is detached"))?;
            Ok(name.shorten().to_string())
        })
        .await
    }

    /// Returns true if the branch or tag exists locally.
    ///
    /// The reference namespace is walked to its end; a missing name is not
    /// an error but an unreadable reference is.
    pub async fn ref_exists(&self, git_ref: &GitRef) -> Result<bool> {
        let git_ref = git_ref.clone();
        self.blocking(move |path| {
            let repo = open(path)?;
            let full = git_ref.full_ref();
            let found = list_refs(&repo, path, &git_ref)?
                .into_iter()
                .any(|name| name == full);
            Ok(found)
        })
        .await
    }

    /// Returns the short names of all local branches.
    pub async fn list_branches(&self) -> Result<Vec<String>> {
        self.list_short(GitRef::Branch(String::new())).await
    }

    /// Returns the short names of all tags.
    pub async fn list_tags(&self) -> Result<Vec<String>> {
        self.list_short(GitRef::Tag(String::new())).await
    }

    async fn list_short(&self, kind: GitRef) -> Result<Vec<String>> {
        self.blocking(move |path| {
            let repo = open(path)?;
            Ok(list_refs(&repo, path, &kind)?
                .into_iter()
                .filter_map(|full| GitRef::from_full_name(&full))
                .map(|r| r.name().to_string())
                .collect())
        })
        .await
    }

    /// Returns the commit a local branch points to.
    pub async fn resolve_branch(&self, branch: &str) -> Result<gix::ObjectId> {
        let git_ref = GitRef::branch(branch)?;
        self.blocking(move |path| {
            let repo = open(path)?;
            let full = git_ref.full_ref();
            let reference = repo
                .try_find_reference(full.as_str())
                .map_err(|e| GitSyncError::git(path, format!("cannot read {full}: {e}")))?
                .ok_or_else(|| GitSyncError::RefNotFound {
                    name: full.clone(),
                    path: path.to_path_buf(),
                })?;
            let id = reference
                .into_fully_peeled_id()
                .map_err(|e| GitSyncError::git(path, format!("cannot peel {full}: {e}")))?;
            Ok(id.detach())
        })
        .await
    }

    /// Returns true if `hash` names a commit object in this repository.
    ///
    /// A string that is not an object id cannot name a commit, so it reads
    /// as absent rather than as an error.
    pub async fn commit_exists(&self, hash: &str) -> Result<bool> {
        let Ok(oid) = parse_object_id(hash) else {
            debug!(hash, "not an object id, treating as absent");
            return Ok(false);
        };
        self.blocking(move |path| {
            let repo = open(path)?;
            let object = repo
                .try_find_object(oid)
                .map_err(|e| GitSyncError::git(path, format!("cannot read object {oid}: {e}")))?;
            Ok(object.is_some_and(|o| o.kind == gix::object::Kind::Commit))
        })
        .await
    }

    /// Writes `git_ref` pointing at `target` without touching the worktree.
    ///
    /// Fails if the reference already exists or `target` is not a commit.
    pub async fn write_reference(&self, git_ref: &GitRef, target: gix::ObjectId) -> Result<()> {
        git_ref.validate()?;
        let git_ref = git_ref.clone();
        self.blocking(move |path| {
            let repo = open(path)?;
            let full = git_ref.full_ref();

            let is_commit = repo
                .try_find_object(target)
                .map_err(|e| GitSyncError::git(path, format!("cannot read object {target}: {e}")))?
                .is_some_and(|o| o.kind == gix::object::Kind::Commit);
            if !is_commit {
                return Err(GitSyncError::CommitNotFound {
                    hash: target.to_string(),
                    path: path.to_path_buf(),
                });
            }

            repo.reference(
                full.as_str(),
                target,
                PreviousValue::MustNotExist,
                format!("gitsync: create {git_ref}"),
            )
            .map_err(|e| GitSyncError::git(path, format!("cannot write {full}: {e}")))?;

            debug!(reference = %full, %target, "wrote reference");
            Ok(())
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || f(&path))
            .await
            .map_err(|e| GitSyncError::task(format!("repository task failed: {e}")))?
    }
}

fn open(path: &Path) -> Result<gix::Repository> {
    gix::open(path).map_err(|e| GitSyncError::git(path, format!("cannot open repository: {e}")))
}

/// Full names of every reference in the namespace of `kind`.
fn list_refs(repo: &gix::Repository, path: &Path, kind: &GitRef) -> Result<Vec<String>> {
    let platform = repo
        .references()
        .map_err(|e| GitSyncError::git(path, format!("cannot read references: {e}")))?;
    let iter = match kind {
        GitRef::Branch(_) => platform.local_branches(),
        GitRef::Tag(_) => platform.tags(),
    }
    .map_err(|e| GitSyncError::git(path, format!("cannot iterate references: {e}")))?;

    let mut names = Vec::new();
    for reference in iter {
        let reference = reference
            .map_err(|e| GitSyncError::git(path, format!("cannot read reference: {e}")))?;
        names.push(reference.name().as_bstr().to_string());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_is_populated() {
        let dir = tempfile::tempdir().unwrap();
        let copy = WorkingCopy::new(dir.path().join("repo"));

        assert!(!copy.exists().await);
        assert!(!copy.is_populated().await.unwrap());

        std::fs::create_dir(copy.path()).unwrap();
        assert!(copy.exists().await);
        assert!(!copy.is_populated().await.unwrap());

        std::fs::write(copy.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();
        assert!(copy.is_populated().await.unwrap());
        assert!(!copy.has_git_dir().await);
    }

    #[tokio::test]
    async fn test_is_repository() {
        let dir = tempfile::tempdir().unwrap();
        let copy = WorkingCopy::new(dir.path().join("repo"));
        assert!(!copy.is_repository().await);

        std::fs::create_dir(copy.path()).unwrap();
        std::fs::write(copy.path().join("notes.txt"), "mine\n").unwrap();
        std::fs::write(copy.path().join("HEAD"), "ref: refs/heads/main\n").unwrap();
        assert!(!copy.is_repository().await);

        std::fs::write(copy.path().join("config"), "[core]\n\tbare = true\n").unwrap();
        std::fs::create_dir(copy.path().join("objects")).unwrap();
        assert!(copy.is_repository().await);

        let converted = WorkingCopy::new(dir.path().join("converted"));
        std::fs::create_dir_all(converted.git_dir()).unwrap();
        assert!(converted.is_repository().await);
    }

    #[tokio::test]
    async fn test_open_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let copy = WorkingCopy::new(dir.path());
        let err = copy.head_commit().await.unwrap_err();
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_invalid_names_rejected_before_open() {
        let copy = WorkingCopy::new("/nonexistent/gitsync");
        assert!(matches!(
            copy.resolve_branch("-x").await.unwrap_err(),
            GitSyncError::InvalidRefName { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_absent() {
        // Never opened: a non-id cannot name a commit.
        let copy = WorkingCopy::new("/nonexistent/gitsync");
        assert!(!copy.commit_exists("abc123").await.unwrap());
        assert!(!copy.commit_exists(&"z".repeat(40)).await.unwrap());
        assert!(!copy.commit_exists("").await.unwrap());
    }
}
