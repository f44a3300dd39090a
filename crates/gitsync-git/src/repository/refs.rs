//! Git reference names.

use std::fmt;

use crate::error::{GitSyncError, Result};

/// A branch or tag in a working copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitRef {
    /// `refs/heads/<name>`.
    Branch(String),

    /// `refs/tags/<name>`.
    Tag(String),
}

impl GitRef {
    /// Creates a validated branch reference.
    pub fn branch(name: impl Into<String>) -> Result<Self> {
        let git_ref = Self::Branch(name.into());
        git_ref.validate()?;
        Ok(git_ref)
    }

    /// Creates a validated tag reference.
    pub fn tag(name: impl Into<String>) -> Result<Self> {
        let git_ref = Self::Tag(name.into());
        git_ref.validate()?;
        Ok(git_ref)
    }

    /// Parses a full reference name (`refs/heads/...` or `refs/tags/...`).
    pub fn from_full_name(full: &str) -> Option<Self> {
        if let Some(name) = full.strip_prefix("refs/heads/") {
            return Some(Self::Branch(name.to_string()));
        }
        full.strip_prefix("refs/tags/")
            .map(|name| Self::Tag(name.to_string()))
    }

    /// Returns the reference name without prefix.
    pub fn name(&self) -> &str {
        match self {
            Self::Branch(name) | Self::Tag(name) => name,
        }
    }

    /// Returns the full reference path.
    pub fn full_ref(&self) -> String {
        match self {
            Self::Branch(name) => format!("refs/heads/{name}"),
            Self::Tag(name) => format!("refs/tags/{name}"),
        }
    }

    /// Returns the refspec that copies this reference to the same name.
    pub fn same_name_refspec(&self) -> String {
        let full = self.full_ref();
        format!("{full}:{full}")
    }

    /// Returns true if this is a branch reference.
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    /// Returns true if this is a tag reference.
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag(_))
    }

    /// Validates the reference name.
    ///
    /// Besides git's own rules, a leading `-` is refused so that a name can
    /// never be read as a command line option.
    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        check_name(name).map_err(|reason| GitSyncError::invalid_ref(name, reason))
    }
}

fn check_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("reference name cannot be empty");
    }

    if name.starts_with('-') {
        return Err("reference name cannot start with '-'");
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err("reference name cannot start or end with '/'");
    }

    if name.ends_with('.') || name.ends_with(".lock") {
        return Err("reference name cannot end with '.' or '.lock'");
    }

    if name.contains("..") || name.contains("@{") {
        return Err("reference name cannot contain '..' or '@{'");
    }

    if name.contains("//") {
        return Err("reference name cannot contain '//'");
    }

    if name == "@" || name.split('/').any(|part| part.starts_with('.')) {
        return Err("reference name components cannot start with '.'");
    }

    for c in name.chars() {
        if c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\') {
            return Err("reference name contains invalid characters");
        }
    }

    Ok(())
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "{name}"),
            Self::Tag(name) => write!(f, "tags/{name}"),
        }
    }
}

/// Checks that `hash` is a full hexadecimal SHA-1 object id.
///
/// SHA-256 repositories are not supported.
pub fn parse_object_id(hash: &str) -> Result<gix::ObjectId> {
    let hash = hash.trim();
    if hash.len() != 40 {
        return Err(GitSyncError::invalid_ref(
            hash,
            "commit hash must be a full hexadecimal object id",
        ));
    }
    gix::ObjectId::from_hex(hash.as_bytes()).map_err(|_| {
        GitSyncError::invalid_ref(hash, "commit hash must be a full hexadecimal object id")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_full_name() {
        assert_eq!(
            GitRef::from_full_name("refs/heads/release/1.0"),
            Some(GitRef::Branch("release/1.0".to_string()))
        );
        assert_eq!(
            GitRef::from_full_name("refs/tags/v1.0.0"),
            Some(GitRef::Tag("v1.0.0".to_string()))
        );
        assert_eq!(GitRef::from_full_name("refs/changes/01/1/1"), None);
    }

    #[test]
    fn test_full_ref() {
        let branch = GitRef::branch("release/1.0").unwrap();
        assert_eq!(branch.full_ref(), "refs/heads/release/1.0");
        assert_eq!(
            branch.same_name_refspec(),
            "refs/heads/release/1.0:refs/heads/release/1.0"
        );
        assert_eq!(GitRef::tag("v1.0.0").unwrap().full_ref(), "refs/tags/v1.0.0");
    }

    #[test]
    fn test_display() {
        assert_eq!(GitRef::branch("main").unwrap().to_string(), "main");
        assert_eq!(GitRef::tag("v1.0.0").unwrap().to_string(), "tags/v1.0.0");
    }

    #[test]
    fn test_validate() {
        assert!(GitRef::branch("main").is_ok());
        assert!(GitRef::branch("feature/test").is_ok());
        assert!(GitRef::tag("v1.0.0").is_ok());

        for bad in [
            "",
            "/main",
            "main/",
            "main..branch",
            "main branch",
            "--upload-pack=evil",
            "-f",
            "topic.lock",
            "a@{1}",
            ".hidden",
            "a/.b",
            "back\\slash",
            "colon:name",
        ] {
            let err = GitRef::branch(bad).unwrap_err();
            assert!(
                matches!(err, GitSyncError::InvalidRefName { .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_is_methods() {
        let branch = GitRef::branch("main").unwrap();
        assert!(branch.is_branch());
        assert!(!branch.is_tag());

        let tag = GitRef::tag("v1.0.0").unwrap();
        assert!(!tag.is_branch());
        assert!(tag.is_tag());
    }

    #[test]
    fn test_parse_object_id() {
        let sha = "a1b2c3d4e5f6789012345678901234567890abcd";
        assert_eq!(parse_object_id(sha).unwrap().to_string(), sha);
        assert!(parse_object_id("a1b2c3d4").is_err());
        assert!(parse_object_id("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_err());
        // SHA-256 ids are well-formed hex but unsupported.
        assert!(parse_object_id(&"ab".repeat(32)).is_err());
    }
}
