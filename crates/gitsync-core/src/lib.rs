//! gitsync Core - Domain types
//!
//! This crate provides the foundational types shared by the gitsync engine
//! and its command line front-end: where a repository lives, how to
//! authenticate against it, and what to push.

pub mod error;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{Credential, LocationParts, PushSpec, RepositoryLocation, Transport};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_defined() {
        assert!(!version().is_empty());
    }

    #[test]
    fn version_is_semver() {
        let v = version();
        assert_eq!(v.split('.').count(), 3, "Version should be semver");
    }
}
