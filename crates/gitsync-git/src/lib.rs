//! # gitsync Git Engine
//!
//! Keeps local working copies in step with remote git repositories using
//! ephemeral credentials.
//!
//! The engine drives the system `git` binary for everything that talks to a
//! remote and uses gix for local reads and raw reference writes.
//!
//! ## Features
//!
//! - Shallow mirror clone, in-place unshallow and bare-to-normal conversion
//! - SSH keys materialized per operation and removed afterwards
//! - HTTP(S) basic auth embedded for the transfer only
//! - Branch and tag creation without checkout, pushed to `origin`
//! - Idempotent re-runs: "already exists" and "up-to-date" are successes
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use gitsync_git::{EngineConfig, GitEngine, RepositoryLocation};
//!
//! # async fn example(key: &str) -> gitsync_git::Result<()> {
//! let engine = GitEngine::new(EngineConfig::default())?;
//! let url = RepositoryLocation::parse("ssh://gerrit.example.com:29418/platform/api")?;
//! let dest = Path::new("/work/api");
//!
//! engine.clone_mirror_and_unshallow(key, "ci", &url, dest, 22).await?;
//! engine
//!     .create_remote_branch(key, "ci", dest, "release/1.0", None, 29418)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod credential;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod mirror;
pub mod outcome;
pub mod probe;
pub mod references;
pub mod remote;
pub mod repository;
pub mod runner;

// Re-exports
pub use config::{EngineConfig, EngineConfigBuilder};
pub use convert::ConversionStep;
pub use credential::KeyScope;
pub use engine::GitEngine;
pub use error::{GitSyncError, Result};
pub use metrics::register_metrics;
pub use outcome::{GitOperation, is_benign};
pub use remote::RemoteRef;
pub use repository::{GitRef, WorkingCopy};
pub use runner::{CommandOutput, CommandRunner, GitCommand, ProcessRunner};

// Re-export gitsync_core for consumers
pub use gitsync_core;
pub use gitsync_core::{Credential, PushSpec, RepositoryLocation};
