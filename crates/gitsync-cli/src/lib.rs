//! gitsync - command line front-end for the gitsync engine.
//!
//! Every engine operation is exposed as a subcommand. Settings come from an
//! optional file plus `GITSYNC__*` environment variables.

pub mod cli;
pub mod commands;
pub mod error;
pub mod metrics;
pub mod settings;

pub use cli::Cli;
pub use error::CliError;
pub use settings::Settings;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
