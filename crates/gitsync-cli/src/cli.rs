//! Command line definition.
//!
//! Secrets never travel in argv: SSH keys are read from `--key-file` or the
//! `GITSYNC_SSH_KEY` environment variable, passwords from
//! `GITSYNC_PASSWORD`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gitsync_git::{PushSpec, RepositoryLocation};

/// Keep local git working copies in step with their remotes
#[derive(Debug, Parser)]
#[command(name = "gitsync", version)]
pub struct Cli {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, global = true, env = "GITSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, overriding the settings file (e.g. `debug`, `gitsync_git=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mirror-clone over SSH and turn the mirror into a working copy
    Clone {
        url: RepositoryLocation,
        destination: PathBuf,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Clone over HTTP(S), anonymously or with basic auth
    CloneHttps {
        url: RepositoryLocation,
        destination: PathBuf,
        /// Basic-auth user; the password comes from GITSYNC_PASSWORD
        #[arg(long, env = "GITSYNC_USERNAME")]
        username: Option<String>,
    },
    /// Manage branches
    Branch {
        #[command(subcommand)]
        action: BranchCommand,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagCommand,
    },
    /// Exit with status 0 if a commit exists locally, 1 otherwise
    CommitExists { destination: PathBuf, hash: String },
    /// Push to origin
    Push {
        destination: PathBuf,
        /// `--all`, `--tags`, `HEAD` or a refspec; repeatable, defaults to `HEAD`
        #[arg(long = "spec", allow_hyphen_values = true)]
        specs: Vec<PushSpec>,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Fetch one branch from origin into the local branch of the same name
    Fetch {
        destination: PathBuf,
        branch: String,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Force-checkout a branch, creating it when needed
    Checkout {
        destination: PathBuf,
        branch: String,
        /// Fetch every ref from origin first and track the remote branch
        #[arg(long)]
        remote: bool,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Check that basic-auth credentials can list a repository
    Probe {
        url: RepositoryLocation,
        #[arg(long, env = "GITSYNC_USERNAME")]
        username: Option<String>,
    },
    /// Print the checked out branch
    CurrentBranch { destination: PathBuf },
    /// Print the branch a remote's HEAD points to
    DefaultBranch {
        url: RepositoryLocation,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// List the refs a remote advertises
    ListRemote {
        url: RepositoryLocation,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// Create a branch without checking it out and push it to origin
    Create {
        destination: PathBuf,
        name: String,
        /// Start commit (full hash); defaults to HEAD
        #[arg(long)]
        from: Option<String>,
        #[command(flatten)]
        ssh: SshArgs,
    },
    /// Delete a local branch
    Remove { destination: PathBuf, name: String },
    /// Rename a local branch
    Rename {
        destination: PathBuf,
        from: String,
        to: String,
    },
    /// Create a branch from a parent and check it out
    Child {
        destination: PathBuf,
        parent: String,
        child: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// Tag the tip of a branch and push tags to origin
    Create {
        destination: PathBuf,
        source_branch: String,
        tag: String,
        #[command(flatten)]
        ssh: SshArgs,
    },
}

/// SSH identity for operations that talk to origin.
#[derive(Debug, Clone, Args)]
pub struct SshArgs {
    /// Private key file; falls back to the GITSYNC_SSH_KEY variable
    #[arg(long, env = "GITSYNC_SSH_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// SSH login user
    #[arg(long, env = "GITSYNC_SSH_USER", default_value = "git")]
    pub user: String,

    /// SSH port when the URL has none; defaults to the configured port
    #[arg(long)]
    pub port: Option<u16>,
}

/// Optional credentials: an SSH key, or a basic-auth user.
#[derive(Debug, Clone, Args)]
pub struct AuthArgs {
    /// Private key file; falls back to the GITSYNC_SSH_KEY variable
    #[arg(long, env = "GITSYNC_SSH_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// SSH login user
    #[arg(long, env = "GITSYNC_SSH_USER", default_value = "git")]
    pub user: String,

    /// Basic-auth user; the password comes from GITSYNC_PASSWORD
    #[arg(long, env = "GITSYNC_USERNAME", conflicts_with = "key_file")]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("gitsync").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_clone_arguments() {
        let cli = parse(&[
            "clone",
            "ssh://gerrit.example.com:29418/platform/api",
            "/work/api",
            "--key-file",
            "/run/secrets/id_ed25519",
            "--user",
            "ci",
        ]);
        match cli.command {
            Command::Clone {
                url,
                destination,
                ssh,
            } => {
                assert_eq!(url.port_or(22), 29418);
                assert_eq!(destination, PathBuf::from("/work/api"));
                assert_eq!(ssh.user, "ci");
                assert_eq!(ssh.key_file, Some(PathBuf::from("/run/secrets/id_ed25519")));
                assert_eq!(ssh.port, None);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_push_specs_accept_option_like_values() {
        let cli = parse(&["push", "/work/api", "--spec", "--all", "--spec", "--tags"]);
        match cli.command {
            Command::Push { specs, .. } => assert_eq!(specs, vec![PushSpec::All, PushSpec::Tags]),
            other => panic!("unexpected command {other:?}"),
        }

        let err = Cli::try_parse_from(["gitsync", "push", "/work/api", "--spec", "--force"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_branch_create_with_start_commit() {
        let cli = parse(&[
            "branch",
            "create",
            "/work/api",
            "release/1.0",
            "--from",
            "a1b2c3d4e5f6789012345678901234567890abcd",
            "--port",
            "2222",
        ]);
        match cli.command {
            Command::Branch {
                action: BranchCommand::Create { name, from, ssh, .. },
            } => {
                assert_eq!(name, "release/1.0");
                assert_eq!(from.as_deref(), Some("a1b2c3d4e5f6789012345678901234567890abcd"));
                assert_eq!(ssh.port, Some(2222));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_invalid_location_is_rejected_at_parse_time() {
        let err = Cli::try_parse_from(["gitsync", "list-remote", "--upload-pack=x"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_checkout_auth_is_exclusive() {
        let err = Cli::try_parse_from([
            "gitsync",
            "checkout",
            "/work/api",
            "main",
            "--key-file",
            "/k",
            "--username",
            "robot",
        ]);
        assert!(err.is_err());
    }
}
