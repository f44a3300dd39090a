//! Dispatch of parsed commands to the engine.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use gitsync_git::{Credential, GitEngine};
use tracing::info;
use zeroize::Zeroizing;

use crate::cli::{AuthArgs, BranchCommand, Command, SshArgs, TagCommand};
use crate::error::CliError;
use crate::settings::Settings;

const KEY_ENV: &str = "GITSYNC_SSH_KEY";
const PASSWORD_ENV: &str = "GITSYNC_PASSWORD";

/// Runs one command to completion.
pub async fn run(command: Command, engine: &GitEngine, settings: &Settings) -> Result<ExitCode> {
    let default_port = settings.ssh_port;

    match command {
        Command::Clone {
            url,
            destination,
            ssh,
        } => {
            let key = read_key(&ssh)?;
            engine
                .clone_mirror_and_unshallow(
                    &key,
                    &ssh.user,
                    &url,
                    &destination,
                    ssh.port.unwrap_or(default_port),
                )
                .await
                .with_context(|| format!("cloning {url}"))?;
            info!(destination = %destination.display(), "clone complete");
        },
        Command::CloneHttps {
            url,
            destination,
            username,
        } => {
            let password = password();
            engine
                .clone_over_https(
                    &url,
                    username.as_deref(),
                    password.as_deref().map(String::as_str),
                    &destination,
                )
                .await
                .with_context(|| format!("cloning {url}"))?;
            info!(destination = %destination.display(), "clone complete");
        },
        Command::Branch { action } => branch(action, engine, default_port).await?,
        Command::Tag {
            action:
                TagCommand::Create {
                    destination,
                    source_branch,
                    tag,
                    ssh,
                },
        } => {
            let key = read_key(&ssh)?;
            engine
                .create_remote_tag(&key, &ssh.user, &destination, &source_branch, &tag)
                .await
                .with_context(|| format!("creating tag {tag}"))?;
        },
        Command::CommitExists { destination, hash } => {
            let exists = engine.commit_exists(&destination, &hash).await?;
            println!("{exists}");
            return Ok(if exists {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        },
        Command::Push {
            destination,
            specs,
            ssh,
        } => {
            let key = read_key(&ssh)?;
            let port = ssh.port.unwrap_or(default_port);
            engine
                .push(&key, &ssh.user, &destination, port, &specs)
                .await
                .context("pushing to origin")?;
        },
        Command::Fetch {
            destination,
            branch,
            ssh,
        } => {
            let key = read_key(&ssh)?;
            engine
                .fetch(&key, &ssh.user, &destination, &branch)
                .await
                .with_context(|| format!("fetching {branch}"))?;
        },
        Command::Checkout {
            destination,
            branch,
            remote,
            auth,
        } => {
            let credential = credential(&auth)?;
            engine
                .checkout(credential.as_ref(), &destination, &branch, remote)
                .await
                .with_context(|| format!("checking out {branch}"))?;
        },
        Command::Probe { url, username } => {
            let password = password();
            let allowed = engine
                .check_permissions(
                    &url,
                    username.as_deref(),
                    password.as_deref().map(String::as_str),
                )
                .await;
            println!("{}", if allowed { "accessible" } else { "denied" });
            return Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        },
        Command::CurrentBranch { destination } => {
            println!("{}", engine.current_branch_name(&destination).await?);
        },
        Command::DefaultBranch { url, auth } => {
            let credential = credential(&auth)?;
            let branch = engine
                .default_branch_name(&url, credential.as_ref())
                .await
                .with_context(|| format!("reading HEAD of {url}"))?;
            println!("{branch}");
        },
        Command::ListRemote { url, auth } => {
            let credential = credential(&auth)?;
            let refs = engine
                .list_remote_refs(&url, credential.as_ref())
                .await
                .with_context(|| format!("listing {url}"))?;
            for r in refs {
                println!("{}\t{}", r.oid, r.name);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

async fn branch(action: BranchCommand, engine: &GitEngine, default_port: u16) -> Result<()> {
    match action {
        BranchCommand::Create {
            destination,
            name,
            from,
            ssh,
        } => {
            let key = read_key(&ssh)?;
            engine
                .create_remote_branch(
                    &key,
                    &ssh.user,
                    &destination,
                    &name,
                    from.as_deref(),
                    ssh.port.unwrap_or(default_port),
                )
                .await
                .with_context(|| format!("creating branch {name}"))?;
        },
        BranchCommand::Remove { destination, name } => {
            engine.remove_branch(&destination, &name).await?;
        },
        BranchCommand::Rename {
            destination,
            from,
            to,
        } => {
            engine.rename_branch(&destination, &from, &to).await?;
        },
        BranchCommand::Child {
            destination,
            parent,
            child,
        } => {
            engine
                .create_child_branch(&destination, &parent, &child)
                .await?;
        },
    }
    Ok(())
}

/// Reads the SSH key from `--key-file` or `GITSYNC_SSH_KEY`.
fn read_key(ssh: &SshArgs) -> Result<Zeroizing<String>, CliError> {
    load_key(ssh.key_file.as_deref(), std::env::var(KEY_ENV).ok())
}

fn load_key(path: Option<&Path>, from_env: Option<String>) -> Result<Zeroizing<String>, CliError> {
    match (path, from_env) {
        (Some(path), _) => std::fs::read_to_string(path)
            .map(Zeroizing::new)
            .map_err(|source| CliError::KeyFile {
                path: path.to_path_buf(),
                source,
            }),
        (None, Some(key)) if !key.trim().is_empty() => Ok(Zeroizing::new(key)),
        _ => Err(CliError::MissingKey),
    }
}

fn password() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV).ok().map(Zeroizing::new)
}

/// Picks the credential for operations that accept either kind.
fn credential(auth: &AuthArgs) -> Result<Option<Credential>, CliError> {
    if let Some(username) = &auth.username {
        let password = password();
        return Ok(Credential::basic_from_parts(
            Some(username.as_str()),
            password.as_deref().map(String::as_str),
        ));
    }
    match load_key(auth.key_file.as_deref(), std::env::var(KEY_ENV).ok()) {
        Ok(key) => Ok(Some(Credential::ssh_key(&auth.user, key.as_str()))),
        Err(CliError::MissingKey) => Ok(None),
        Err(e) => Err(e),
    }
}
