//! Handing credentials to git.
//!
//! SSH keys go through a [`KeyScope`]: a uniquely named, owner-read-only
//! file removed when the scope ends. Names combine the process id with
//! random bytes, so concurrent scopes never collide. Basic-auth credentials
//! are embedded in the remote URL.

use std::io::Write;
use std::path::Path;

use gitsync_core::{CoreError, Credential};
use tempfile::TempPath;
use tracing::debug;

use crate::error::{GitSyncError, Result};
use crate::metrics;

const KEY_FILE_RANDOM_BYTES: usize = 12;

/// A private key materialized on disk for the lifetime of one operation.
#[derive(Debug)]
pub struct KeyScope {
    path: TempPath,
    user: String,
}

impl KeyScope {
    /// Writes `key` to a fresh file in `dir` (or the OS temp directory).
    ///
    /// The key text is normalised first: carriage returns are stripped,
    /// surrounding whitespace trimmed and a trailing newline added, since
    /// ssh refuses PEM files without one.
    pub fn create(key: &str, user: &str, dir: Option<&Path>) -> Result<Self> {
        let prefix = format!("gitsync-key-{}-", std::process::id());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).rand_bytes(KEY_FILE_RANDOM_BYTES);

        let created = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        let mut file =
            created.map_err(|e| GitSyncError::key_scope(user, "cannot create key file", e))?;

        let normalised = key.replace('\r', "");
        file.write_all(normalised.trim().as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.flush())
            .map_err(|e| GitSyncError::key_scope(user, "cannot write key file", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o400))
                .map_err(|e| GitSyncError::key_scope(user, "cannot restrict key file", e))?;
        }

        let path = file.into_temp_path();
        metrics::record_key_scope();
        debug!(user, path = %path.display(), "materialized ssh key");

        Ok(Self {
            path,
            user: user.to_string(),
        })
    }

    /// Returns the key file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the user the key belongs to.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Removes the key file, reporting a failed removal.
    ///
    /// Dropping the scope also removes the file but ignores failures.
    pub fn close(self) -> Result<()> {
        let Self { path, user } = self;
        debug!(user = %user, "removing ssh key");
        path.close()
            .map_err(|e| GitSyncError::key_scope(user, "cannot remove key file", e))
    }
}

/// Builds the `GIT_SSH_COMMAND` value for a key file.
///
/// User ssh configuration, agents and other identities are ignored. Host key
/// checking is disabled unless `strict` is set.
pub fn ssh_command(key_path: &Path, user: &str, port: u16, strict: bool) -> String {
    let mut parts = vec![
        "ssh".to_string(),
        "-i".to_string(),
        shell_quote(&key_path.to_string_lossy()),
        "-l".to_string(),
        shell_quote(user),
        "-p".to_string(),
        port.to_string(),
        "-F".to_string(),
        "/dev/null".to_string(),
        "-o".to_string(),
        "IdentitiesOnly=yes".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
    ];
    if strict {
        parts.extend(["-o".to_string(), "StrictHostKeyChecking=yes".to_string()]);
    } else {
        parts.extend([
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
        ]);
    }
    parts.join(" ")
}

/// Quotes a value for the POSIX shell git uses to run `GIT_SSH_COMMAND`.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Embeds basic-auth credentials in an HTTP(S) URL.
pub fn with_basic_auth(url: &str, credential: &Credential) -> Result<String> {
    let Credential::Basic { username, password } = credential else {
        return Err(GitSyncError::InvalidConfig(
            "basic auth requires a username/password credential".to_string(),
        ));
    };

    let mut parsed = reqwest::Url::parse(url).map_err(|e| {
        GitSyncError::Core(CoreError::invalid_location(url, e.to_string()))
    })?;
    let rejected = || {
        GitSyncError::Core(CoreError::invalid_location(
            url,
            "cannot carry credentials",
        ))
    };
    parsed.set_username(username).map_err(|()| rejected())?;
    let password = (!password.is_empty()).then_some(password.as_str());
    parsed.set_password(password).map_err(|()| rejected())?;
    Ok(parsed.into())
}
