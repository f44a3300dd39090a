//! Common type definitions and newtypes for gitsync.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// How a repository location is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// `ssh://` URLs, scp-like `user@host:path` and `host:port/path`.
    Ssh,
    /// `https://` URLs.
    Https,
    /// Plain `http://` URLs.
    Http,
    /// `file://` URLs.
    File,
    /// A bare filesystem path.
    Local,
}

impl Transport {
    /// Returns true for the smart-HTTP transports.
    pub fn is_http(self) -> bool {
        matches!(self, Self::Https | Self::Http)
    }
}

/// The decomposed form of a [`RepositoryLocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationParts {
    /// Transport used to reach the repository.
    pub transport: Transport,
    /// Login user embedded in the location, if any.
    pub user: Option<String>,
    /// Remote host (absent for local repositories).
    pub host: Option<String>,
    /// Explicit port, if any.
    pub port: Option<u16>,
    /// Repository path on the host.
    pub path: String,
    /// Whether the location used the `host:port/path` shorthand.
    pub port_shorthand: bool,
}

/// Where a remote repository lives.
///
/// Accepts URLs (`ssh://`, `https://`, `http://`, `file://`), scp-like
/// `user@host:path` locations, the Gerrit style `host:port/path` shorthand
/// and plain filesystem paths.
///
/// # Example
///
/// ```
/// use gitsync_core::{RepositoryLocation, Transport};
///
/// let location = RepositoryLocation::parse("gerrit:29418/platform/api").unwrap();
/// assert_eq!(location.transport(), Transport::Ssh);
/// assert_eq!(location.to_git_url(), "ssh://gerrit:29418/platform/api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryLocation(String);

impl RepositoryLocation {
    /// Parses and validates a repository location.
    pub fn parse(location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid_location(location, "location cannot be empty"));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::invalid_location(
                location,
                "location cannot contain whitespace",
            ));
        }
        if trimmed.starts_with('-') {
            return Err(CoreError::invalid_location(
                location,
                "location cannot start with '-'",
            ));
        }

        let candidate = Self(trimmed.to_string());
        candidate.parts()?;
        Ok(candidate)
    }

    /// Returns the location as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the transport used to reach the repository.
    pub fn transport(&self) -> Transport {
        self.parts().map(|p| p.transport).unwrap_or(Transport::Local)
    }

    /// Returns the port, falling back to `default` when none is present.
    pub fn port_or(&self, default: u16) -> u16 {
        self.parts().ok().and_then(|p| p.port).unwrap_or(default)
    }

    /// Returns the location in a form the git binary understands.
    ///
    /// The `host:port/path` shorthand is rewritten into an `ssh://` URL;
    /// every other form is returned unchanged.
    pub fn to_git_url(&self) -> String {
        match self.parts() {
            Ok(parts) if parts.port_shorthand => {
                let user = parts.user.map(|u| format!("{u}@")).unwrap_or_default();
                let host = parts.host.unwrap_or_default();
                let port = parts.port.map(|p| format!(":{p}")).unwrap_or_default();
                format!("ssh://{user}{host}{port}/{}", parts.path.trim_start_matches('/'))
            },
            _ => self.0.clone(),
        }
    }

    /// Decomposes the location.
    pub fn parts(&self) -> Result<LocationParts> {
        let raw = self.0.as_str();

        if let Some((scheme, rest)) = raw.split_once("://") {
            return Self::url_parts(raw, scheme, rest);
        }

        if raw.starts_with('/') || raw.starts_with("./") || raw.starts_with("../") {
            return Ok(LocationParts {
                transport: Transport::Local,
                user: None,
                host: None,
                port: None,
                path: raw.to_string(),
                port_shorthand: false,
            });
        }

        let Some((authority, path)) = raw.split_once(':') else {
            return Ok(LocationParts {
                transport: Transport::Local,
                user: None,
                host: None,
                port: None,
                path: raw.to_string(),
                port_shorthand: false,
            });
        };

        let (user, host) = split_user(authority);
        if host.is_empty() {
            return Err(CoreError::invalid_location(raw, "missing host"));
        }

        // host:port/path
        if let Some((port, path)) = path.split_once('/')
            && !port.is_empty()
            && port.chars().all(|c| c.is_ascii_digit())
        {
            let port = port
                .parse::<u16>()
                .map_err(|_| CoreError::invalid_location(raw, "port out of range"))?;
            if path.is_empty() {
                return Err(CoreError::invalid_location(raw, "missing repository path"));
            }
            return Ok(LocationParts {
                transport: Transport::Ssh,
                user,
                host: Some(host.to_string()),
                port: Some(port),
                path: path.to_string(),
                port_shorthand: true,
            });
        }

        if path.is_empty() {
            return Err(CoreError::invalid_location(raw, "missing repository path"));
        }

        Ok(LocationParts {
            transport: Transport::Ssh,
            user,
            host: Some(host.to_string()),
            port: None,
            path: path.to_string(),
            port_shorthand: false,
        })
    }

    fn url_parts(raw: &str, scheme: &str, rest: &str) -> Result<LocationParts> {
        let transport = match scheme.to_ascii_lowercase().as_str() {
            "ssh" | "git+ssh" | "ssh+git" => Transport::Ssh,
            "https" => Transport::Https,
            "http" => Transport::Http,
            "file" => Transport::File,
            other => {
                return Err(CoreError::invalid_location(
                    raw,
                    format!("unsupported scheme '{other}'"),
                ));
            },
        };

        if transport == Transport::File {
            if rest.is_empty() {
                return Err(CoreError::invalid_location(raw, "missing repository path"));
            }
            return Ok(LocationParts {
                transport,
                user: None,
                host: None,
                port: None,
                path: rest.to_string(),
                port_shorthand: false,
            });
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        if path.trim_start_matches('/').is_empty() {
            return Err(CoreError::invalid_location(raw, "missing repository path"));
        }

        let (user, host_port) = split_user(authority);
        let (host, port) = match host_port.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| CoreError::invalid_location(raw, "invalid port"))?;
                (host, Some(port))
            },
            None => (host_port, None),
        };
        if host.is_empty() {
            return Err(CoreError::invalid_location(raw, "missing host"));
        }

        Ok(LocationParts {
            transport,
            user,
            host: Some(host.to_string()),
            port,
            path: path.to_string(),
            port_shorthand: false,
        })
    }
}

/// Splits `user[:password]@host` into the user and the host part.
fn split_user(authority: &str) -> (Option<String>, &str) {
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            let user = (!user.is_empty()).then(|| user.to_string());
            (user, host)
        },
        None => (None, authority),
    }
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RepositoryLocation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepositoryLocation {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<RepositoryLocation> for String {
    fn from(location: RepositoryLocation) -> Self {
        location.0
    }
}

/// Credentials for a single operation.
///
/// Secret halves are wiped from memory when the credential is dropped and
/// never appear in `Debug` output.
#[derive(Clone)]
pub enum Credential {
    /// SSH private key (PEM text) and login user.
    SshKey {
        /// Login user passed to ssh.
        user: String,
        /// Private key material.
        key: Zeroizing<String>,
    },
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password or access token.
        password: Zeroizing<String>,
    },
}

impl Credential {
    /// Creates an SSH key credential.
    pub fn ssh_key(user: impl Into<String>, key: impl Into<String>) -> Self {
        Self::SshKey {
            user: user.into(),
            key: Zeroizing::new(key.into()),
        }
    }

    /// Creates a basic-auth credential.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Builds a basic-auth credential from optional parts.
    ///
    /// Returns `None` when both parts are empty, which callers treat as
    /// anonymous access.
    pub fn basic_from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        let username = username.unwrap_or_default();
        let password = password.unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            return None;
        }
        Some(Self::basic(username, password))
    }

    /// Returns the user the credential authenticates as.
    pub fn user(&self) -> &str {
        match self {
            Self::SshKey { user, .. } => user,
            Self::Basic { username, .. } => username,
        }
    }

    /// Returns true for SSH key credentials.
    pub fn is_ssh(&self) -> bool {
        matches!(self, Self::SshKey { .. })
    }

    /// Validates that the credential can be used.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::SshKey { user, key } => {
                if user.trim().is_empty() {
                    return Err(CoreError::validation_error("user", "cannot be empty"));
                }
                if key.trim().is_empty() {
                    return Err(CoreError::validation_error("key", "cannot be empty"));
                }
            },
            Self::Basic { username, .. } => {
                if username.trim().is_empty() {
                    return Err(CoreError::validation_error("username", "cannot be empty"));
                }
            },
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SshKey { user, .. } => f
                .debug_struct("SshKey")
                .field("user", user)
                .field("key", &"<redacted>")
                .finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// What a push sends to `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushSpec {
    /// Every local branch (`--all`).
    All,
    /// Every local tag (`--tags`).
    Tags,
    /// The checked out branch under the same name (`HEAD`).
    CurrentBranch,
    /// An explicit refspec such as `refs/heads/a:refs/heads/b`.
    Refspec(String),
}

impl PushSpec {
    /// Parses a push spec, rejecting anything that git would read as an
    /// option other than `--all` and `--tags`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        match spec {
            "" => Err(CoreError::invalid_push_spec(spec, "push spec cannot be empty")),
            "--all" => Ok(Self::All),
            "--tags" => Ok(Self::Tags),
            "HEAD" => Ok(Self::CurrentBranch),
            s if s.starts_with('-') => Err(CoreError::invalid_push_spec(
                s,
                "only --all and --tags are accepted as options",
            )),
            s if s.chars().any(|c| c.is_whitespace() || c.is_control()) => Err(
                CoreError::invalid_push_spec(s, "push spec cannot contain whitespace"),
            ),
            s => Ok(Self::Refspec(s.to_string())),
        }
    }

    /// Returns the argument handed to `git push`.
    pub fn as_arg(&self) -> &str {
        match self {
            Self::All => "--all",
            Self::Tags => "--tags",
            Self::CurrentBranch => "HEAD",
            Self::Refspec(spec) => spec,
        }
    }
}

impl Default for PushSpec {
    fn default() -> Self {
        Self::CurrentBranch
    }
}

impl fmt::Display for PushSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

impl FromStr for PushSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
