use std::path::PathBuf;

/// Errors raised by the binary before an engine operation starts.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings could not be turned into an engine configuration.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// An SSH operation was requested without a key.
    #[error("no SSH key: pass --key-file or set GITSYNC_SSH_KEY")]
    MissingKey,

    /// The key file could not be read.
    #[error("cannot read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_fix() {
        assert!(CliError::MissingKey.to_string().contains("--key-file"));

        let err = CliError::KeyFile {
            path: PathBuf::from("/run/secrets/id"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot read key file /run/secrets/id"));
    }
}
