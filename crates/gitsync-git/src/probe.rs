//! Access checks run before touching a repository.

use gitsync_core::{Credential, RepositoryLocation};
use tracing::{debug, instrument, warn};

use crate::engine::GitEngine;
use crate::error::{GitSyncError, Result};

impl GitEngine {
    /// Returns whether `url` can be listed with the given credentials.
    ///
    /// Without credentials there is nothing to check and the answer is
    /// `true`. With credentials the remote must answer `ls-remote` with at
    /// least one ref; an empty or unreachable repository counts as no
    /// access. Errors are logged, not returned.
    #[instrument(skip(self, password), fields(url = %url))]
    pub async fn check_permissions(
        &self,
        url: &RepositoryLocation,
        username: Option<&str>,
        password: Option<&str>,
    ) -> bool {
        let Some(credential) = Credential::basic_from_parts(username, password) else {
            debug!("no credentials given, skipping permission check");
            return true;
        };

        match self.list_remote_refs(url, Some(&credential)).await {
            Ok(refs) if refs.is_empty() => {
                warn!("remote listed no refs");
                false
            },
            Ok(refs) => {
                debug!(refs = refs.len(), "permission check passed");
                true
            },
            Err(e) => {
                warn!(error = %e, "permission check failed");
                false
            },
        }
    }

    /// Checks with an anonymous GET that `url` is readable at all.
    ///
    /// Any status of 400 or above is reported as
    /// [`GitSyncError::AccessDenied`] so that a private repository fails
    /// fast instead of hanging on a credential prompt.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn preflight_anonymous(&self, url: &RepositoryLocation) -> Result<()> {
        let location = url.to_git_url();
        let client = reqwest::Client::builder()
            .timeout(self.config().probe_timeout())
            .build()
            .map_err(|e| GitSyncError::http(&location, e.to_string()))?;

        let response = client
            .get(&location)
            .send()
            .await
            .map_err(|e| GitSyncError::http(&location, e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(GitSyncError::AccessDenied {
                location,
                status: status.as_u16(),
            });
        }

        debug!(status = status.as_u16(), "anonymous access allowed");
        Ok(())
    }
}
