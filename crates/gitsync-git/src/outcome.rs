//! Non-zero git exits that operations treat as success.
//!
//! git reports some no-op situations (nothing to push, history already
//! complete) with a failing exit status. Which ones are acceptable is
//! decided here and nowhere else, so call sites never match on output text.

use std::fmt;

/// The git operations whose failures may be benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitOperation {
    /// `pull --unshallow` / `fetch --unshallow` on a repository that is
    /// already complete.
    Unshallow,
    /// `push` with nothing to send.
    Push,
    /// `fetch <url> refs/*:refs/*` before a checkout.
    FetchAll,
    /// `fetch` of a single branch.
    Fetch,
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unshallow => "unshallow",
            Self::Push => "push",
            Self::FetchAll => "fetch all",
            Self::Fetch => "fetch",
        };
        f.write_str(name)
    }
}

/// Output fragments (lower case) that make a failed invocation benign.
pub const BENIGN_OUTCOMES: &[(GitOperation, &[&str])] = &[
    (GitOperation::Unshallow, &["does not make sense"]),
    (GitOperation::Push, &["up-to-date"]),
    (GitOperation::FetchAll, &["up-to-date", "up to date"]),
    (GitOperation::Fetch, &["up-to-date", "up to date"]),
];

/// Fragments that always mean real failure, even next to a benign one.
const BLOCKING_MARKERS: &[&str] = &["[rejected]", "[remote rejected]", "failed to push"];

/// Returns true if a failed `operation` whose combined output is `output`
/// should be treated as success.
pub fn is_benign(operation: GitOperation, output: &str) -> bool {
    let output = output.to_ascii_lowercase();
    if BLOCKING_MARKERS.iter().any(|m| output.contains(m)) {
        return false;
    }
    BENIGN_OUTCOMES
        .iter()
        .filter(|(op, _)| *op == operation)
        .flat_map(|(_, fragments)| fragments.iter())
        .any(|fragment| output.contains(fragment))
}
