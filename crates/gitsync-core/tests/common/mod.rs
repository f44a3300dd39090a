#![allow(dead_code)]
use gitsync_core::RepositoryLocation;

/// Parses a location, panicking on invalid input (intended for tests).
pub fn location(raw: &str) -> RepositoryLocation {
    RepositoryLocation::parse(raw).expect("Failed to parse test location")
}

/// Locations in every form the engine accepts, with the URL git receives.
pub fn accepted_locations() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "ssh://ci@gerrit.example.com:29418/platform/api",
            "ssh://ci@gerrit.example.com:29418/platform/api",
        ),
        ("git@github.com:team/api.git", "git@github.com:team/api.git"),
        (
            "gerrit.example.com:29418/platform/api",
            "ssh://gerrit.example.com:29418/platform/api",
        ),
        (
            "https://git.example.com/team/api.git",
            "https://git.example.com/team/api.git",
        ),
        ("file:///srv/git/api.git", "file:///srv/git/api.git"),
        ("/srv/git/api.git", "/srv/git/api.git"),
    ]
}
