//! Package keys and the immutability classification.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::ecosystem::Ecosystem;

/// Matches a complete semver prefix: `MAJOR.MINOR.PATCH`, with anything
/// (pre-release, build metadata) allowed after.
static COMPLETE_SEMVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+").expect("static regex"));

/// Matches a full 40-hex git commit SHA.
static COMMIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("static regex"));

/// Whether `version` is a complete semver after stripping an optional
/// leading `v`.
pub fn is_complete_semver(version: &str) -> bool {
    let version = version.strip_prefix('v').unwrap_or(version);
    COMPLETE_SEMVER.is_match(version)
}

/// Whether `version` is a full 40-character lowercase hex commit SHA.
pub fn is_commit_sha(version: &str) -> bool {
    COMMIT_SHA.is_match(version)
}

/// A fully resolved cache coordinate: `(ecosystem, name, version)`.
///
/// `name` is ecosystem-normalized (`@scope/pkg`, `owner/repo`, a cdnjs
/// slug, or `plugins/<slug>` / `themes/<slug>`). `version` is always a
/// concrete string after resolution, never a range or alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageKey {
    /// Which upstream this key belongs to.
    pub ecosystem: Ecosystem,
    /// Ecosystem-normalized package name.
    pub name: String,
    /// Concrete version string.
    pub version: String,
}

impl PackageKey {
    /// Build a key from already-normalized parts.
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version: version.into(),
        }
    }

    /// The storage prefix under which this package's files and manifest
    /// live: `cdn/<ecosystem>/<name>/<version>`.
    pub fn storage_prefix(&self) -> String {
        format!("cdn/{}/{}/{}", self.ecosystem, self.name, self.version)
    }

    /// The raw-bytes storage key for one file of this package.
    pub fn raw_key(&self, path: &str) -> String {
        format!("{}/{}", self.storage_prefix(), path.trim_start_matches('/'))
    }

    /// Whether this key's version string can never alias to different
    /// bytes over time.
    ///
    /// - npm, JSR: complete semver.
    /// - GitHub: 40-hex commit, or complete semver with optional `v`.
    /// - cdnjs: complete semver with optional `v`.
    /// - WordPress: `tags/<v>` and theme versions are immutable, `trunk`
    ///   is not.
    /// - WinGet: versions live in write-once directories, always
    ///   immutable.
    pub fn is_immutable(&self) -> bool {
        match self.ecosystem {
            Ecosystem::Npm | Ecosystem::Jsr => COMPLETE_SEMVER.is_match(&self.version),
            Ecosystem::Gh => is_commit_sha(&self.version) || is_complete_semver(&self.version),
            Ecosystem::Cdnjs => is_complete_semver(&self.version),
            Ecosystem::Wp => self.version != "trunk",
            Ecosystem::Winget => true,
        }
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.ecosystem, self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_semver_shapes() {
        assert!(is_complete_semver("1.2.3"));
        assert!(is_complete_semver("v1.2.3"));
        assert!(is_complete_semver("1.2.3-beta.1"));
        assert!(!is_complete_semver("1.2"));
        assert!(!is_complete_semver("18"));
        assert!(!is_complete_semver("main"));
    }

    #[test]
    fn commit_sha_shapes() {
        assert!(is_commit_sha("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_commit_sha("0123456789abcdef0123456789abcdef0123456"));
        assert!(!is_commit_sha("0123456789ABCDEF0123456789abcdef01234567"));
        assert!(!is_commit_sha("main"));
    }

    #[test]
    fn npm_immutability_requires_complete_semver() {
        assert!(PackageKey::new(Ecosystem::Npm, "react", "18.3.1").is_immutable());
        // npm versions never carry a leading `v`; the bare rule applies.
        assert!(!PackageKey::new(Ecosystem::Npm, "react", "v18.3.1").is_immutable());
        assert!(!PackageKey::new(Ecosystem::Npm, "react", "18").is_immutable());
    }

    #[test]
    fn github_branches_are_mutable() {
        let sha = "0123456789abcdef0123456789abcdef01234567";
        assert!(PackageKey::new(Ecosystem::Gh, "vuejs/core", sha).is_immutable());
        assert!(PackageKey::new(Ecosystem::Gh, "vuejs/core", "v3.4.0").is_immutable());
        assert!(!PackageKey::new(Ecosystem::Gh, "vuejs/core", "main").is_immutable());
        assert!(!PackageKey::new(Ecosystem::Gh, "vuejs/core", "v3.4").is_immutable());
    }

    #[test]
    fn wordpress_trunk_is_mutable() {
        assert!(PackageKey::new(Ecosystem::Wp, "plugins/akismet", "tags/5.3").is_immutable());
        assert!(PackageKey::new(Ecosystem::Wp, "themes/twentytwentyfour", "1.2").is_immutable());
        assert!(!PackageKey::new(Ecosystem::Wp, "plugins/akismet", "trunk").is_immutable());
    }

    #[test]
    fn storage_keys_compose() {
        let key = PackageKey::new(Ecosystem::Npm, "@scope/pkg", "1.0.0");
        assert_eq!(key.storage_prefix(), "cdn/npm/@scope/pkg/1.0.0");
        assert_eq!(key.raw_key("dist/index.js"), "cdn/npm/@scope/pkg/1.0.0/dist/index.js");
        assert_eq!(key.raw_key("/dist/index.js"), "cdn/npm/@scope/pkg/1.0.0/dist/index.js");
    }
}
