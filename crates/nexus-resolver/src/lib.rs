//! Version resolution for the Nexus gateway.
//!
//! Upstream version inputs arrive in many shapes: `latest`, `18`, `^1.2`,
//! `v3.4.0`, a 40-hex commit, a branch name, or nothing at all. This
//! crate canonicalizes them to a concrete, cacheable
//! [`PackageKey`] using upstream metadata and semver range matching, and
//! classifies the result as immutable or mutable so the cache applies
//! the right freshness policy.
//!
//! The immutability flag is always derived from the *resolved* version
//! string, never the input: a caller's `18` that resolves to `18.3.1`
//! still yields a short-lived cache entry because the alias may move,
//! while a caller's `latest` that happens to name a published complete
//! semver resolves immutable.

pub mod ecosystem;
pub mod error;
pub mod key;
pub mod resolver;
pub mod version;

pub use ecosystem::Ecosystem;
pub use error::ResolveError;
pub use error::Result;
pub use key::PackageKey;
pub use key::is_commit_sha;
pub use key::is_complete_semver;
pub use resolver::Resolved;
pub use resolver::Resolver;
pub use version::pick_version;
