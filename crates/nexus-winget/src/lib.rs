//! The WinGet package index.
//!
//! WinGet's community repository is a Git tree of YAML manifests, one
//! directory per package version:
//!
//! ```text
//! manifests/<letter>/<publisher>/<name>/<version>/<id>.yaml
//!                                                 <id>.installer.yaml
//!                                                 <id>.locale.<locale>.yaml
//! ```
//!
//! This crate synthesizes a read-only package index from that tree by
//! recursive expansion against the upstream Git host's API, cached in
//! layers (root tree SHA, per-letter path lists, the package→versions
//! mapping, individual file contents) and refreshed with a
//! stale-while-revalidate discipline.

pub mod error;
pub mod index;
pub mod manifest;
pub mod search;
pub mod version;

pub use error::Result;
pub use error::WingetError;
pub use index::INDEX_TTL;
pub use index::PackageIndex;
pub use index::WingetIndex;
pub use index::parse_manifest_path;
pub use manifest::InstallerManifest;
pub use manifest::LocaleManifest;
pub use manifest::ManifestKind;
pub use manifest::VersionManifest;
pub use manifest::classify_manifest;
pub use search::MatchType;
pub use version::sort_versions_desc;
