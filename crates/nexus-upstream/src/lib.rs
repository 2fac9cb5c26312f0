//! Upstream registry clients for the Nexus gateway.
//!
//! One [`UpstreamClient`] wraps a shared `reqwest::Client` and exposes a
//! typed method per upstream operation: npm packuments (also serving JSR
//! through its npm-compat registry), cdnjs library metadata and files,
//! jsDelivr version listings for GitHub, GitHub git-tree expansion and
//! raw file content, WordPress SVN files, and plain archive downloads.
//!
//! # Deadlines
//!
//! Every call carries a per-request deadline: [`METADATA_TIMEOUT`] for
//! JSON endpoints, [`ARCHIVE_TIMEOUT`] for tarball and file downloads.
//! A timed-out or otherwise failed transport surfaces as
//! [`UpstreamError::Unavailable`]; an upstream 404 surfaces as
//! [`UpstreamError::NotFound`] so callers can map it to their own
//! not-found taxonomy.

pub mod client;
pub mod error;
pub mod github;
pub mod npm;

pub use client::ARCHIVE_TIMEOUT;
pub use client::CdnjsLibrary;
pub use client::CdnjsVersion;
pub use client::METADATA_TIMEOUT;
pub use client::UpstreamClient;
pub use error::Result;
pub use error::UpstreamError;
pub use github::TreeEntry;
pub use npm::NpmVersion;
pub use npm::Packument;
