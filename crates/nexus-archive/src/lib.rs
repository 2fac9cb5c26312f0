//! Archive handling for the Nexus gateway.
//!
//! Upstream registries deliver whole package versions as gzipped
//! tarballs with a single synthetic root directory (`package/` for npm,
//! `<repo>-<ref>/` for GitHub codeload). [`extract_entries`] stream-parses
//! the archive into root-relative file entries, and [`sri_sha256`]
//! computes the Subresource Integrity token the directory-listing
//! surface exposes per file.

pub mod error;
pub mod extract;
pub mod integrity;

pub use error::ExtractError;
pub use error::Result;
pub use extract::ArchiveEntry;
pub use extract::extract_entries;
pub use integrity::sri_sha256;
