//! Error types for the ESM transform.

use snafu::Snafu;

/// Result type for bundling operations.
pub type Result<T, E = BundleError> = std::result::Result<T, E>;

/// Errors from the ESM transform.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BundleError {
    /// The entry module is not among the package's cached files.
    #[snafu(display("entry module not found: {path}"))]
    EntryNotFound {
        /// The entry path that was requested.
        path: String,
    },
}
