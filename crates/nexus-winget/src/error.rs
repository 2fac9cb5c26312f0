//! Error types for the WinGet index.

use snafu::Snafu;

use nexus_upstream::UpstreamError;

/// Result type for WinGet index operations.
pub type Result<T, E = WingetError> = std::result::Result<T, E>;

/// Errors from building or serving the WinGet index.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WingetError {
    /// The tracked repository has no `manifests` tree or no letter
    /// directories at all. A rebuild must not cache an empty index over
    /// a good one, so this fails the whole operation.
    #[snafu(display("manifest tree empty or missing in {repo}"))]
    EmptyTree {
        /// The tracked repository.
        repo: String,
    },

    /// No package with this identifier exists in the index.
    #[snafu(display("package not found: {id}"))]
    PackageNotFound {
        /// The requested package identifier.
        id: String,
    },

    /// The package exists but not at this version.
    #[snafu(display("version {version} of {id} not found"))]
    VersionNotFound {
        /// The requested package identifier.
        id: String,
        /// The requested version.
        version: String,
    },

    /// No manifest file exists at this repository path.
    #[snafu(display("manifest file not found: {path}"))]
    FileNotFound {
        /// The repo-absolute path that returned 4xx.
        path: String,
    },

    /// A manifest file did not parse as the expected YAML shape.
    #[snafu(display("invalid manifest at {path}: {message}"))]
    InvalidManifest {
        /// Repo-absolute manifest path.
        path: String,
        /// Parse failure description.
        message: String,
    },

    /// The upstream Git host could not be reached.
    #[snafu(display("upstream unavailable: {message}"))]
    UpstreamUnavailable {
        /// Transport failure description.
        message: String,
    },
}

impl From<UpstreamError> for WingetError {
    fn from(e: UpstreamError) -> Self {
        WingetError::UpstreamUnavailable { message: e.to_string() }
    }
}
