//! Error types for the package cache.

use snafu::Snafu;

use nexus_upstream::UpstreamError;

/// Result type for cache operations.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

/// Errors from serving a package through the cache.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CacheError {
    /// The upstream has no such package or version artifact.
    #[snafu(display("package not found: {key}"))]
    PackageNotFound {
        /// The package key whose artifact is missing upstream.
        key: String,
    },

    /// The package hydrated but the named path is not in it.
    #[snafu(display("file not found in {key}: {path}"))]
    FileNotFound {
        /// The hydrated package key.
        key: String,
        /// The requested path.
        path: String,
    },

    /// The upstream could not deliver the artifact.
    #[snafu(display("upstream unavailable for {key}: {message}"))]
    UpstreamUnavailable {
        /// The package key being fetched.
        key: String,
        /// Transport or payload failure description.
        message: String,
    },

    /// The operation does not apply to this ecosystem.
    #[snafu(display("{operation} is not supported for {key}"))]
    Unsupported {
        /// The unsupported operation.
        operation: String,
        /// The package key it was attempted on.
        key: String,
    },
}

impl CacheError {
    /// Map an upstream artifact-fetch failure into cache terms.
    ///
    /// A 4xx on the tarball or file URL means the artifact does not
    /// exist; a malformed archive counts as an unhealthy upstream, since
    /// the bytes came from it.
    pub fn from_upstream(key: &str, e: UpstreamError) -> Self {
        match e {
            UpstreamError::NotFound { .. } => CacheError::PackageNotFound { key: key.to_string() },
            other => CacheError::UpstreamUnavailable {
                key: key.to_string(),
                message: other.to_string(),
            },
        }
    }
}
