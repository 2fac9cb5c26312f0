//! Error types for upstream fetches.

use snafu::Snafu;

/// Result type for upstream operations.
pub type Result<T, E = UpstreamError> = std::result::Result<T, E>;

/// Errors from upstream registries and content hosts.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum UpstreamError {
    /// The upstream answered 4xx for the requested resource.
    #[snafu(display("upstream resource not found: {url}"))]
    NotFound {
        /// The URL that returned 4xx.
        url: String,
    },

    /// Transport failure, timeout, or upstream 5xx.
    #[snafu(display("upstream unavailable: {url}: {message}"))]
    Unavailable {
        /// The URL that failed.
        url: String,
        /// Transport or status description.
        message: String,
    },

    /// The upstream payload did not decode as expected.
    #[snafu(display("malformed upstream payload from {url}: {message}"))]
    Decode {
        /// The URL whose payload failed to decode.
        url: String,
        /// Decode failure description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_url() {
        let err = UpstreamError::NotFound { url: "https://registry.npmjs.org/x".to_string() };
        assert!(err.to_string().contains("registry.npmjs.org"));
    }
}
