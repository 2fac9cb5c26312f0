//! Error types for version resolution.

use snafu::Snafu;

use nexus_upstream::UpstreamError;

/// Result type for resolver operations.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

/// Errors from resolving a version specifier.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ResolveError {
    /// The upstream registry has no such package.
    #[snafu(display("package not found: {name}"))]
    PackageNotFound {
        /// The requested package name.
        name: String,
    },

    /// The package exists but no published version satisfies the spec.
    #[snafu(display("no version of {name} satisfies {spec}"))]
    VersionNotFound {
        /// The requested package name.
        name: String,
        /// The version specifier that matched nothing.
        spec: String,
    },

    /// The upstream registry could not be reached.
    #[snafu(display("upstream unavailable: {message}"))]
    UpstreamUnavailable {
        /// Transport failure description.
        message: String,
    },
}

impl ResolveError {
    /// Map an upstream fetch failure for `name` into resolver terms.
    ///
    /// A 4xx on the metadata endpoint means the package does not exist;
    /// anything else means the upstream is unhealthy.
    pub fn from_upstream(name: &str, e: UpstreamError) -> Self {
        match e {
            UpstreamError::NotFound { .. } => ResolveError::PackageNotFound { name: name.to_string() },
            other => ResolveError::UpstreamUnavailable { message: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_404_becomes_package_not_found() {
        let err = ResolveError::from_upstream(
            "left-pad",
            UpstreamError::NotFound { url: "https://registry.npmjs.org/left-pad".to_string() },
        );
        assert!(matches!(err, ResolveError::PackageNotFound { .. }));
    }

    #[test]
    fn upstream_5xx_becomes_unavailable() {
        let err = ResolveError::from_upstream(
            "react",
            UpstreamError::Unavailable {
                url: "https://registry.npmjs.org/react".to_string(),
                message: "upstream answered 503".to_string(),
            },
        );
        assert!(matches!(err, ResolveError::UpstreamUnavailable { .. }));
    }
}
