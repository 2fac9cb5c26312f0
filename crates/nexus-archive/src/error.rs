//! Error types for archive extraction.

use snafu::Snafu;

/// Result type for archive operations.
pub type Result<T, E = ExtractError> = std::result::Result<T, E>;

/// Errors from parsing an upstream archive.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ExtractError {
    /// The bytes did not parse as a gzipped tar stream.
    #[snafu(display("malformed archive: {message}"))]
    Malformed {
        /// Parse failure description.
        message: String,
    },
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Malformed { message: e.to_string() }
    }
}
