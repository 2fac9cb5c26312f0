//! Error types for storage operations.

use snafu::Snafu;

/// Result type for storage operations.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Errors from storage back-ends.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// The back-end could not be reached or failed mid-operation.
    #[snafu(display("storage unavailable: {message}"))]
    Unavailable {
        /// Human-readable description of the transport failure.
        message: String,
    },

    /// A key contained characters the back-end cannot represent.
    #[snafu(display("invalid storage key: {key}"))]
    InvalidKey {
        /// The offending key.
        key: String,
    },

    /// Metadata bytes did not decode as a JSON object.
    #[snafu(display("corrupt metadata at {key}: {message}"))]
    CorruptMeta {
        /// Key whose metadata failed to decode.
        key: String,
        /// Decode failure description.
        message: String,
    },
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Unavailable { message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = StorageError::Unavailable {
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));

        let err = StorageError::InvalidKey { key: "../etc".to_string() };
        assert!(err.to_string().contains("../etc"));
    }

    #[test]
    fn io_error_converts_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::NotConnected, "down");
        let err: StorageError = io.into();
        assert!(matches!(err, StorageError::Unavailable { .. }));
    }
}
