//! Subresource Integrity tokens.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::Digest;
use sha2::Sha256;

/// SHA-256 of `bytes` formatted as an SRI token: `sha256-<base64>`.
///
/// This is the exact string browsers accept in an `integrity=` attribute,
/// and the format persisted in package manifests.
pub fn sri_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("sha256-{}", STANDARD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_known_digest() {
        assert_eq!(sri_sha256(b""), "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            sri_sha256(b"hello world"),
            "sha256-uU0nuZNNPgilLlLX2n59rrhUM/jmWU+AiIj3rOLvzek=",
        );
    }

    #[test]
    fn token_shape() {
        let token = sri_sha256(b"anything");
        assert!(token.starts_with("sha256-"));
        // 32 digest bytes encode to 44 base64 characters.
        assert_eq!(token.len(), "sha256-".len() + 44);
    }
}
