use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest of a document's content, base64-encoded.
///
/// This is the form editors expect in the `SHA256` file-info field, so the
/// digest is stored already encoded rather than as raw bytes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the digest of `data`.
    pub fn of(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(STANDARD.encode(hash))
    }

    /// The base64 text of the digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated form for diagnostics (first 16 characters).
    pub fn short(&self) -> String {
        let end = self.0.len().min(16);
        format!("{}...", &self.0[..end])
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(ContentDigest::of(b"hello"), ContentDigest::of(b"hello"));
        assert_ne!(ContentDigest::of(b"hello"), ContentDigest::of(b"world"));
    }

    #[test]
    fn digest_matches_known_sha256() {
        // sha256("") in base64
        assert_eq!(
            ContentDigest::of(b"").as_str(),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn short_form_truncates() {
        let d = ContentDigest::of(b"abc");
        assert_eq!(d.short().len(), 19);
        assert!(d.short().ends_with("..."));
    }
}
