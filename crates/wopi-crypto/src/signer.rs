use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use wopi_types::DocumentId;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks per-document access tokens.
///
/// A token binds a user to a single document; presenting it for any other
/// document fails verification.
#[derive(Clone)]
pub struct AccessTokenSigner {
    keyed: HmacSha256,
}

impl AccessTokenSigner {
    /// Create a signer from a shared secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SignerError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        let keyed = HmacSha256::new_from_slice(&secret).map_err(|_| SignerError::InvalidKey)?;
        Ok(Self { keyed })
    }

    /// Generate a random 32-byte secret, hex-encoded.
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issue the access token for `user` on `document`.
    pub fn issue(&self, document: &DocumentId, user: &str) -> String {
        let tag = self.mac(document, user).finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(tag)
    }

    /// Check a presented token in constant time.
    pub fn verify(&self, token: &str, document: &DocumentId, user: &str) -> bool {
        let Ok(presented) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };
        self.mac(document, user).verify_slice(&presented).is_ok()
    }

    fn mac(&self, document: &DocumentId, user: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(document.as_str().as_bytes());
        mac.update(b":");
        mac.update(user.as_bytes());
        mac
    }
}

impl std::fmt::Debug for AccessTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessTokenSigner(<redacted>)")
    }
}

/// Errors from signer construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("signing secret rejected by HMAC")]
    InvalidKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentId {
        DocumentId::new(id).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let signer = AccessTokenSigner::new("demo-secret").unwrap();
        let token = signer.issue(&doc("sample.docx"), "test-user");
        assert!(signer.verify(&token, &doc("sample.docx"), "test-user"));
    }

    #[test]
    fn token_is_bound_to_document_and_user() {
        let signer = AccessTokenSigner::new("demo-secret").unwrap();
        let token = signer.issue(&doc("a.docx"), "alice");
        assert!(!signer.verify(&token, &doc("b.docx"), "alice"));
        assert!(!signer.verify(&token, &doc("a.docx"), "bob"));
    }

    #[test]
    fn different_secrets_disagree() {
        let a = AccessTokenSigner::new("one").unwrap();
        let b = AccessTokenSigner::new("two").unwrap();
        let token = a.issue(&doc("a.docx"), "u");
        assert!(!b.verify(&token, &doc("a.docx"), "u"));
    }

    #[test]
    fn garbage_tokens_rejected() {
        let signer = AccessTokenSigner::new("s").unwrap();
        assert!(!signer.verify("", &doc("a.docx"), "u"));
        assert!(!signer.verify("not base64 !!", &doc("a.docx"), "u"));
        assert!(!signer.verify("AAAA", &doc("a.docx"), "u"));
    }

    #[test]
    fn token_is_query_safe() {
        let signer = AccessTokenSigner::new("s").unwrap();
        let token = signer.issue(&doc("a.docx"), "u");
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn empty_secret_rejected() {
        assert_eq!(
            AccessTokenSigner::new("").unwrap_err(),
            SignerError::EmptySecret
        );
    }

    #[test]
    fn generated_secrets_differ() {
        let a = AccessTokenSigner::generate_secret();
        let b = AccessTokenSigner::generate_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn debug_redacts_secret() {
        let signer = AccessTokenSigner::new("top-secret").unwrap();
        assert!(!format!("{signer:?}").contains("top-secret"));
    }
}
