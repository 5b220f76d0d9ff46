use async_trait::async_trait;
use axum::http::HeaderMap;
use wopi_crypto::AccessTokenSigner;
use wopi_types::DocumentId;

use crate::headers::bearer_token;

/// Credential presented with a request.
#[derive(Clone, Debug)]
pub enum Credentials {
    AccessToken(String),
    Anonymous,
}

impl Credentials {
    /// Take the `access_token` query parameter, falling back to a bearer
    /// `Authorization` header.
    pub fn from_request(query_token: Option<&str>, headers: &HeaderMap) -> Self {
        match query_token.or_else(|| bearer_token(headers)) {
            Some(token) if !token.is_empty() => Self::AccessToken(token.to_string()),
            _ => Self::Anonymous,
        }
    }
}

/// Decides whether a credential grants access to a document.
///
/// Verification has no side effects and shares no state with the lock
/// coordinator.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credentials: &Credentials, document: &DocumentId) -> bool;
}

/// Accepts access tokens issued by an [`AccessTokenSigner`] for one user.
#[derive(Debug)]
pub struct SignedTokenVerifier {
    signer: AccessTokenSigner,
    user_id: String,
}

impl SignedTokenVerifier {
    pub fn new(signer: AccessTokenSigner, user_id: impl Into<String>) -> Self {
        Self {
            signer,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl CredentialVerifier for SignedTokenVerifier {
    async fn verify(&self, credentials: &Credentials, document: &DocumentId) -> bool {
        match credentials {
            Credentials::AccessToken(token) => self.signer.verify(token, document, &self.user_id),
            Credentials::Anonymous => false,
        }
    }
}

/// Accepts every request. Local development only.
pub struct AllowAllVerifier;

#[async_trait]
impl CredentialVerifier for AllowAllVerifier {
    async fn verify(&self, _credentials: &Credentials, _document: &DocumentId) -> bool {
        true
    }
}
