//! Cryptographic primitives for the WOPI host.
//!
//! Access tokens are HMAC-SHA256 tags over `"{document}:{user}"`, encoded as
//! unpadded base64url so they survive a trip through a query string.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod signer;

pub use signer::{AccessTokenSigner, SignerError};
