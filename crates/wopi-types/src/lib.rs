//! Foundation types for the WOPI host.
//!
//! This crate provides the identity, versioning and lock-token types shared by
//! the document store, the lock coordinator and the HTTP front door. Every
//! other crate in the workspace depends on `wopi-types`.
//!
//! # Key Types
//!
//! - [`DocumentId`] — Validated, file-name-like document identifier
//! - [`LockToken`] — Client-supplied lock token, opaque or structured
//! - [`TokenMatcher`] — Pluggable "same lock" predicate over tokens
//! - [`VersionId`] — Opaque version marker, compared for equality only
//! - [`VersionClock`] — Source of strictly advancing version identifiers
//! - [`ContentDigest`] — SHA-256 content digest in base64
//! - [`DocumentStat`] — Size, version, digest and modification time

pub mod digest;
pub mod document;
pub mod error;
pub mod token;
pub mod version;

pub use digest::ContentDigest;
pub use document::{DocumentId, DocumentStat};
pub use error::TypeError;
pub use token::{tokens_match, ExactMatch, LockToken, StructuredIdentity, TokenMatcher};
pub use version::{VersionClock, VersionId};
