//! HTTP front door for the WOPI host.
//!
//! Translates WOPI requests (CheckFileInfo, GetFile, PutFile and the
//! `X-WOPI-Override` lock verbs) into calls on the
//! [`LockCoordinator`](wopi_lock::LockCoordinator) and maps the outcomes back
//! to WOPI status codes and headers. Also serves a handful of convenience
//! endpoints for launching an editor against the host.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod headers;
pub mod router;
pub mod sample;
pub mod server;

pub use auth::{AllowAllVerifier, CredentialVerifier, Credentials, SignedTokenVerifier};
pub use config::{AuthConfig, LockConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{AppState, WopiServer};
