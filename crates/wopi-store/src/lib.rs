//! Document storage for the WOPI host.
//!
//! A document store maps a [`DocumentId`](wopi_types::DocumentId) to its
//! current bytes, a version identifier that changes on every write, and a
//! content digest. The store knows nothing about locks: the lock coordinator
//! decides whether a write is allowed and only then calls into the store.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsDocumentStore`] -- one file per document under a root directory
//!
//! # Design Rules
//!
//! 1. Writes create the document if it does not exist.
//! 2. Every write yields a version different from every earlier one.
//! 3. A failed write leaves the previous content in place.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use traits::DocumentStore;
