//! Lock coordination for the WOPI host.
//!
//! This crate decides every state-changing editor request: whether a lock may
//! be taken, refreshed or released, and whether a save may overwrite a
//! document. It owns the per-document lock state and consults the
//! [`DocumentStore`](wopi_store::DocumentStore) for content writes.
//!
//! # Architecture
//!
//! - The [`LockTable`] maps each document to an optional [`Lock`]. Every
//!   document has its own mutex, so decisions on one document never wait on
//!   another.
//! - The [`LockCoordinator`] runs each protocol verb as a single critical
//!   section on the document's slot. Guarded writes perform the store write
//!   inside that section, so a lock cannot change between the check and the
//!   write.
//! - Token equality is delegated to a [`TokenMatcher`](wopi_types::TokenMatcher)
//!   and applied identically by every verb.
//!
//! Per document the coordinator is a two-state machine, `UNLOCKED` and
//! `LOCKED(token)`; every document starts unlocked.
//!
//! # Modules
//!
//! - [`error`] — [`LockError`] and [`ConflictReason`]
//! - [`table`] — [`LockTable`] and the [`Lock`] record
//! - [`coordinator`] — [`LockCoordinator`] and [`WriteReceipt`]

pub mod coordinator;
pub mod error;
pub mod table;

pub use coordinator::{LockCoordinator, WriteReceipt};
pub use error::{ConflictReason, LockError, LockResult};
pub use table::{Lock, LockTable};
