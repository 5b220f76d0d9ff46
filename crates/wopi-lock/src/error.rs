//! Error types for lock coordination.

use std::fmt;

use thiserror::Error;
use wopi_store::StoreError;
use wopi_types::{DocumentId, LockToken};

/// Why a lock-affecting request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictReason {
    /// LOCK while a different lock is held.
    AlreadyLocked,
    /// UNLOCK with a token that does not match the held lock.
    UnlockMismatch,
    /// REFRESH_LOCK with a token that does not match the held lock.
    RefreshMismatch,
    /// UNLOCK_AND_RELOCK with an old token that does not match.
    RelockMismatch,
    /// REFRESH_LOCK or UNLOCK_AND_RELOCK on an unlocked document.
    NotLocked,
    /// A save whose tokens do not match the held lock.
    LockedByAnotherSession,
}

impl ConflictReason {
    /// Human-readable reason, suitable for a lock-failure header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyLocked => "Already locked by a different lock",
            Self::UnlockMismatch => "Unlock with wrong lock",
            Self::RefreshMismatch => "Refresh with wrong lock",
            Self::RelockMismatch => "Relock with wrong old lock",
            Self::NotLocked => "File is not locked",
            Self::LockedByAnotherSession => "File is locked by another session",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the lock coordinator.
#[derive(Debug, Error)]
pub enum LockError {
    /// A required field was empty or malformed. No state was touched.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The document does not exist in the store.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The request does not agree with the current lock.
    ///
    /// `current` is the lock held at decision time (`None` if unlocked).
    #[error("lock conflict on {document}: {reason}")]
    Conflict {
        document: DocumentId,
        current: Option<LockToken>,
        reason: ConflictReason,
    },

    /// The document store failed; neither lock state nor content changed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A slot mutex was poisoned by a panicking holder.
    #[error("lock table poisoned: {0}")]
    Poisoned(String),
}

impl LockError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The lock reported with a conflict, if any.
    pub fn current_lock(&self) -> Option<&LockToken> {
        match self {
            Self::Conflict { current, .. } => current.as_ref(),
            _ => None,
        }
    }
}

/// Result alias for coordinator operations.
pub type LockResult<T> = std::result::Result<T, LockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display_includes_reason() {
        let err = LockError::Conflict {
            document: DocumentId::new("a.doc").unwrap(),
            current: Some(LockToken::parse("T1").unwrap()),
            reason: ConflictReason::AlreadyLocked,
        };
        assert_eq!(
            err.to_string(),
            "lock conflict on a.doc: Already locked by a different lock"
        );
        assert!(err.is_conflict());
        assert_eq!(err.current_lock().map(LockToken::as_str), Some("T1"));
    }

    #[test]
    fn non_conflicts_carry_no_lock() {
        let err = LockError::Validation("empty".into());
        assert!(!err.is_conflict());
        assert!(err.current_lock().is_none());
    }
}
