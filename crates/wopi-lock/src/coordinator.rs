//! The lock coordinator: one decision procedure per protocol verb.
//!
//! | Verb | Unlocked | Locked, token matches | Locked, token differs |
//! |---|---|---|---|
//! | [`acquire`](LockCoordinator::acquire) | lock = token | lock = token | Conflict |
//! | [`release`](LockCoordinator::release) | ok | unlock | Conflict |
//! | [`refresh`](LockCoordinator::refresh) | Conflict | lock = token | Conflict |
//! | [`relock`](LockCoordinator::relock) | Conflict | lock = new (old matches) | Conflict |
//! | [`guarded_write`](LockCoordinator::guarded_write) | write | write | Conflict |
//!
//! Each verb runs as one critical section on the document's slot in the
//! [`LockTable`]. Conflicts are ordinary outcomes: they are logged at debug
//! level and always carry the lock that was current when the decision was
//! made.

use std::sync::Arc;

use tracing::debug;
use wopi_store::DocumentStore;
use wopi_types::{DocumentId, LockToken, StructuredIdentity, TokenMatcher, VersionId};

use crate::error::{ConflictReason, LockError, LockResult};
use crate::table::{Lock, LockTable};

/// Outcome of a successful guarded write.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteReceipt {
    /// Version produced by the store for the new content.
    pub version: VersionId,
    /// Lock held on the document after the write.
    pub lock: Option<LockToken>,
}

/// Arbitrates lock and save requests against the lock table and the store.
#[derive(Clone)]
pub struct LockCoordinator {
    table: Arc<LockTable>,
    store: Arc<dyn DocumentStore>,
    matcher: Arc<dyn TokenMatcher>,
}

impl LockCoordinator {
    /// Create a coordinator using [`StructuredIdentity`] token equality.
    pub fn new(table: Arc<LockTable>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            table,
            store,
            matcher: Arc::new(StructuredIdentity::default()),
        }
    }

    /// Replace the token equality predicate.
    pub fn with_matcher(mut self, matcher: Arc<dyn TokenMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn table(&self) -> &Arc<LockTable> {
        &self.table
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn matches(&self, presented: &LockToken, current: &Lock) -> bool {
        self.matcher.matches(presented, &current.token)
    }

    /// LOCK: take the lock, or re-affirm it with an equal token.
    ///
    /// On success the stored token becomes `token`, which lets an editor
    /// extend the metadata of a lock it already holds.
    pub fn acquire(&self, id: &DocumentId, token: &LockToken) -> LockResult<()> {
        ensure_token(token)?;
        self.table.with_slot(id, |entry| match entry {
            None => {
                debug!(document = %id, %token, "lock acquired");
                *entry = Some(Lock::new(token.clone()));
                Ok(())
            }
            Some(current) if self.matches(token, current) => {
                debug!(document = %id, %token, "lock re-affirmed");
                current.replace_token(token.clone());
                Ok(())
            }
            Some(current) => Err(conflict(id, Some(&*current), ConflictReason::AlreadyLocked)),
        })
    }

    /// UNLOCK: drop the lock. Releasing an unlocked document succeeds.
    pub fn release(&self, id: &DocumentId, token: &LockToken) -> LockResult<()> {
        ensure_token(token)?;
        self.table.with_slot(id, |entry| match entry {
            Some(current) if !self.matches(token, current) => {
                Err(conflict(id, Some(&*current), ConflictReason::UnlockMismatch))
            }
            _ => {
                if entry.take().is_some() {
                    debug!(document = %id, %token, "lock released");
                }
                Ok(())
            }
        })
    }

    /// REFRESH_LOCK: replace a held lock with an equal token.
    ///
    /// Refreshing requires an existing lock; an unlocked document is a
    /// conflict with no current lock.
    pub fn refresh(&self, id: &DocumentId, token: &LockToken) -> LockResult<()> {
        ensure_token(token)?;
        self.table.with_slot(id, |entry| match entry {
            None => Err(conflict(id, None, ConflictReason::NotLocked)),
            Some(current) if self.matches(token, current) => {
                debug!(document = %id, %token, "lock refreshed");
                current.replace_token(token.clone());
                Ok(())
            }
            Some(current) => Err(conflict(id, Some(&*current), ConflictReason::RefreshMismatch)),
        })
    }

    /// UNLOCK_AND_RELOCK: swap a held lock for a new token in one step.
    pub fn relock(&self, id: &DocumentId, old: &LockToken, new: &LockToken) -> LockResult<()> {
        ensure_token(old)?;
        ensure_token(new)?;
        self.table.with_slot(id, |entry| match entry {
            None => Err(conflict(id, None, ConflictReason::NotLocked)),
            Some(current) if self.matches(old, current) => {
                debug!(document = %id, %old, %new, "lock handed over");
                *current = Lock::new(new.clone());
                Ok(())
            }
            Some(current) => Err(conflict(id, Some(&*current), ConflictReason::RelockMismatch)),
        })
    }

    /// GET_LOCK: the current lock token, or `None` when unlocked.
    pub fn inspect(&self, id: &DocumentId) -> LockResult<Option<LockToken>> {
        if !self.store.exists(id)? {
            return Err(LockError::NotFound(id.clone()));
        }
        Ok(self.table.get(id)?.map(|lock| lock.token))
    }

    /// The full lock record for `id`, without an existence check.
    pub fn snapshot(&self, id: &DocumentId) -> LockResult<Option<Lock>> {
        self.table.get(id)
    }

    /// Save `content` if the lock-ownership precondition holds.
    ///
    /// - Unlocked documents are always writable, and stay unlocked.
    /// - Locked documents are writable when `token` or `prior` matches the
    ///   current lock. `prior` covers a save that follows a lock hand-off
    ///   while the editor still names the lock it held a moment ago.
    ///
    /// **Lock side effect:** after an admitted write to a locked document,
    /// if `token` is present and its text differs from the stored lock, the
    /// stored lock becomes `token`. A save therefore doubles as an implicit
    /// refresh or hand-off.
    ///
    /// The store write happens before the lock update and inside the same
    /// critical section; if the write fails, neither content nor lock change.
    pub fn guarded_write(
        &self,
        id: &DocumentId,
        content: &[u8],
        token: Option<&LockToken>,
        prior: Option<&LockToken>,
    ) -> LockResult<WriteReceipt> {
        if content.is_empty() {
            return Err(LockError::Validation("document content must not be empty".into()));
        }
        self.table.with_slot(id, |entry| {
            if let Some(current) = entry.as_ref() {
                let admitted = token.is_some_and(|t| self.matches(t, current))
                    || prior.is_some_and(|p| self.matches(p, current));
                if !admitted {
                    return Err(conflict(
                        id,
                        Some(current),
                        ConflictReason::LockedByAnotherSession,
                    ));
                }
            }

            let version = self.store.write(id, content)?;

            if let (Some(current), Some(token)) = (entry.as_mut(), token) {
                if current.token.as_str() != token.as_str() {
                    debug!(document = %id, from = %current.token, to = %token, "lock updated by save");
                    current.replace_token(token.clone());
                }
            }

            debug!(document = %id, bytes = content.len(), %version, "guarded write applied");
            Ok(WriteReceipt {
                version,
                lock: entry.as_ref().map(|lock| lock.token.clone()),
            })
        })
    }

    /// Overwrite a document and drop its lock in one critical section.
    pub fn reset_document(&self, id: &DocumentId, content: &[u8]) -> LockResult<VersionId> {
        self.table.with_slot(id, |entry| {
            let version = self.store.write(id, content)?;
            *entry = None;
            Ok(version)
        })
    }

    /// Drop every lock. Returns how many were held.
    pub fn clear_locks(&self) -> LockResult<usize> {
        self.table.clear()
    }
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

fn ensure_token(token: &LockToken) -> LockResult<()> {
    if token.as_str().is_empty() {
        return Err(LockError::Validation("lock token must not be empty".into()));
    }
    Ok(())
}

fn conflict(id: &DocumentId, current: Option<&Lock>, reason: ConflictReason) -> LockError {
    debug!(document = %id, current = ?current.map(|l| l.token.as_str()), %reason, "lock conflict");
    LockError::Conflict {
        document: id.clone(),
        current: current.map(|lock| lock.token.clone()),
        reason,
    }
}
