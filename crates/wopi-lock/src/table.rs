//! Per-document lock state.
//!
//! [`LockTable`] keeps one slot per document id, each behind its own `Mutex`.
//! The outer map is only held long enough to find, create or prune a slot, so
//! work on one document never blocks another. A slot is removed again once it
//! is unlocked and no caller holds it, so the map tracks locked documents plus
//! those with requests in flight. Lock state lives in memory only and is lost
//! when the table is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use wopi_types::{DocumentId, LockToken};

use crate::error::{LockError, LockResult};

/// A held lock.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lock {
    pub token: LockToken,
    /// When the lock was first granted.
    pub acquired_at: DateTime<Utc>,
    /// When the token was last replaced by an equal one.
    pub refreshed_at: DateTime<Utc>,
}

impl Lock {
    pub fn new(token: LockToken) -> Self {
        let now = Utc::now();
        Self {
            token,
            acquired_at: now,
            refreshed_at: now,
        }
    }

    /// Replace the token, keeping the original acquisition time.
    pub fn replace_token(&mut self, token: LockToken) {
        self.token = token;
        self.refreshed_at = Utc::now();
    }
}

type Slot = Arc<Mutex<Option<Lock>>>;

/// Mapping from document id to its current lock (absent = unlocked).
///
/// The table is an explicitly owned value: construct one per process (or per
/// test) and hand it to the coordinator.
#[derive(Debug, Default)]
pub struct LockTable {
    slots: Mutex<HashMap<DocumentId, Slot>>,
}

fn poisoned<T>(e: PoisonError<T>) -> LockError {
    LockError::Poisoned(e.to_string())
}

impl LockTable {
    /// Create a new table in which every document is unlocked.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &DocumentId) -> LockResult<Slot> {
        let mut slots = self.slots.lock().map_err(poisoned)?;
        Ok(Arc::clone(slots.entry(id.clone()).or_default()))
    }

    /// Run `f` with exclusive access to `id`'s lock entry.
    ///
    /// Everything `f` reads and writes, including any I/O it performs, is one
    /// critical section with respect to other calls for the same id.
    pub fn with_slot<R>(
        &self,
        id: &DocumentId,
        f: impl FnOnce(&mut Option<Lock>) -> LockResult<R>,
    ) -> LockResult<R> {
        let slot = self.slot(id)?;
        let result = {
            let mut entry = slot.lock().map_err(poisoned)?;
            f(&mut entry)
        };
        self.prune(id, slot)?;
        result
    }

    /// Remove `id`'s slot if it is unlocked and `slot` is the last
    /// reference outside the map.
    fn prune(&self, id: &DocumentId, slot: Slot) -> LockResult<()> {
        // Map before slot, the same order as `clear`.
        let mut slots = self.slots.lock().map_err(poisoned)?;
        let ours = slots.get(id).is_some_and(|s| Arc::ptr_eq(s, &slot));
        if ours && Arc::strong_count(&slot) == 2 && slot.lock().map_err(poisoned)?.is_none() {
            slots.remove(id);
        }
        Ok(())
    }

    /// The current lock on `id`, if any.
    pub fn get(&self, id: &DocumentId) -> LockResult<Option<Lock>> {
        self.with_slot(id, |entry| Ok(entry.clone()))
    }

    /// Every currently held lock, sorted by document id.
    pub fn held(&self) -> LockResult<Vec<(DocumentId, Lock)>> {
        let slots: Vec<(DocumentId, Slot)> = {
            let map = self.slots.lock().map_err(poisoned)?;
            map.iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect()
        };
        let mut held = Vec::new();
        for (id, slot) in slots {
            if let Some(lock) = slot.lock().map_err(poisoned)?.clone() {
                held.push((id, lock));
            }
        }
        held.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(held)
    }

    /// Drop every lock, returning how many were held.
    ///
    /// Each slot is cleared under its own mutex, so a request already inside
    /// a critical section finishes before its document is reset.
    pub fn clear(&self) -> LockResult<usize> {
        let mut slots = self.slots.lock().map_err(poisoned)?;
        let mut cleared = 0;
        for slot in slots.values() {
            if slot.lock().map_err(poisoned)?.take().is_some() {
                cleared += 1;
            }
        }
        // Slots a request still holds are pruned when that request finishes.
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentId {
        DocumentId::new(id).unwrap()
    }

    fn tok(s: &str) -> LockToken {
        LockToken::parse(s).unwrap()
    }

    fn tracked(table: &LockTable) -> usize {
        table.slots.lock().unwrap().len()
    }

    #[test]
    fn new_table_is_unlocked() {
        let table = LockTable::new();
        assert!(table.get(&doc("a.doc")).unwrap().is_none());
        assert!(table.held().unwrap().is_empty());
    }

    #[test]
    fn with_slot_mutations_persist() {
        let table = LockTable::new();
        table
            .with_slot(&doc("a.doc"), |entry| {
                *entry = Some(Lock::new(tok("T1")));
                Ok(())
            })
            .unwrap();
        let lock = table.get(&doc("a.doc")).unwrap().unwrap();
        assert_eq!(lock.token, tok("T1"));
        assert!(table.get(&doc("b.doc")).unwrap().is_none());
    }

    #[test]
    fn replace_token_keeps_acquisition_time() {
        let mut lock = Lock::new(tok("T1"));
        let acquired = lock.acquired_at;
        lock.replace_token(tok("T2"));
        assert_eq!(lock.token, tok("T2"));
        assert_eq!(lock.acquired_at, acquired);
        assert!(lock.refreshed_at >= acquired);
    }

    #[test]
    fn held_lists_only_locked_documents() {
        let table = LockTable::new();
        for (id, token) in [("b.doc", Some("T2")), ("a.doc", Some("T1")), ("c.doc", None)] {
            table
                .with_slot(&doc(id), |entry| {
                    *entry = token.map(|t| Lock::new(tok(t)));
                    Ok(())
                })
                .unwrap();
        }
        let held: Vec<_> = table
            .held()
            .unwrap()
            .into_iter()
            .map(|(id, lock)| (id.to_string(), lock.token.to_string()))
            .collect();
        assert_eq!(
            held,
            vec![
                ("a.doc".to_string(), "T1".to_string()),
                ("b.doc".to_string(), "T2".to_string()),
            ]
        );
    }

    #[test]
    fn clear_counts_and_unlocks() {
        let table = LockTable::new();
        for id in ["a.doc", "b.doc"] {
            table
                .with_slot(&doc(id), |entry| {
                    *entry = Some(Lock::new(tok("T")));
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(table.clear().unwrap(), 2);
        assert_eq!(tracked(&table), 0);
        assert!(table.get(&doc("a.doc")).unwrap().is_none());
        assert_eq!(table.clear().unwrap(), 0);
    }

    #[test]
    fn unlocked_slots_are_pruned() {
        let table = LockTable::new();
        for i in 0..100 {
            let id = doc(&format!("never-locked-{i}.doc"));
            assert!(table.get(&id).unwrap().is_none());
            table.with_slot(&id, |entry| Ok(entry.take())).unwrap();
        }
        assert_eq!(tracked(&table), 0);

        let id = doc("a.doc");
        table
            .with_slot(&id, |entry| {
                *entry = Some(Lock::new(tok("T1")));
                Ok(())
            })
            .unwrap();
        assert_eq!(tracked(&table), 1);
        table.with_slot(&id, |entry| Ok(entry.take())).unwrap();
        assert_eq!(tracked(&table), 0);
    }

    #[test]
    fn failed_critical_section_is_pruned() {
        let table = LockTable::new();
        let err = table
            .with_slot(&doc("a.doc"), |_| -> LockResult<()> { Err(LockError::Poisoned("x".into())) })
            .unwrap_err();
        assert!(matches!(err, LockError::Poisoned(_)));
        assert_eq!(tracked(&table), 0);
    }

    #[test]
    fn slot_in_use_survives_prune() {
        let table = LockTable::new();
        let id = doc("a.doc");
        let held = table.slot(&id).unwrap();
        table.with_slot(&id, |entry| Ok(entry.is_none())).unwrap();
        assert_eq!(tracked(&table), 1);
        assert_eq!(table.clear().unwrap(), 0);
        assert_eq!(tracked(&table), 1);
        drop(held);
        assert_eq!(table.clear().unwrap(), 0);
        assert_eq!(tracked(&table), 0);
    }

    #[test]
    fn concurrent_callers_share_one_slot() {
        let table = LockTable::new();
        let id = doc("a.doc");
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..200 {
                        table
                            .with_slot(&id, |entry| {
                                assert!(entry.is_none());
                                *entry = Some(Lock::new(tok("T")));
                                *entry = None;
                                Ok(())
                            })
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(tracked(&table), 0);
    }

    #[test]
    fn lock_serializes_token_as_text() {
        let lock = Lock::new(tok(r#"{"S":"x"}"#));
        let value = serde_json::to_value(&lock).unwrap();
        assert_eq!(value["token"], r#"{"S":"x"}"#);
        assert!(value["acquiredAt"].is_string());
    }
}
