use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use wopi_types::{DocumentId, DocumentStat, VersionClock, VersionId};

use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;

#[derive(Clone, Debug)]
struct StoredDocument {
    content: Vec<u8>,
    version: VersionId,
    modified: DateTime<Utc>,
}

impl StoredDocument {
    fn stat(&self, id: &DocumentId) -> DocumentStat {
        DocumentStat::describe(id.clone(), &self.content, self.version.clone(), self.modified)
    }
}

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Documents are held behind a `RwLock` and
/// are lost when the store is dropped.
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, StoredDocument>>,
    clock: VersionClock,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            clock: VersionClock::new(),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.documents.read().map_err(poisoned)?.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every document.
    pub fn clear(&self) -> StoreResult<()> {
        self.documents.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

impl DocumentStore for InMemoryDocumentStore {
    fn read(&self, id: &DocumentId) -> StoreResult<Option<Vec<u8>>> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.get(id).map(|d| d.content.clone()))
    }

    fn write(&self, id: &DocumentId, content: &[u8]) -> StoreResult<VersionId> {
        let mut docs = self.documents.write().map_err(poisoned)?;
        let version = self.clock.tick();
        docs.insert(
            id.clone(),
            StoredDocument {
                content: content.to_vec(),
                version: version.clone(),
                modified: Utc::now(),
            },
        );
        tracing::debug!(document = %id, bytes = content.len(), %version, "document written");
        Ok(version)
    }

    fn exists(&self, id: &DocumentId) -> StoreResult<bool> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.contains_key(id))
    }

    fn stat(&self, id: &DocumentId) -> StoreResult<Option<DocumentStat>> {
        let docs = self.documents.read().map_err(poisoned)?;
        Ok(docs.get(id).map(|d| d.stat(id)))
    }

    fn list(&self) -> StoreResult<Vec<DocumentStat>> {
        let docs = self.documents.read().map_err(poisoned)?;
        let mut stats: Vec<DocumentStat> = docs.iter().map(|(id, d)| d.stat(id)).collect();
        stats.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stats)
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &count)
            .finish()
    }
}
