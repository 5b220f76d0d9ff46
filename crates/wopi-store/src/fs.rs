//! Filesystem-backed document store.
//!
//! Each document is a single file named after its id directly under the
//! store root. Writes go to a temporary file in the same directory and are
//! renamed into place, so readers never observe a partially written document
//! and a failed write leaves the previous content intact. The rename and the
//! new version are recorded under one guard, so a stat never pairs content
//! with another write's version.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use wopi_types::{DocumentId, DocumentStat, VersionClock, VersionId};

use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;

/// A [`DocumentStore`] keeping one file per document under `root`.
///
/// Versions issued by this process are remembered in memory. Documents that
/// have not been written since start-up report a version derived from their
/// file modification time.
pub struct FsDocumentStore {
    root: PathBuf,
    versions: RwLock<HashMap<DocumentId, VersionId>>,
    clock: VersionClock,
}

impl FsDocumentStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "opened filesystem document store");
        Ok(Self {
            root,
            versions: RwLock::new(HashMap::new()),
            clock: VersionClock::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, id: &DocumentId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn version_of(
        &self,
        versions: &HashMap<DocumentId, VersionId>,
        id: &DocumentId,
        modified_ms: u64,
    ) -> VersionId {
        if let Some(v) = versions.get(id) {
            return v.clone();
        }
        // Later writes must not reissue the mtime-derived version.
        self.clock.observe(modified_ms);
        VersionId::from_millis(modified_ms)
    }

    fn stat_path(&self, id: &DocumentId, path: &Path) -> StoreResult<Option<DocumentStat>> {
        // Held across the read so a concurrent write cannot land in between.
        let versions = self.versions.read().map_err(poisoned)?;
        let Some(content) = read_file(path)? else {
            return Ok(None);
        };
        let modified = fs::metadata(path)?.modified()?;
        let modified_ms = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let version = self.version_of(&versions, id, modified_ms);
        drop(versions);
        Ok(Some(DocumentStat::describe(
            id.clone(),
            &content,
            version,
            DateTime::<Utc>::from(modified),
        )))
    }
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

/// File content, or `None` when nothing readable as a document is there.
fn read_file(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound || path.is_dir() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl DocumentStore for FsDocumentStore {
    fn read(&self, id: &DocumentId) -> StoreResult<Option<Vec<u8>>> {
        read_file(&self.path_of(id))
    }

    fn write(&self, id: &DocumentId, content: &[u8]) -> StoreResult<VersionId> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;

        let mut versions = self.versions.write().map_err(poisoned)?;
        tmp.persist(self.path_of(id)).map_err(|e| e.error)?;
        let version = self.clock.tick();
        versions.insert(id.clone(), version.clone());
        drop(versions);
        debug!(document = %id, bytes = content.len(), %version, "document written");
        Ok(version)
    }

    fn exists(&self, id: &DocumentId) -> StoreResult<bool> {
        Ok(self.path_of(id).is_file())
    }

    fn stat(&self, id: &DocumentId) -> StoreResult<Option<DocumentStat>> {
        self.stat_path(id, &self.path_of(id))
    }

    fn list(&self) -> StoreResult<Vec<DocumentStat>> {
        let mut stats = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Temporary files start with '.' and never parse as ids.
            let Ok(id) = DocumentId::new(name) else {
                continue;
            };
            if let Some(stat) = self.stat_path(&id, &entry.path())? {
                stats.push(stat);
            }
        }
        stats.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(stats)
    }
}

impl std::fmt::Debug for FsDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDocumentStore")
            .field("root", &self.root)
            .finish()
    }
}
