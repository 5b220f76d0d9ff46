use wopi_types::{DocumentId, DocumentStat, VersionId};

use crate::error::StoreResult;

/// Byte storage for documents.
///
/// All implementations must satisfy these invariants:
/// - `write` always succeeds for a valid id unless the backend fails, and
///   creates the document when absent.
/// - The version returned by `write` differs from every version previously
///   reported for that document.
/// - `read`, `exists` and `stat` agree with the last completed `write`.
pub trait DocumentStore: Send + Sync {
    /// Read a document's content.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    fn read(&self, id: &DocumentId) -> StoreResult<Option<Vec<u8>>>;

    /// Replace a document's content and return its new version.
    fn write(&self, id: &DocumentId, content: &[u8]) -> StoreResult<VersionId>;

    /// Check whether a document exists.
    fn exists(&self, id: &DocumentId) -> StoreResult<bool>;

    /// Size, version, digest and modification time of a document.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    fn stat(&self, id: &DocumentId) -> StoreResult<Option<DocumentStat>>;

    /// Stats of every stored document, sorted by id.
    fn list(&self) -> StoreResult<Vec<DocumentStat>>;
}
