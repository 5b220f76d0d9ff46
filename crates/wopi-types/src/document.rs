//! Document identity and metadata.
//!
//! Valid document ids:
//! - Must be non-empty and at most 255 bytes
//! - Must not contain `/`, `\`, NUL or other control characters
//! - Must not start with `.` (rules out `.`, `..` and hidden files)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::TypeError;
use crate::version::VersionId;

/// Longest accepted document id, in bytes.
pub const MAX_DOCUMENT_ID_LEN: usize = 255;

/// Stable, file-name-like identifier of a document.
///
/// Ids are validated on construction so that a filesystem-backed store can
/// use them directly as file names without escaping its root directory.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate and wrap a document id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        validate_document_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_document_id(id: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidDocumentId {
        id: id.to_string(),
        reason: reason.to_string(),
    };

    if id.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if id.len() > MAX_DOCUMENT_ID_LEN {
        return Err(invalid("longer than 255 bytes"));
    }
    if id.starts_with('.') {
        return Err(invalid("must not start with '.'"));
    }
    if let Some(ch) = id
        .chars()
        .find(|c| *c == '/' || *c == '\\' || c.is_control())
    {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

impl FromStr for DocumentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

/// Metadata snapshot of a stored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStat {
    #[serde(rename = "fileId")]
    pub id: DocumentId,
    pub size: u64,
    pub version: VersionId,
    #[serde(rename = "sha256")]
    pub digest: ContentDigest,
    pub last_modified: DateTime<Utc>,
}

impl DocumentStat {
    /// Build a stat for `content` as written at `version`.
    pub fn describe(
        id: DocumentId,
        content: &[u8],
        version: VersionId,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            size: content.len() as u64,
            version,
            digest: ContentDigest::of(content),
            last_modified,
        }
    }
}
