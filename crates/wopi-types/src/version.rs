use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque document version marker.
///
/// A new `VersionId` is produced by every successful content write. Versions
/// are only meaningful for equality: two different writes never share a
/// version, but nothing may be inferred from comparing their text.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Version derived from a millisecond timestamp.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.0)
    }
}

/// Issues strictly advancing version identifiers.
///
/// Each tick yields `max(now_ms, last + 1)`, so two writes within the same
/// millisecond (or after the wall clock steps backwards) still receive
/// distinct versions.
#[derive(Debug, Default)]
pub struct VersionClock {
    last: AtomicU64,
}

impl VersionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next version.
    pub fn tick(&self) -> VersionId {
        let now = now_millis();
        let mut prev = self.last.load(Ordering::Acquire);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return VersionId::from_millis(next),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Raise the clock floor so later ticks sort after `ms`.
    ///
    /// Used when versions are recovered from existing data (e.g. file mtimes)
    /// so that the next write cannot reissue one of them.
    pub fn observe(&self, ms: u64) {
        self.last.fetch_max(ms, Ordering::AcqRel);
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
