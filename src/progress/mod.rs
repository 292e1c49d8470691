//! Durable storage of per-item review progress
//!
//! Every stored entry is an envelope holding the record and a revision
//! number. Writes are compare-and-swap against the revision the caller read,
//! so two writers working from the same stale read cannot both succeed.
//!
//! Entries that fail to parse or validate are treated as absent and get
//! replaced by the next write. Progress is never evicted to make room: a
//! write past the byte budget fails instead.

mod file_store;
mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scheduling::{
    ItemId, ProgressRecord, SchedulerParams, DEFAULT_INITIAL_EASE_FACTOR, DEFAULT_MINIMUM_EASE_FACTOR,
};

pub use file_store::FileProgressStore;
pub use memory::MemoryProgressStore;

/// Default byte budget for stored progress (5 MiB)
pub const DEFAULT_CAPACITY_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ProgressStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Progress storage full: saving {item_id} needs {required} bytes but the budget is {budget} bytes")]
    CapacityExceeded {
        item_id: ItemId,
        required: u64,
        budget: u64,
    },

    #[error("Progress for {item_id} changed concurrently (expected revision {expected}, found {actual})")]
    ConcurrentModification {
        item_id: ItemId,
        expected: Revision,
        actual: Revision,
    },

    #[error("Invalid progress record for {item_id}: {reason}")]
    InvalidRecord { item_id: ItemId, reason: String },
}

pub type Result<T> = std::result::Result<T, ProgressStoreError>;

/// Version of a stored entry. Absent entries are at revision 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    pub const ABSENT: Revision = Revision(0);

    pub fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value together with the revision it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub revision: Revision,
}

/// Space used by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUsage {
    pub records: usize,
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

/// Persistence contract for progress records.
///
/// Implementations must make `put` atomic: a reader sees either the old
/// record or the new one, never a mix of the two.
pub trait ProgressStore: Send + Sync {
    /// Read a record and its revision. Missing or corrupt entries yield the
    /// unreviewed default at [`Revision::ABSENT`].
    fn fetch(&self, item_id: ItemId) -> Result<Versioned<ProgressRecord>>;

    /// Replace the record if the stored revision still equals `expected`.
    /// Returns the new revision.
    fn put(&self, record: &ProgressRecord, expected: Revision) -> Result<Revision>;

    /// Remove a record. Removing a missing record succeeds.
    fn delete(&self, item_id: ItemId) -> Result<()>;

    /// All readable records, ordered by item id
    fn list(&self) -> Result<Vec<ProgressRecord>>;

    fn usage(&self) -> Result<StoreUsage>;

    /// Current record, or the unreviewed default
    fn get(&self, item_id: ItemId) -> Result<ProgressRecord> {
        Ok(self.fetch(item_id)?.value)
    }
}

/// Ease factors a store needs to build default records and check stored ones
#[derive(Debug, Clone, Copy, PartialEq)]
struct EaseFactors {
    initial: f64,
    minimum: f64,
}

impl Default for EaseFactors {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_EASE_FACTOR,
            minimum: DEFAULT_MINIMUM_EASE_FACTOR,
        }
    }
}

impl EaseFactors {
    fn from_params(params: &SchedulerParams) -> Self {
        Self {
            initial: params.initial_ease_factor,
            minimum: params.minimum_ease_factor,
        }
    }

    /// The unreviewed default at [`Revision::ABSENT`]
    fn absent(&self, item_id: ItemId) -> Versioned<ProgressRecord> {
        Versioned {
            value: ProgressRecord::with_ease_factor(item_id, self.initial),
            revision: Revision::ABSENT,
        }
    }
}

/// On-disk form of a stored record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgress {
    revision: Revision,
    record: ProgressRecord,
}

/// Decode a raw entry, returning `None` for anything unusable
fn decode_entry(item_id: ItemId, raw: &str, minimum_ease_factor: f64) -> Option<Versioned<ProgressRecord>> {
    let stored: StoredProgress = match serde_json::from_str(raw) {
        Ok(stored) => stored,
        Err(e) => {
            log::warn!("Ignoring unreadable progress entry for {}: {}", item_id, e);
            return None;
        }
    };

    if stored.record.item_id != item_id {
        log::warn!(
            "Ignoring progress entry for {} that belongs to {}",
            item_id,
            stored.record.item_id
        );
        return None;
    }

    if let Err(reason) = stored.record.validate(minimum_ease_factor) {
        log::warn!("Ignoring invalid progress entry for {}: {}", item_id, reason);
        return None;
    }

    Some(Versioned {
        value: stored.record,
        revision: stored.revision,
    })
}

/// A write that passed every check and is ready to be persisted
#[derive(Debug)]
struct PreparedWrite {
    encoded: String,
    revision: Revision,
    /// Store size once the write lands
    used_after: u64,
}

/// Run the checks shared by all stores: record validity, the revision
/// compare, and the byte budget.
fn prepare_write(
    record: &ProgressRecord,
    expected: Revision,
    current_raw: Option<&str>,
    used_bytes: u64,
    capacity_bytes: u64,
    minimum_ease_factor: f64,
) -> Result<PreparedWrite> {
    let item_id = record.item_id;

    record
        .validate(minimum_ease_factor)
        .map_err(|reason| ProgressStoreError::InvalidRecord { item_id, reason })?;

    let actual = current_raw
        .and_then(|raw| decode_entry(item_id, raw, minimum_ease_factor))
        .map_or(Revision::ABSENT, |current| current.revision);
    if actual != expected {
        return Err(ProgressStoreError::ConcurrentModification {
            item_id,
            expected,
            actual,
        });
    }

    let revision = actual.next();
    let encoded = serde_json::to_string_pretty(&StoredProgress {
        revision,
        record: record.clone(),
    })?;

    let replaced = current_raw.map_or(0, |raw| raw.len() as u64);
    let used_after = used_bytes.saturating_sub(replaced) + encoded.len() as u64;
    if used_after > capacity_bytes {
        return Err(ProgressStoreError::CapacityExceeded {
            item_id,
            required: used_after,
            budget: capacity_bytes,
        });
    }

    Ok(PreparedWrite {
        encoded,
        revision,
        used_after,
    })
}
