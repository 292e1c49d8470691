//! In-memory progress store
//!
//! Entries are kept in their serialized form, the same way a browser-style
//! key-value store would hold them, so the byte budget and corruption
//! handling behave exactly as they do on disk.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::scheduling::{ItemId, ProgressRecord, SchedulerParams};

use super::{decode_entry, prepare_write, EaseFactors, ProgressStore, Result, Revision, StoreUsage, Versioned};
use super::DEFAULT_CAPACITY_BYTES;

#[derive(Default)]
struct Entries {
    raw: HashMap<ItemId, String>,
    used_bytes: u64,
}

pub struct MemoryProgressStore {
    entries: Mutex<Entries>,
    capacity_bytes: u64,
    ease: EaseFactors,
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_BYTES)
    }
}

impl MemoryProgressStore {
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            capacity_bytes,
            ease: EaseFactors::default(),
        }
    }

    /// Take the default ease and the ease floor from the scheduler settings
    pub fn with_params(mut self, params: &SchedulerParams) -> Self {
        self.ease = EaseFactors::from_params(params);
        self
    }

    /// Store a raw entry without any checks
    #[cfg(test)]
    pub(crate) fn insert_raw(&self, item_id: ItemId, raw: &str) {
        let mut entries = self.lock();
        if let Some(old) = entries.raw.insert(item_id, raw.to_string()) {
            entries.used_bytes -= old.len() as u64;
        }
        entries.used_bytes += raw.len() as u64;
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

}

impl ProgressStore for MemoryProgressStore {
    fn fetch(&self, item_id: ItemId) -> Result<Versioned<ProgressRecord>> {
        let entries = self.lock();
        Ok(entries
            .raw
            .get(&item_id)
            .and_then(|raw| decode_entry(item_id, raw, self.ease.minimum))
            .unwrap_or_else(|| self.ease.absent(item_id)))
    }

    fn put(&self, record: &ProgressRecord, expected: Revision) -> Result<Revision> {
        let mut entries = self.lock();
        let write = prepare_write(
            record,
            expected,
            entries.raw.get(&record.item_id).map(String::as_str),
            entries.used_bytes,
            self.capacity_bytes,
            self.ease.minimum,
        )?;

        entries.raw.insert(record.item_id, write.encoded);
        entries.used_bytes = write.used_after;
        Ok(write.revision)
    }

    fn delete(&self, item_id: ItemId) -> Result<()> {
        let mut entries = self.lock();
        if let Some(old) = entries.raw.remove(&item_id) {
            entries.used_bytes -= old.len() as u64;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<ProgressRecord>> {
        let entries = self.lock();
        let mut records: Vec<ProgressRecord> = entries
            .raw
            .iter()
            .filter_map(|(id, raw)| decode_entry(*id, raw, self.ease.minimum))
            .map(|versioned| versioned.value)
            .collect();
        records.sort_by_key(|r| r.item_id);
        Ok(records)
    }

    fn usage(&self) -> Result<StoreUsage> {
        let entries = self.lock();
        Ok(StoreUsage {
            records: entries.raw.len(),
            used_bytes: entries.used_bytes,
            capacity_bytes: self.capacity_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStoreError;
    use crate::scheduling::{Grade, SchedulingEngine};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn reviewed(item_id: ItemId) -> ProgressRecord {
        let engine = SchedulingEngine::default();
        let now = Utc.with_ymd_and_hms(2026, 4, 2, 18, 45, 12).unwrap();
        engine
            .next_state(&engine.initial_record(item_id), Grade::Good, now)
            .unwrap()
    }

    #[test]
    fn test_get_missing_returns_default_without_side_effects() {
        let store = MemoryProgressStore::default();
        let id = Uuid::new_v4();

        assert_eq!(store.get(id).unwrap(), ProgressRecord::new(id));
        assert_eq!(store.get(id).unwrap(), ProgressRecord::new(id));
        assert_eq!(store.usage().unwrap().records, 0);
        assert_eq!(store.fetch(id).unwrap().revision, Revision::ABSENT);
    }

    #[test]
    fn test_default_uses_configured_ease() {
        let params = SchedulerParams {
            initial_ease_factor: 2.1,
            ..SchedulerParams::default()
        };
        let store = MemoryProgressStore::default().with_params(&params);
        assert_eq!(store.get(Uuid::new_v4()).unwrap().ease_factor, 2.1);
    }

    #[test]
    fn test_ease_below_floor_reads_as_absent() {
        let store = MemoryProgressStore::default();
        let mut record = reviewed(Uuid::new_v4());
        store.put(&record, Revision::ABSENT).unwrap();

        let raw = serde_json::json!({
            "revision": 1,
            "record": { "itemId": record.item_id, "easeFactor": 0.9 },
        });
        store.insert_raw(record.item_id, &raw.to_string());
        assert!(store.get(record.item_id).unwrap().is_new());

        record.ease_factor = 0.9;
        assert!(matches!(
            store.put(&record, Revision::ABSENT),
            Err(ProgressStoreError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let store = MemoryProgressStore::default();
        let mut record = reviewed(Uuid::new_v4());
        record.ease_factor = 2.3500000000000005;

        let revision = store.put(&record, Revision::ABSENT).unwrap();
        assert_eq!(revision, Revision(1));
        assert_eq!(store.get(record.item_id).unwrap(), record);
    }

    #[test]
    fn test_stale_write_conflicts() {
        let store = MemoryProgressStore::default();
        let record = reviewed(Uuid::new_v4());

        let read = store.fetch(record.item_id).unwrap();
        store.put(&record, read.revision).unwrap();

        let err = store.put(&record, read.revision).unwrap_err();
        assert!(matches!(err, ProgressStoreError::ConcurrentModification { .. }));

        let fresh = store.fetch(record.item_id).unwrap();
        assert_eq!(store.put(&record, fresh.revision).unwrap(), Revision(2));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryProgressStore::default();
        let record = reviewed(Uuid::new_v4());
        store.put(&record, Revision::ABSENT).unwrap();

        store.delete(record.item_id).unwrap();
        store.delete(record.item_id).unwrap();

        assert!(store.get(record.item_id).unwrap().is_new());
        assert_eq!(store.usage().unwrap().used_bytes, 0);
    }

    #[test]
    fn test_capacity_exceeded_keeps_existing_data() {
        let first = reviewed(Uuid::new_v4());
        let probe = MemoryProgressStore::default();
        probe.put(&first, Revision::ABSENT).unwrap();
        let one_entry = probe.usage().unwrap().used_bytes;

        let store = MemoryProgressStore::new(one_entry + 10);
        store.put(&first, Revision::ABSENT).unwrap();

        let second = reviewed(Uuid::new_v4());
        let err = store.put(&second, Revision::ABSENT).unwrap_err();
        assert!(matches!(err, ProgressStoreError::CapacityExceeded { .. }));

        assert_eq!(store.get(first.item_id).unwrap(), first);
        assert!(store.get(second.item_id).unwrap().is_new());
        assert_eq!(store.usage().unwrap().records, 1);
    }

    #[test]
    fn test_corrupt_entry_reads_as_absent_and_is_replaced() {
        let store = MemoryProgressStore::default();
        let id = Uuid::new_v4();
        store.insert_raw(id, "{\"revision\":3,\"record\":{\"itemId\":");

        let read = store.fetch(id).unwrap();
        assert!(read.value.is_new());
        assert_eq!(read.revision, Revision::ABSENT);
        assert!(store.list().unwrap().is_empty());

        let record = reviewed(id);
        store.put(&record, read.revision).unwrap();
        assert_eq!(store.get(id).unwrap(), record);
    }

    #[test]
    fn test_invalid_record_is_refused() {
        let store = MemoryProgressStore::default();
        let mut record = reviewed(Uuid::new_v4());
        record.interval_days += 1;

        let err = store.put(&record, Revision::ABSENT).unwrap_err();
        assert!(matches!(err, ProgressStoreError::InvalidRecord { .. }));
    }

    #[test]
    fn test_list_is_sorted() {
        let store = MemoryProgressStore::default();
        for _ in 0..5 {
            store.put(&reviewed(Uuid::new_v4()), Revision::ABSENT).unwrap();
        }
        let ids: Vec<ItemId> = store.list().unwrap().iter().map(|r| r.item_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids.len(), 5);
        assert_eq!(ids, sorted);
    }
}
