//! File-backed progress store
//!
//! Directory structure:
//! ```text
//! {data-dir}/progress/
//! ├── .lock            # Held exclusively by every writer
//! └── {item-id}.json   # Revision envelope around one progress record
//! ```
//!
//! Writers take an exclusive lock on `.lock` for the whole
//! read-compare-rename, so stores opened by separate processes on the same
//! directory still see each other's revisions. Each write goes to its own
//! `{item-id}.{nonce}.tmp` file and is renamed into place; readers never see
//! a half-written record and need no lock.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use uuid::Uuid;

use crate::scheduling::{ItemId, ProgressRecord, SchedulerParams};

use super::{decode_entry, prepare_write, EaseFactors, ProgressStore, Result, Revision, StoreUsage, Versioned};

const LOCK_FILE_NAME: &str = ".lock";
const TMP_SUFFIX: &str = ".tmp";

pub struct FileProgressStore {
    progress_dir: PathBuf,
    capacity_bytes: u64,
    ease: EaseFactors,
}

impl FileProgressStore {
    /// Open (creating if needed) the progress directory under `data_dir`
    pub fn open(data_dir: &Path, capacity_bytes: u64) -> Result<Self> {
        let progress_dir = data_dir.join("progress");
        fs::create_dir_all(&progress_dir)?;

        let store = Self {
            progress_dir,
            capacity_bytes,
            ease: EaseFactors::default(),
        };

        let sizes = {
            let _lock = store.lock_dir()?;
            // Writers hold the lock until their rename lands, so any temp
            // file visible now was abandoned
            store.remove_abandoned_writes()?;
            store.scan()?
        };

        log::info!(
            "Opened progress store at {:?} ({} records, {} of {} bytes)",
            store.progress_dir,
            sizes.len(),
            sizes.values().sum::<u64>(),
            capacity_bytes
        );
        Ok(store)
    }

    /// Take the default ease and the ease floor from the scheduler settings
    pub fn with_params(mut self, params: &SchedulerParams) -> Self {
        self.ease = EaseFactors::from_params(params);
        self
    }

    fn entry_path(&self, item_id: ItemId) -> PathBuf {
        self.progress_dir.join(format!("{}.json", item_id))
    }

    /// Block until this handle holds the directory lock. Dropping the
    /// returned file releases it.
    fn lock_dir(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.progress_dir.join(LOCK_FILE_NAME))?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn remove_abandoned_writes(&self) -> Result<()> {
        for entry in fs::read_dir(&self.progress_dir)? {
            let path = entry?.path();
            let is_tmp = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().ends_with(TMP_SUFFIX));
            if is_tmp {
                log::warn!("Removing incomplete progress write {:?}", path);
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }

    /// Size of every record file currently on disk
    fn scan(&self) -> Result<HashMap<ItemId, u64>> {
        let mut sizes = HashMap::new();
        for entry in fs::read_dir(&self.progress_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(item_id) = file_name
                .to_string_lossy()
                .strip_suffix(".json")
                .and_then(|stem| Uuid::parse_str(stem).ok())
            else {
                continue;
            };

            // Another process may delete the file between listing and stat
            match entry.metadata() {
                Ok(metadata) => {
                    sizes.insert(item_id, metadata.len());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(sizes)
    }

    fn read_raw(&self, item_id: ItemId) -> Result<Option<String>> {
        match fs::read_to_string(self.entry_path(item_id)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                log::warn!("Progress entry for {} is not valid UTF-8", item_id);
                Ok(Some(String::new()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl ProgressStore for FileProgressStore {
    fn fetch(&self, item_id: ItemId) -> Result<Versioned<ProgressRecord>> {
        Ok(self
            .read_raw(item_id)?
            .and_then(|raw| decode_entry(item_id, &raw, self.ease.minimum))
            .unwrap_or_else(|| self.ease.absent(item_id)))
    }

    fn put(&self, record: &ProgressRecord, expected: Revision) -> Result<Revision> {
        let _lock = self.lock_dir()?;
        let item_id = record.item_id;

        let current = self.read_raw(item_id)?;
        let others: u64 = self
            .scan()?
            .iter()
            .filter(|(id, _)| **id != item_id)
            .map(|(_, size)| size)
            .sum();
        let used_bytes = others + current.as_ref().map_or(0, |raw| raw.len() as u64);

        let write = prepare_write(
            record,
            expected,
            current.as_deref(),
            used_bytes,
            self.capacity_bytes,
            self.ease.minimum,
        )?;

        let path = self.entry_path(item_id);
        let tmp_path = self
            .progress_dir
            .join(format!("{}.{}{}", item_id, Uuid::new_v4().simple(), TMP_SUFFIX));
        let published = fs::write(&tmp_path, &write.encoded).and_then(|()| fs::rename(&tmp_path, &path));
        if let Err(e) = published {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(write.revision)
    }

    fn delete(&self, item_id: ItemId) -> Result<()> {
        let _lock = self.lock_dir()?;
        match fs::remove_file(self.entry_path(item_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<ProgressRecord>> {
        let mut records = Vec::new();
        for item_id in self.scan()?.into_keys() {
            if let Some(raw) = self.read_raw(item_id)? {
                if let Some(versioned) = decode_entry(item_id, &raw, self.ease.minimum) {
                    records.push(versioned.value);
                }
            }
        }
        records.sort_by_key(|r| r.item_id);
        Ok(records)
    }

    fn usage(&self) -> Result<StoreUsage> {
        let sizes = self.scan()?;
        Ok(StoreUsage {
            records: sizes.len(),
            used_bytes: sizes.values().sum(),
            capacity_bytes: self.capacity_bytes,
        })
    }
}
