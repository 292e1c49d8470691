//! Storage operations for vocabulary items
//!
//! All items live in a single `vocabulary.json` under the data directory,
//! kept in creation order.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{NewItem, VocabularyFile, VocabularyItem};
use crate::scheduling::ItemId;

#[derive(Error, Debug)]
pub enum VocabularyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

pub type Result<T> = std::result::Result<T, VocabularyError>;

/// Source of the items that can be scheduled
pub trait ItemCatalog {
    /// Ids of every item, oldest first
    fn item_ids(&self) -> Result<Vec<ItemId>>;

    /// Forget an item. Fails with `ItemNotFound` if it does not exist.
    fn remove_item(&self, item_id: ItemId) -> Result<VocabularyItem>;
}

/// Storage manager for vocabulary items
pub struct VocabularyStorage {
    data_dir: PathBuf,
    /// Serializes read-modify-write cycles on vocabulary.json
    write_lock: Mutex<()>,
}

impl VocabularyStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            write_lock: Mutex::new(()),
        }
    }

    fn vocabulary_path(&self) -> PathBuf {
        self.data_dir.join("vocabulary.json")
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(&self) -> Result<VocabularyFile> {
        let path = self.vocabulary_path();
        if !path.exists() {
            return Ok(VocabularyFile::default());
        }

        let content = fs::read_to_string(&path)?;
        let mut file: VocabularyFile = serde_json::from_str(&content)?;
        file.items.sort_by_key(|item| item.position);

        // Guard against a hand-edited counter that would reuse positions
        let max_position = file.items.iter().map(|i| i.position + 1).max().unwrap_or(0);
        file.next_position = file.next_position.max(max_position);
        Ok(file)
    }

    /// Save using atomic write (write to .tmp then rename)
    fn save(&self, file: &VocabularyFile) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.vocabulary_path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(file)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// List all items, oldest first
    pub fn list_items(&self) -> Result<Vec<VocabularyItem>> {
        Ok(self.load()?.items)
    }

    /// Get a specific item
    pub fn get_item(&self, item_id: ItemId) -> Result<VocabularyItem> {
        self.load()?
            .items
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or(VocabularyError::ItemNotFound(item_id))
    }

    /// Create a new item
    pub fn add_item(&self, new: NewItem, now: DateTime<Utc>) -> Result<VocabularyItem> {
        let term = new.term.trim().to_string();
        let definition = new.definition.trim().to_string();
        if term.is_empty() {
            return Err(VocabularyError::InvalidItem("term is empty".to_string()));
        }
        if definition.is_empty() {
            return Err(VocabularyError::InvalidItem("definition is empty".to_string()));
        }

        let _guard = self.lock();
        let mut file = self.load()?;

        let mut item = VocabularyItem::new(term, definition, file.next_position, now);
        item.example = new.example.filter(|e| !e.trim().is_empty());
        item.tags = new
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        file.next_position += 1;
        file.items.push(item.clone());
        self.save(&file)?;

        log::info!("Added vocabulary item {} ({})", item.id, item.term);
        Ok(item)
    }
}

impl ItemCatalog for VocabularyStorage {
    fn item_ids(&self) -> Result<Vec<ItemId>> {
        Ok(self.load()?.items.iter().map(|item| item.id).collect())
    }

    fn remove_item(&self, item_id: ItemId) -> Result<VocabularyItem> {
        let _guard = self.lock();
        let mut file = self.load()?;

        let pos = file
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(VocabularyError::ItemNotFound(item_id))?;
        let removed = file.items.remove(pos);
        self.save(&file)?;

        log::info!("Removed vocabulary item {} ({})", removed.id, removed.term);
        Ok(removed)
    }
}
