//! Data models for vocabulary items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduling::ItemId;

/// A term and its meaning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: ItemId,
    pub term: String,
    pub definition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation ordinal; never reused after removal
    pub position: u64,
    pub created_at: DateTime<Utc>,
}

impl VocabularyItem {
    pub fn new(term: String, definition: String, position: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            term,
            definition,
            example: None,
            tags: Vec::new(),
            position,
            created_at,
        }
    }
}

/// Fields for a new item
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub term: String,
    pub definition: String,
    pub example: Option<String>,
    pub tags: Vec<String>,
}

/// Contents of vocabulary.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VocabularyFile {
    #[serde(default)]
    pub next_position: u64,
    #[serde(default)]
    pub items: Vec<VocabularyItem>,
}
