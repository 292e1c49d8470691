use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use recall_lib::clock::{Clock, SystemClock};
use recall_lib::config::RecallConfig;
use recall_lib::progress::FileProgressStore;
use recall_lib::scheduling::SchedulingEngine;
use recall_lib::session::SessionCoordinator;
use recall_lib::vocabulary::{NewItem, VocabularyItem, VocabularyStorage};

/// Shared application state for CLI commands
pub struct App {
    pub data_dir: PathBuf,
    pub config: RecallConfig,
    pub engine: SchedulingEngine,
    pub store: Arc<FileProgressStore>,
    pub vocabulary: Arc<VocabularyStorage>,
    pub clock: Arc<SystemClock>,
}

impl App {
    /// Open the data directory, loading its config
    pub fn new(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => RecallConfig::default_data_dir().context("Failed to get data directory")?,
        };
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = RecallConfig::load(&data_dir).context("Failed to load config")?;
        let engine = SchedulingEngine::new(config.scheduler.clone())
            .context("Invalid scheduler settings")?;
        let store = FileProgressStore::open(&data_dir, config.storage.capacity_bytes)
            .context("Failed to open progress store")?
            .with_params(&config.scheduler);
        let vocabulary = VocabularyStorage::new(data_dir.clone());

        Ok(Self {
            data_dir,
            config,
            engine,
            store: Arc::new(store),
            vocabulary: Arc::new(vocabulary),
            clock: Arc::new(SystemClock),
        })
    }

    /// A coordinator over this data directory
    pub fn coordinator(&self) -> SessionCoordinator {
        SessionCoordinator::new(
            self.store.clone(),
            self.vocabulary.clone(),
            self.clock.clone(),
            self.engine.clone(),
        )
        .with_config(self.config.session.clone())
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn list_items(&self) -> Result<Vec<VocabularyItem>> {
        self.vocabulary.list_items().context("Failed to list items")
    }

    pub fn add_item(&self, new: NewItem) -> Result<VocabularyItem> {
        self.vocabulary
            .add_item(new, self.now())
            .context("Failed to add item")
    }

    /// Find an item by id, id prefix or term (case-insensitive)
    pub fn find_item(&self, query: &str) -> Result<VocabularyItem> {
        let items = self.list_items()?;
        let query_lower = query.trim().to_lowercase();

        // Exact match first
        if let Some(item) = items.iter().find(|i| {
            i.id.to_string() == query_lower || i.term.to_lowercase() == query_lower
        }) {
            return Ok(item.clone());
        }

        // Prefix match
        let matches: Vec<&VocabularyItem> = items
            .iter()
            .filter(|i| {
                i.id.to_string().starts_with(&query_lower)
                    || i.term.to_lowercase().starts_with(&query_lower)
            })
            .collect();

        match matches.len() {
            0 => bail!("No item matching '{}'", query),
            1 => Ok(matches[0].clone()),
            _ => bail!(
                "Ambiguous item '{}'. Matches:\n{}",
                query,
                matches
                    .iter()
                    .map(|i| format!("  - {} ({})", i.term, i.id))
                    .collect::<Vec<_>>()
                    .join("\n")
            ),
        }
    }
}
