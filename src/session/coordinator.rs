//! Study session orchestration
//!
//! A session snapshots the due items when it starts and keeps that membership
//! until it ends; items that fall due mid-session wait for the next one.
//! Each graded item is scheduled, committed to the progress store and taken
//! off the queue, so grading it twice is rejected.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{AnalyticsSink, LogAnalytics, ReviewOutcome, SessionHistory, SessionStats};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::progress::{ProgressStore, ProgressStoreError};
use crate::review::ReviewSelector;
use crate::scheduling::{Grade, ItemId, ProgressRecord, SchedulingEngine, SchedulingError};
use crate::vocabulary::{ItemCatalog, VocabularyError, VocabularyItem};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Item {0} is not waiting for review in the current session")]
    NotInSession(ItemId),

    #[error("A study session is already active")]
    SessionAlreadyActive,

    #[error("No study session is active")]
    NoActiveSession,

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error(transparent)]
    Store(#[from] ProgressStoreError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

struct ActiveSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    remaining: VecDeque<ItemId>,
    outcomes: Vec<ReviewOutcome>,
}

/// Drives study sessions for one user.
///
/// At most one session is active per coordinator. Separate coordinators,
/// including ones in other processes over the same data directory, can run
/// sessions side by side: their commits are serialized by the store's
/// compare-and-swap, so a review graded in both lands twice rather than
/// being lost.
pub struct SessionCoordinator {
    store: Arc<dyn ProgressStore>,
    catalog: Arc<dyn ItemCatalog>,
    clock: Arc<dyn Clock>,
    engine: SchedulingEngine,
    config: SessionConfig,
    analytics: Box<dyn AnalyticsSink>,
    history: SessionHistory,
    active: Option<ActiveSession>,
}

impl SessionCoordinator {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        catalog: Arc<dyn ItemCatalog>,
        clock: Arc<dyn Clock>,
        engine: SchedulingEngine,
    ) -> Self {
        let config = SessionConfig::default();
        Self {
            store,
            catalog,
            clock,
            engine,
            history: SessionHistory::new(config.history_capacity),
            config,
            analytics: Box::new(LogAnalytics),
            active: None,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.history = SessionHistory::new(config.history_capacity);
        self.config = config;
        self
    }

    pub fn with_analytics(mut self, analytics: Box<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current progress for an item
    pub fn progress(&self, item_id: ItemId) -> Result<ProgressRecord> {
        let current = self.store.fetch(item_id)?;
        if current.value.is_new() {
            return Ok(self.engine.initial_record(item_id));
        }
        Ok(current.value)
    }

    /// Items due right now, in review order
    pub fn due_items(&self) -> Result<Vec<ItemId>> {
        let items = self.catalog.item_ids()?;
        Ok(ReviewSelector::new(self.store.as_ref()).due_items(&items, self.clock.now())?)
    }

    /// Begin a session over at most `limit` of the currently due items.
    /// Returns the session's items in review order.
    pub fn start_session(&mut self, limit: usize) -> Result<Vec<ItemId>> {
        if self.active.is_some() {
            return Err(SessionError::SessionAlreadyActive);
        }

        let now = self.clock.now();
        let items = self.catalog.item_ids()?;
        let mut due = ReviewSelector::new(self.store.as_ref()).due_items(&items, now)?;
        due.truncate(limit);

        let session = ActiveSession {
            id: Uuid::new_v4(),
            started_at: now,
            remaining: due.iter().copied().collect(),
            outcomes: Vec::new(),
        };
        log::info!(
            "Started session {} with {} of {} catalogue items",
            session.id,
            due.len(),
            items.len()
        );
        self.active = Some(session);

        Ok(due)
    }

    /// Items of the active session still waiting for a grade
    pub fn remaining(&self) -> Vec<ItemId> {
        self.active
            .as_ref()
            .map(|s| s.remaining.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn next_item(&self) -> Option<ItemId> {
        self.active.as_ref().and_then(|s| s.remaining.front().copied())
    }

    /// Grade one item of the active session and commit its new schedule.
    ///
    /// The item leaves the queue only once the commit succeeds, so a failed
    /// write (for example a full store) can be retried.
    pub fn submit_review(&mut self, item_id: ItemId, grade: Grade) -> Result<ProgressRecord> {
        let position = self
            .active
            .as_ref()
            .and_then(|s| s.remaining.iter().position(|id| *id == item_id))
            .ok_or(SessionError::NotInSession(item_id))?;

        let now = self.clock.now();
        let record = self.commit_review(item_id, grade, now)?;

        if let Some(session) = self.active.as_mut() {
            session.remaining.remove(position);
            session.outcomes.push(ReviewOutcome {
                grade,
                streak: record.streak,
            });
        }

        Ok(record)
    }

    /// Close the active session and report its statistics
    pub fn end_session(&mut self) -> Result<SessionStats> {
        let session = self.active.take().ok_or(SessionError::NoActiveSession)?;

        let mut streak_distribution = BTreeMap::new();
        for outcome in &session.outcomes {
            *streak_distribution.entry(outcome.streak).or_insert(0) += 1;
        }
        let passed = session.outcomes.iter().filter(|o| o.grade.is_pass()).count();

        let stats = SessionStats {
            session_id: session.id,
            started_at: session.started_at,
            ended_at: self.clock.now(),
            reviewed: session.outcomes.len(),
            passed,
            failed: session.outcomes.len() - passed,
            remaining: session.remaining.len(),
            streak_distribution,
        };

        self.analytics.record_session(&stats);
        self.history.push(stats.clone());
        Ok(stats)
    }

    /// Delete an item together with its progress.
    ///
    /// Only allowed between sessions, so a snapshot never refers to a
    /// deleted item. The catalogue entry goes first; a progress record left
    /// behind by a failed delete is an orphan for [`Self::purge_orphans`].
    pub fn remove_item(&mut self, item_id: ItemId) -> Result<VocabularyItem> {
        if self.active.is_some() {
            return Err(SessionError::SessionAlreadyActive);
        }

        let removed = self.catalog.remove_item(item_id)?;
        if let Err(e) = self.store.delete(item_id) {
            log::warn!("Progress for removed item {} was not deleted: {}", item_id, e);
        }
        Ok(removed)
    }

    /// Delete progress records whose item no longer exists.
    /// Returns how many were removed.
    pub fn purge_orphans(&mut self) -> Result<usize> {
        if self.active.is_some() {
            return Err(SessionError::SessionAlreadyActive);
        }

        let items = self.catalog.item_ids()?;
        let mut purged = 0;
        for record in self.store.list()? {
            if !items.contains(&record.item_id) {
                self.store.delete(record.item_id)?;
                purged += 1;
            }
        }
        if purged > 0 {
            log::info!("Purged {} orphaned progress records", purged);
        }
        Ok(purged)
    }

    /// Read, schedule and compare-and-swap, re-reading on conflicts up to
    /// the configured number of attempts
    fn commit_review(&self, item_id: ItemId, grade: Grade, now: DateTime<Utc>) -> Result<ProgressRecord> {
        let max_attempts = self.config.max_commit_attempts.max(1);
        let mut attempt = 1;

        loop {
            let current = self.store.fetch(item_id)?;
            let base = if current.value.is_new() {
                self.engine.initial_record(item_id)
            } else {
                current.value
            };
            let next = self.engine.next_state(&base, grade, now)?;

            match self.store.put(&next, current.revision) {
                Ok(_) => return Ok(next),
                Err(ProgressStoreError::ConcurrentModification { .. }) if attempt < max_attempts => {
                    log::warn!(
                        "Progress for {} changed during review (attempt {} of {}), retrying",
                        item_id,
                        attempt,
                        max_attempts
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
