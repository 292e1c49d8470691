//! Data models for study sessions

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduling::Grade;

/// Aggregate results of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub reviewed: usize,
    pub passed: usize,
    pub failed: usize,
    /// Snapshot items left ungraded
    pub remaining: usize,
    /// Number of reviewed items at each resulting streak
    pub streak_distribution: BTreeMap<u32, usize>,
}

/// One graded item within a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ReviewOutcome {
    pub grade: Grade,
    pub streak: u32,
}

/// Receives statistics for every finished session
pub trait AnalyticsSink: Send {
    fn record_session(&mut self, stats: &SessionStats);
}

/// Analytics sink that writes a log line per session
#[derive(Debug, Default)]
pub struct LogAnalytics;

impl AnalyticsSink for LogAnalytics {
    fn record_session(&mut self, stats: &SessionStats) {
        log::info!(
            "Session {} finished: {} reviewed ({} passed, {} failed), {} left",
            stats.session_id,
            stats.reviewed,
            stats.passed,
            stats.failed,
            stats.remaining
        );
    }
}

/// Fixed-capacity record of recent sessions; the oldest entry is dropped
/// once the buffer is full.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    entries: VecDeque<SessionStats>,
    capacity: usize,
}

impl SessionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, stats: SessionStats) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(stats);
    }

    pub fn latest(&self) -> Option<&SessionStats> {
        self.entries.back()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &SessionStats> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stats(reviewed: usize) -> SessionStats {
        let at = Utc.with_ymd_and_hms(2026, 8, 1, 20, 0, 0).unwrap();
        SessionStats {
            session_id: Uuid::new_v4(),
            started_at: at,
            ended_at: at,
            reviewed,
            passed: reviewed,
            failed: 0,
            remaining: 0,
            streak_distribution: BTreeMap::new(),
        }
    }

    #[test]
    fn test_history_drops_oldest() {
        let mut history = SessionHistory::new(3);
        for n in 0..5 {
            history.push(stats(n));
        }

        assert_eq!(history.len(), 3);
        let reviewed: Vec<usize> = history.iter().map(|s| s.reviewed).collect();
        assert_eq!(reviewed, vec![2, 3, 4]);
        assert_eq!(history.latest().unwrap().reviewed, 4);
    }

    #[test]
    fn test_zero_capacity_history_keeps_nothing() {
        let mut history = SessionHistory::new(0);
        history.push(stats(1));
        assert!(history.is_empty());
    }

    #[test]
    fn test_stats_json_shape() {
        let mut s = stats(2);
        s.streak_distribution.insert(1, 2);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["reviewed"], 2);
        assert_eq!(json["streakDistribution"]["1"], 2);
        assert!(json.get("sessionId").is_some());
    }
}
