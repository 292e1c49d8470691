//! Data models for spaced repetition scheduling

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::algorithm::SchedulingError;

/// Stable identity of a vocabulary item
pub type ItemId = Uuid;

/// Ease factor given to an item before its first review
pub const DEFAULT_INITIAL_EASE_FACTOR: f64 = 2.5;

/// Lowest ease factor the scheduler will assign
pub const DEFAULT_MINIMUM_EASE_FACTOR: f64 = 1.3;

/// How well the learner recalled an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grade {
    /// No recall, or recalled incorrectly
    Fail,
    /// Correct with serious difficulty
    Hard,
    /// Correct after some hesitation
    Good,
    /// Perfect recall
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Fail, Grade::Hard, Grade::Good, Grade::Easy];

    pub fn is_pass(self) -> bool {
        !matches!(self, Grade::Fail)
    }

    /// Map an SM-2 quality score (0-5) onto a grade.
    ///
    /// 0-2 are all failed recalls; 3, 4 and 5 are Hard, Good and Easy.
    pub fn from_quality(quality: i32) -> Result<Self, SchedulingError> {
        match quality {
            0..=2 => Ok(Grade::Fail),
            3 => Ok(Grade::Hard),
            4 => Ok(Grade::Good),
            5 => Ok(Grade::Easy),
            _ => Err(SchedulingError::InvalidGrade(quality.to_string())),
        }
    }

    /// Map a UI button rating (1-4: Again, Hard, Good, Easy) onto a grade
    pub fn from_rating(rating: i32) -> Result<Self, SchedulingError> {
        match rating {
            1 => Ok(Grade::Fail),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            _ => Err(SchedulingError::InvalidGrade(rating.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Fail => "fail",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = SchedulingError;

    /// Accepts grade names ("again" is an alias for fail) or a 1-4 rating
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "fail" | "again" => Ok(Grade::Fail),
            "hard" => Ok(Grade::Hard),
            "good" => Ok(Grade::Good),
            "easy" => Ok(Grade::Easy),
            other => match other.parse::<i32>() {
                Ok(rating) => Grade::from_rating(rating),
                Err(_) => Err(SchedulingError::InvalidGrade(trimmed.to_string())),
            },
        }
    }
}

/// Spaced repetition progress for one item.
///
/// `next_review_at` is always `last_reviewed_at + interval_days`; the
/// scheduler writes the two together and stores reject records where they
/// disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub item_id: ItemId,
    /// Consecutive successful reviews since the last failure
    #[serde(default)]
    pub streak: u32,
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Days between `last_reviewed_at` and `next_review_at`
    #[serde(default)]
    pub interval_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_at: Option<DateTime<Utc>>,
    /// Total number of reviews
    #[serde(default)]
    pub review_count: u32,
    /// Number of failed reviews
    #[serde(default)]
    pub lapse_count: u32,
}

fn default_ease_factor() -> f64 {
    DEFAULT_INITIAL_EASE_FACTOR
}

impl ProgressRecord {
    /// Progress for an item that has never been reviewed
    pub fn new(item_id: ItemId) -> Self {
        Self::with_ease_factor(item_id, DEFAULT_INITIAL_EASE_FACTOR)
    }

    pub fn with_ease_factor(item_id: ItemId, ease_factor: f64) -> Self {
        Self {
            item_id,
            streak: 0,
            ease_factor,
            interval_days: 0,
            last_reviewed_at: None,
            next_review_at: None,
            review_count: 0,
            lapse_count: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }

    /// Never-reviewed items are always due
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.map_or(true, |due| due <= now)
    }

    /// Check the structural invariants a persisted record must satisfy.
    /// The ease factor may not sit below `minimum_ease_factor`.
    pub fn validate(&self, minimum_ease_factor: f64) -> Result<(), String> {
        if !self.ease_factor.is_finite() || self.ease_factor < minimum_ease_factor {
            return Err(format!(
                "ease factor {} is below the minimum {}",
                self.ease_factor, minimum_ease_factor
            ));
        }

        match (self.last_reviewed_at, self.next_review_at) {
            (None, None) => {
                if self.streak != 0 || self.interval_days != 0 {
                    return Err("unreviewed record carries a streak or interval".to_string());
                }
            }
            (Some(last), Some(next)) => {
                if self.interval_days == 0 {
                    return Err("reviewed record has a zero interval".to_string());
                }
                let expected = last + Duration::days(i64::from(self.interval_days));
                if next != expected {
                    return Err(format!(
                        "next review {} does not match last review {} + {} days",
                        next, last, self.interval_days
                    ));
                }
            }
            (None, Some(_)) => return Err("next review set without a last review".to_string()),
            (Some(_), None) => return Err("last review set without a next review".to_string()),
        }

        Ok(())
    }
}
