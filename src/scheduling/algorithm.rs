//! SM-2 style scheduling
//!
//! A successful review grows the interval: 1 day, then 6 days, then the
//! previous interval multiplied by the ease factor. A failed review resets the
//! streak and brings the item back the next day. The ease factor drifts with
//! the grade and never drops below the configured minimum.
//!
//! Everything here is pure: the caller supplies `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::models::{
    Grade, ItemId, ProgressRecord, DEFAULT_INITIAL_EASE_FACTOR, DEFAULT_MINIMUM_EASE_FACTOR,
};

/// Upper bound on a single interval (100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Invalid grade: {0}")]
    InvalidGrade(String),

    #[error("Review of {item_id} at {now} precedes its last review at {last_reviewed_at}")]
    ClockRegression {
        item_id: ItemId,
        last_reviewed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Invalid scheduler parameters: {0}")]
    InvalidParams(String),
}

/// Tunable constants of the scheduling algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerParams {
    pub initial_ease_factor: f64,
    pub minimum_ease_factor: f64,
    /// Subtracted from the ease factor on Fail
    pub fail_penalty: f64,
    /// Subtracted from the ease factor on Hard
    pub hard_penalty: f64,
    /// Added to the ease factor on Easy
    pub easy_bonus: f64,
    /// Interval after the first success, and after any failure
    pub first_interval_days: u32,
    /// Interval after the second consecutive success
    pub second_interval_days: u32,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            initial_ease_factor: DEFAULT_INITIAL_EASE_FACTOR,
            minimum_ease_factor: DEFAULT_MINIMUM_EASE_FACTOR,
            fail_penalty: 0.2,
            hard_penalty: 0.15,
            easy_bonus: 0.15,
            first_interval_days: 1,
            second_interval_days: 6,
        }
    }
}

impl SchedulerParams {
    pub fn validate(&self) -> Result<(), SchedulingError> {
        let finite_non_negative = |name: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(SchedulingError::InvalidParams(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )))
            }
        };

        finite_non_negative("fail_penalty", self.fail_penalty)?;
        finite_non_negative("hard_penalty", self.hard_penalty)?;
        finite_non_negative("easy_bonus", self.easy_bonus)?;

        if !self.minimum_ease_factor.is_finite() || self.minimum_ease_factor < 1.0 {
            return Err(SchedulingError::InvalidParams(format!(
                "minimum_ease_factor must be at least 1.0, got {}",
                self.minimum_ease_factor
            )));
        }
        if !self.initial_ease_factor.is_finite()
            || self.initial_ease_factor < self.minimum_ease_factor
        {
            return Err(SchedulingError::InvalidParams(format!(
                "initial_ease_factor {} is below minimum_ease_factor {}",
                self.initial_ease_factor, self.minimum_ease_factor
            )));
        }
        if self.first_interval_days == 0 {
            return Err(SchedulingError::InvalidParams(
                "first_interval_days must be at least 1".to_string(),
            ));
        }
        if self.second_interval_days <= self.first_interval_days {
            return Err(SchedulingError::InvalidParams(format!(
                "second_interval_days {} must exceed first_interval_days {}",
                self.second_interval_days, self.first_interval_days
            )));
        }
        Ok(())
    }
}

/// Streak, ease and interval chosen for one grade
#[derive(Debug, Clone, Copy, PartialEq)]
struct Schedule {
    streak: u32,
    ease_factor: f64,
    interval_days: u32,
}

/// Computes the next progress state from a review.
#[derive(Debug, Clone, Default)]
pub struct SchedulingEngine {
    params: SchedulerParams,
}

impl SchedulingEngine {
    pub fn new(params: SchedulerParams) -> Result<Self, SchedulingError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// Progress for an item that has never been reviewed
    pub fn initial_record(&self, item_id: ItemId) -> ProgressRecord {
        ProgressRecord::with_ease_factor(item_id, self.params.initial_ease_factor)
    }

    /// Apply a review graded at `now` and return the resulting record.
    ///
    /// The input record is left untouched; committing the result is the
    /// caller's job.
    pub fn next_state(
        &self,
        record: &ProgressRecord,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, SchedulingError> {
        if let Some(last_reviewed_at) = record.last_reviewed_at {
            if now < last_reviewed_at {
                return Err(SchedulingError::ClockRegression {
                    item_id: record.item_id,
                    last_reviewed_at,
                    now,
                });
            }
        }

        let schedule = self.schedule(record, grade);

        let mut next = record.clone();
        next.streak = schedule.streak;
        next.ease_factor = schedule.ease_factor;
        next.interval_days = schedule.interval_days;
        next.last_reviewed_at = Some(now);
        next.next_review_at = Some(now + Duration::days(i64::from(schedule.interval_days)));
        next.review_count = record.review_count.saturating_add(1);
        if !grade.is_pass() {
            next.lapse_count = record.lapse_count.saturating_add(1);
        }

        log::debug!(
            "Scheduled {} after {} review: streak {} -> {}, interval {}d -> {}d, ease {:.2} -> {:.2}",
            record.item_id,
            grade,
            record.streak,
            next.streak,
            record.interval_days,
            next.interval_days,
            record.ease_factor,
            next.ease_factor
        );

        Ok(next)
    }

    /// Interval each grade would produce, in the order Fail, Hard, Good, Easy.
    /// Used to label the grading buttons.
    pub fn preview_intervals(&self, record: &ProgressRecord) -> [u32; 4] {
        Grade::ALL.map(|grade| self.schedule(record, grade).interval_days)
    }

    fn schedule(&self, record: &ProgressRecord, grade: Grade) -> Schedule {
        let p = &self.params;

        if !grade.is_pass() {
            return Schedule {
                streak: 0,
                ease_factor: (record.ease_factor - p.fail_penalty).max(p.minimum_ease_factor),
                interval_days: p.first_interval_days,
            };
        }

        let streak = record.streak.saturating_add(1);
        let interval_days = match streak {
            1 => p.first_interval_days,
            2 => p.second_interval_days,
            _ => {
                // Growth uses the ease factor from before this review
                let grown = (f64::from(record.interval_days) * record.ease_factor).round();
                let grown = if grown >= f64::from(MAX_INTERVAL_DAYS) {
                    MAX_INTERVAL_DAYS
                } else {
                    grown as u32
                };
                grown
                    .max(record.interval_days.saturating_add(1))
                    .min(MAX_INTERVAL_DAYS)
            }
        };

        let ease_factor = match grade {
            Grade::Hard => (record.ease_factor - p.hard_penalty).max(p.minimum_ease_factor),
            Grade::Easy => record.ease_factor + p.easy_bonus,
            _ => record.ease_factor,
        };

        Schedule {
            streak,
            ease_factor,
            interval_days,
        }
    }
}

/// Format an interval in days as a compact label
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 30, 0).unwrap()
    }

    fn engine() -> SchedulingEngine {
        SchedulingEngine::default()
    }

    fn reviewed(streak: u32, interval_days: u32, ease_factor: f64) -> ProgressRecord {
        let last = t0() - Duration::days(i64::from(interval_days));
        ProgressRecord {
            item_id: Uuid::new_v4(),
            streak,
            ease_factor,
            interval_days,
            last_reviewed_at: Some(last),
            next_review_at: Some(last + Duration::days(i64::from(interval_days))),
            review_count: streak,
            lapse_count: 0,
        }
    }

    #[test]
    fn test_three_review_scenario() {
        let engine = engine();
        let record = engine.initial_record(Uuid::new_v4());

        let first = engine.next_state(&record, Grade::Good, t0()).unwrap();
        assert_eq!(first.streak, 1);
        assert_eq!(first.interval_days, 1);
        assert_eq!(first.next_review_at, Some(t0() + Duration::days(1)));

        let second = engine
            .next_state(&first, Grade::Good, t0() + Duration::days(1))
            .unwrap();
        assert_eq!(second.streak, 2);
        assert_eq!(second.interval_days, 6);
        assert_eq!(second.next_review_at, Some(t0() + Duration::days(7)));

        let third = engine
            .next_state(&second, Grade::Fail, t0() + Duration::days(7))
            .unwrap();
        assert_eq!(third.streak, 0);
        assert_eq!(third.interval_days, 1);
        assert!((third.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(third.review_count, 3);
        assert_eq!(third.lapse_count, 1);
    }

    #[test]
    fn test_subsequent_review_multiplies_interval() {
        let record = reviewed(3, 10, 2.5);
        let next = engine().next_state(&record, Grade::Good, t0()).unwrap();

        // 10 * 2.5 = 25
        assert_eq!(next.interval_days, 25);
        assert_eq!(next.streak, 4);
        assert_eq!(next.ease_factor, 2.5);
    }

    #[test]
    fn test_interval_always_moves_forward() {
        // 1 * 1.3 rounds back to 1; the floor pushes it to 2
        let record = reviewed(5, 1, 1.3);
        let next = engine().next_state(&record, Grade::Hard, t0()).unwrap();
        assert_eq!(next.interval_days, 2);
    }

    #[test]
    fn test_ease_adjustments() {
        let record = reviewed(3, 10, 2.0);
        let engine = engine();

        let hard = engine.next_state(&record, Grade::Hard, t0()).unwrap();
        assert!((hard.ease_factor - 1.85).abs() < 1e-9);

        let good = engine.next_state(&record, Grade::Good, t0()).unwrap();
        assert_eq!(good.ease_factor, 2.0);

        let easy = engine.next_state(&record, Grade::Easy, t0()).unwrap();
        assert!((easy.ease_factor - 2.15).abs() < 1e-9);
    }

    #[test]
    fn test_ease_factor_minimum() {
        let engine = engine();
        let mut record = reviewed(4, 12, 1.4);

        for _ in 0..5 {
            record = engine.next_state(&record, Grade::Fail, t0()).unwrap();
            assert!(record.ease_factor >= 1.3);
        }
        assert_eq!(record.ease_factor, 1.3);

        let hard = engine.next_state(&reviewed(3, 5, 1.35), Grade::Hard, t0()).unwrap();
        assert_eq!(hard.ease_factor, 1.3);
    }

    #[test]
    fn test_fail_always_resets() {
        let engine = engine();
        for (streak, interval) in [(0, 0), (1, 1), (2, 6), (9, 400)] {
            let mut record = reviewed(streak.max(1), interval.max(1), 2.7);
            record.streak = streak;
            let next = engine.next_state(&record, Grade::Fail, t0()).unwrap();
            assert_eq!(next.streak, 0);
            assert_eq!(next.interval_days, 1);
        }
    }

    #[test]
    fn test_next_review_strictly_increases() {
        let engine = engine();
        let mut record = engine.initial_record(Uuid::new_v4());
        let mut now = t0();
        let mut previous_due = None;

        for grade in [Grade::Hard, Grade::Good, Grade::Hard, Grade::Easy, Grade::Hard, Grade::Good] {
            record = engine.next_state(&record, grade, now).unwrap();
            let due = record.next_review_at.unwrap();
            if let Some(prev) = previous_due {
                assert!(due > prev);
            }
            assert!(due > now);
            previous_due = Some(due);
            now = now + Duration::hours(1);
        }
    }

    #[test]
    fn test_result_satisfies_record_invariants() {
        let engine = engine();
        let record = engine.initial_record(Uuid::new_v4());
        let next = engine.next_state(&record, Grade::Easy, t0()).unwrap();
        assert!(next.validate(engine.params().minimum_ease_factor).is_ok());
        assert_eq!(next.last_reviewed_at, Some(t0()));
    }

    #[test]
    fn test_clock_regression_rejected() {
        let record = reviewed(2, 6, 2.5);
        let before = record.last_reviewed_at.unwrap() - Duration::seconds(1);

        let err = engine().next_state(&record, Grade::Good, before).unwrap_err();
        assert!(matches!(err, SchedulingError::ClockRegression { .. }));
    }

    #[test]
    fn test_same_instant_is_not_regression() {
        let record = reviewed(2, 6, 2.5);
        let at = record.last_reviewed_at.unwrap();
        assert!(engine().next_state(&record, Grade::Good, at).is_ok());
    }

    #[test]
    fn test_interval_is_capped() {
        let record = reviewed(30, MAX_INTERVAL_DAYS - 1, 3.0);
        let next = engine().next_state(&record, Grade::Easy, t0()).unwrap();
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_preview_intervals() {
        let engine = engine();
        assert_eq!(engine.preview_intervals(&engine.initial_record(Uuid::new_v4())), [1, 1, 1, 1]);
        assert_eq!(engine.preview_intervals(&reviewed(1, 1, 2.5)), [1, 6, 6, 6]);
        assert_eq!(engine.preview_intervals(&reviewed(2, 6, 2.5)), [1, 15, 15, 15]);
    }

    #[test]
    fn test_custom_params() {
        let params = SchedulerParams {
            first_interval_days: 2,
            second_interval_days: 4,
            easy_bonus: 0.3,
            ..SchedulerParams::default()
        };
        let engine = SchedulingEngine::new(params).unwrap();
        let first = engine
            .next_state(&engine.initial_record(Uuid::new_v4()), Grade::Easy, t0())
            .unwrap();
        assert_eq!(first.interval_days, 2);
        assert!((first.ease_factor - 2.8).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = [
            SchedulerParams { minimum_ease_factor: 0.5, ..Default::default() },
            SchedulerParams { initial_ease_factor: 1.1, ..Default::default() },
            SchedulerParams { first_interval_days: 0, ..Default::default() },
            SchedulerParams { second_interval_days: 1, ..Default::default() },
            SchedulerParams { hard_penalty: -0.1, ..Default::default() },
            SchedulerParams { easy_bonus: f64::INFINITY, ..Default::default() },
        ];
        for params in bad {
            assert!(matches!(
                SchedulingEngine::new(params),
                Err(SchedulingError::InvalidParams(_))
            ));
        }
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(365), "1y");
        assert_eq!(format_interval(730), "2y");
    }
}
