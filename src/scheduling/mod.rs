//! Spaced repetition scheduling
//!
//! This module provides:
//! - Progress records and review grades
//! - The SM-2 style scheduling engine
//! - Interval previews and formatting

pub mod algorithm;
pub mod models;

pub use algorithm::{
    format_interval, SchedulerParams, SchedulingEngine, SchedulingError, MAX_INTERVAL_DAYS,
};
pub use models::*;
