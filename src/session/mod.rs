//! Study sessions
//!
//! This module provides:
//! - The session coordinator (snapshot, grade, commit, report)
//! - Session statistics and the analytics hook
//! - A bounded history of recent sessions

pub mod coordinator;
pub mod models;

pub use coordinator::{SessionCoordinator, SessionError};
pub use models::{AnalyticsSink, LogAnalytics, SessionHistory, SessionStats};
