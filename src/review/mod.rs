//! Due-item selection and progress summaries

pub mod selector;

pub use selector::{ProgressSummary, ReviewSelector, MATURE_STREAK};
