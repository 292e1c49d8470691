//! Vocabulary items
//!
//! The catalogue of items under study. Scheduling only needs each item's
//! identity and creation order; the text is carried for display.

pub mod models;
pub mod storage;

pub use models::*;
pub use storage::{ItemCatalog, VocabularyError, VocabularyStorage};
