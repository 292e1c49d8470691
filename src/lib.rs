//! Spaced repetition scheduling for vocabulary flashcards.
//!
//! Data flows one way per review:
//! grade → [`session::SessionCoordinator`] → [`scheduling::SchedulingEngine`]
//! → [`progress::ProgressStore`] → [`review::ReviewSelector`].

pub mod clock;
pub mod config;
pub mod progress;
pub mod review;
pub mod scheduling;
pub mod session;
pub mod vocabulary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RecallConfig;
pub use progress::{FileProgressStore, MemoryProgressStore, ProgressStore, ProgressStoreError};
pub use review::ReviewSelector;
pub use scheduling::{Grade, ItemId, ProgressRecord, SchedulingEngine, SchedulingError};
pub use session::{SessionCoordinator, SessionError, SessionStats};
pub use vocabulary::{VocabularyItem, VocabularyStorage};
