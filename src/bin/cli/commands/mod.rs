pub mod add;
pub mod due;
pub mod grade;
pub mod list;
pub mod remove;
pub mod review;
pub mod stats;
