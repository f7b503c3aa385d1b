//! Core library for the assignment tracker
//!
//! This crate contains the parts of the tracker with real invariants:
//! - Due-date parsing and urgency classification
//! - The in-memory task store (identity, lifecycle, queries)
//! - JSON persistence with legacy schema normalization

pub mod config;
pub mod date;
pub mod error;
pub mod persistence;
pub mod task;

pub use config::Config;
pub use error::Error;
pub use persistence::{FileMetadata, LoadIssue, LoadOutcome, LoadReport, TaskFile};
pub use task::{NewTask, Task, TaskEdit, TaskStats, TaskStore};

pub type Result<T> = std::result::Result<T, Error>;
