//! Task persistence
//!
//! Loads the task set from a JSON file (normalizing older layouts) and writes
//! it back in the canonical versioned layout.

mod file;
mod schema;

pub use file::{FileMetadata, LoadOutcome, LoadReport, TaskFile};
pub use schema::{LoadIssue, SCHEMA_VERSION};
