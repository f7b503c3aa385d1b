//! Runtime configuration
//!
//! The task file location comes from the environment:
//! - `ASSIGNMENTS_FILE`: full path to the task file
//! - `ASSIGNMENTS_DATA_DIR`: directory holding `tasks.json`
//!
//! With neither set, `tasks.json` in the working directory is used.

use std::path::PathBuf;

use crate::persistence::TaskFile;

pub const FILE_ENV: &str = "ASSIGNMENTS_FILE";
pub const DATA_DIR_ENV: &str = "ASSIGNMENTS_DATA_DIR";
pub const DEFAULT_FILE_NAME: &str = "tasks.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub task_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_file: PathBuf::from(DEFAULT_FILE_NAME),
        }
    }
}

impl Config {
    /// Resolve the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let task_file = non_empty(FILE_ENV)
            .map(PathBuf::from)
            .or_else(|| non_empty(DATA_DIR_ENV).map(|dir| PathBuf::from(dir).join(DEFAULT_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));

        Self { task_file }
    }

    /// Override the task file path
    pub fn with_task_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task_file = path.into();
        self
    }

    pub fn task_file(&self) -> TaskFile {
        TaskFile::new(self.task_file.clone())
    }
}
