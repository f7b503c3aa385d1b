//! JSON file gateway
//!
//! Reads and writes the whole task set as a single JSON document.

use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::schema::{self, LoadIssue, TaskDocument};
use crate::task::{Task, TaskStore};
use crate::{Error, Result};

/// Tasks recovered from disk, not yet handed to a store
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub tasks: BTreeMap<u32, Task>,
    pub issues: Vec<LoadIssue>,
    /// The file did not exist yet
    pub first_run: bool,
}

/// What [`TaskFile::load_into`] did to the store
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub issues: Vec<LoadIssue>,
    pub first_run: bool,
}

/// Inspection data about the backing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// `"N bytes"` up to 1 KiB, `"x.xx KB"` above
    pub human_size: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub modified: String,
    /// `None` when the file could not be read as text
    pub line_count: Option<usize>,
}

/// Gateway between a [`TaskStore`] and its JSON file
#[derive(Debug, Clone)]
pub struct TaskFile {
    path: PathBuf,
}

impl TaskFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the file and normalize whatever task shape it holds
    ///
    /// A missing file is a first run. Unparseable content yields no tasks and
    /// a [`LoadIssue::Malformed`] diagnostic. Only I/O failures are errors.
    pub fn load(&self) -> Result<LoadOutcome> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No task file at {}, starting empty", self.path.display());
                return Ok(LoadOutcome {
                    first_run: true,
                    ..LoadOutcome::default()
                });
            }
            Err(e) => {
                error!("Failed to read task file {}: {}", self.path.display(), e);
                return Err(e.into());
            }
        };

        let document: serde_json::Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                let issue = LoadIssue::Malformed {
                    message: e.to_string(),
                };
                warn!("{}: {}", self.path.display(), issue);
                return Ok(LoadOutcome {
                    issues: vec![issue],
                    ..LoadOutcome::default()
                });
            }
        };

        let extracted = schema::extract(&document);
        debug!(
            "Loaded {} tasks from {} ({} skipped)",
            extracted.tasks.len(),
            self.path.display(),
            extracted.issues.len()
        );

        Ok(LoadOutcome {
            tasks: extracted.tasks,
            issues: extracted.issues,
            first_run: false,
        })
    }

    /// Load the file and replace the store's contents with it
    ///
    /// On error the store is left as it was.
    pub fn load_into(&self, store: &mut TaskStore) -> Result<LoadReport> {
        let outcome = self.load()?;
        let loaded = outcome.tasks.len();

        store.replace_all(outcome.tasks);
        store.sync_codes_with_ids();

        Ok(LoadReport {
            loaded,
            issues: outcome.issues,
            first_run: outcome.first_run,
        })
    }

    /// Write the store's full contents
    pub fn save(&self, store: &TaskStore) -> Result<()> {
        self.save_tasks(store.tasks())
    }

    /// Write a task map as the canonical versioned document
    ///
    /// The document goes to a sibling temporary file first and is renamed over
    /// the target, so readers never see a partial write.
    pub fn save_tasks(&self, tasks: &BTreeMap<u32, Task>) -> Result<()> {
        let result = self.write_atomic(tasks);
        match &result {
            Ok(()) => debug!("Saved {} tasks to {}", tasks.len(), self.path.display()),
            Err(e) => error!("Failed to save tasks to {}: {}", self.path.display(), e),
        }
        result
    }

    fn write_atomic(&self, tasks: &BTreeMap<u32, Task>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let tmp_path = self.temp_path();
        let write = || -> Result<()> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &TaskDocument::new(tasks))?;
            writer.write_all(b"\n")?;
            let file = writer
                .into_inner()
                .map_err(|e| Error::Storage(format!("Failed to flush task file: {}", e)))?;
            file.sync_all()?;
            Ok(())
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            Error::Storage(format!("Failed to replace task file: {}", e))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tasks.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Size, modification time and line count of the file, if it exists
    pub fn metadata(&self) -> Result<Option<FileMetadata>> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let size_bytes = meta.len();
        let modified = meta
            .modified()
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let line_count = fs::read_to_string(&self.path)
            .ok()
            .map(|content| content.lines().count());

        Ok(Some(FileMetadata {
            path: self.path.clone(),
            size_bytes,
            human_size: human_size(size_bytes),
            modified,
            line_count,
        }))
    }

    /// Copy the file to `<stem>_backup_<YYYYmmdd_HHMMSS>.<ext>` beside it
    ///
    /// Returns `None` when there is nothing to back up.
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        if !self.exists() {
            warn!("No task file at {} to back up", self.path.display());
            return Ok(None);
        }

        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("tasks");
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("json");
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let target = self
            .path
            .with_file_name(format!("{}_backup_{}.{}", stem, stamp, ext));

        fs::copy(&self.path, &target).map_err(|e| {
            error!("Failed to back up {}: {}", self.path.display(), e);
            Error::Storage(format!("Failed to create backup: {}", e))
        })?;
        info!("Backup created: {}", target.display());
        Ok(Some(target))
    }
}

fn human_size(size_bytes: u64) -> String {
    if size_bytes > 1024 {
        format!("{:.2} KB", size_bytes as f64 / 1024.0)
    } else {
        format!("{} bytes", size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use tempfile::TempDir;

    fn create_test_file() -> (TaskFile, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let file = TaskFile::new(temp_dir.path().join("tasks.json"));
        (file, temp_dir)
    }

    #[test]
    fn test_load_missing_file_is_first_run() {
        let (file, _temp) = create_test_file();

        assert!(!file.exists());
        let outcome = file.load().unwrap();
        assert!(outcome.first_run);
        assert!(outcome.tasks.is_empty());
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_load_malformed_file() {
        let (file, _temp) = create_test_file();
        fs::write(file.path(), "{ not json").unwrap();

        let outcome = file.load().unwrap();
        assert!(!outcome.first_run);
        assert!(outcome.tasks.is_empty());
        assert!(matches!(outcome.issues[..], [LoadIssue::Malformed { .. }]));
    }

    #[test]
    fn test_save_then_load_into() {
        let (file, _temp) = create_test_file();

        let mut store = TaskStore::new();
        store.add(NewTask::new("Math", "Exercises", "20/12/2024").with_notes("p. 42")).unwrap();
        store.add(NewTask::new("Art", "Sketch", "21/12/2024")).unwrap();
        store.mark_completed(2);
        file.save(&store).unwrap();

        let mut reloaded = TaskStore::new();
        let report = file.load_into(&mut reloaded).unwrap();
        assert_eq!(report.loaded, 2);
        assert!(!report.first_run);
        assert!(report.issues.is_empty());
        assert_eq!(reloaded.tasks(), store.tasks());
        assert_eq!(reloaded.next_id(), 3);
    }

    #[test]
    fn test_save_writes_versioned_document() {
        let (file, _temp) = create_test_file();
        let mut store = TaskStore::new();
        store.add(NewTask::new("Math", "Exercises", "20/12/2024")).unwrap();
        file.save(&store).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["tasks"]["1"]["code"], "T-0001");
        assert_eq!(value["tasks"]["1"]["dueDate"], "20/12/2024");
        assert_eq!(value["tasks"]["1"]["completed"], false);

        // No temporary file left behind
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let file = TaskFile::new(temp_dir.path().join("nested").join("tasks.json"));

        file.save(&TaskStore::new()).unwrap();
        assert!(file.exists());
    }

    #[test]
    fn test_save_failure_leaves_store_usable() {
        let temp_dir = TempDir::new().unwrap();
        // The target path is a directory, so the rename cannot succeed
        let target = temp_dir.path().join("tasks.json");
        fs::create_dir_all(target.join("occupied")).unwrap();
        let file = TaskFile::new(&target);

        let mut store = TaskStore::new();
        store.add(NewTask::new("Math", "Exercises", "20/12/2024")).unwrap();
        assert!(file.save(&store).is_err());
        assert_eq!(store.len(), 1);
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn test_load_into_keeps_store_on_error() {
        let temp_dir = TempDir::new().unwrap();
        // Reading a directory as a file is an I/O error
        let file = TaskFile::new(temp_dir.path());

        let mut store = TaskStore::new();
        store.add(NewTask::new("Math", "Exercises", "20/12/2024")).unwrap();
        assert!(file.load_into(&mut store).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_metadata() {
        let (file, _temp) = create_test_file();
        assert!(file.metadata().unwrap().is_none());

        let mut store = TaskStore::new();
        store.add(NewTask::new("Math", "Exercises", "20/12/2024")).unwrap();
        file.save(&store).unwrap();

        let meta = file.metadata().unwrap().unwrap();
        let content = fs::read_to_string(file.path()).unwrap();
        assert_eq!(meta.path, file.path());
        assert_eq!(meta.size_bytes, content.len() as u64);
        assert_eq!(meta.human_size, format!("{} bytes", content.len()));
        assert_eq!(meta.line_count, Some(content.lines().count()));
        assert_eq!(meta.modified.len(), "2024-12-20 10:00:00".len());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 bytes");
        assert_eq!(human_size(1024), "1024 bytes");
        assert_eq!(human_size(2048), "2.00 KB");
        assert_eq!(human_size(1536), "1.50 KB");
    }

    #[test]
    fn test_backup() {
        let (file, temp) = create_test_file();
        assert!(file.backup().unwrap().is_none());

        file.save(&TaskStore::new()).unwrap();
        let backup = file.backup().unwrap().unwrap();

        assert_eq!(backup.parent(), Some(temp.path()));
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("tasks_backup_"));
        assert!(name.ends_with(".json"));
        assert_eq!(
            fs::read_to_string(&backup).unwrap(),
            fs::read_to_string(file.path()).unwrap()
        );
    }
}
