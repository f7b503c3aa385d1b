//! On-disk JSON shapes
//!
//! Canonical document written by the current version:
//!
//! ```json
//! {
//!   "version": 1,
//!   "tasks": {
//!     "1": {
//!       "subject": "Math",
//!       "description": "Exercises 1-10",
//!       "startDate": "",
//!       "dueDate": "20/12/2024",
//!       "completed": false,
//!       "code": "T-0001",
//!       "notes": ""
//!     }
//!   }
//! }
//! ```
//!
//! Older files may omit the envelope, store tasks as a list of records that
//! carry their own `id`, or use `dueDateAlt` for the due date.

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::task::{code_for, Task, MAX_TASK_ID};

pub const SCHEMA_VERSION: u32 = 1;

/// Something the loader had to skip or could not make sense of
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadIssue {
    #[error("file is not valid JSON: {message}")]
    Malformed { message: String },

    #[error("unrecognized JSON shape, no tasks loaded")]
    UnrecognizedShape,

    #[error("entry {entry} has no usable id, skipped")]
    MissingId { entry: String },

    #[error("entry {entry} has id {id}, past the largest allowed id, skipped")]
    IdOutOfRange { entry: String, id: String },

    #[error("entry {entry} is not a task record, skipped")]
    NotARecord { entry: String },

    #[error("id {id} appears more than once, keeping the last record")]
    DuplicateId { id: u32 },
}

/// Canonical document written by `save`
#[derive(serde::Serialize)]
pub(crate) struct TaskDocument<'a> {
    version: u32,
    tasks: TasksById<'a>,
}

impl<'a> TaskDocument<'a> {
    pub(crate) fn new(tasks: &'a BTreeMap<u32, Task>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            tasks: TasksById(tasks),
        }
    }
}

/// Serializes as an object keyed by stringified id, in numeric id order
struct TasksById<'a>(&'a BTreeMap<u32, Task>);

impl Serialize for TasksById<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|(id, task)| (id.to_string(), StoredTask::new(*id, task))),
        )
    }
}

/// Field order here is the field order on disk
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask<'a> {
    subject: &'a str,
    description: &'a str,
    start_date: &'a str,
    due_date: &'a str,
    completed: bool,
    code: String,
    notes: &'a str,
}

impl<'a> StoredTask<'a> {
    fn new(id: u32, task: &'a Task) -> Self {
        Self {
            subject: &task.subject,
            description: &task.description,
            start_date: &task.start_date,
            due_date: &task.due_date,
            completed: task.completed,
            code: code_for(id),
            notes: &task.notes,
        }
    }
}

/// Result of pulling tasks out of a parsed document
#[derive(Debug, Default)]
pub(crate) struct Extracted {
    pub tasks: BTreeMap<u32, Task>,
    pub issues: Vec<LoadIssue>,
}

impl Extracted {
    fn insert(&mut self, id: u32, record: &Map<String, Value>) {
        if self.tasks.insert(id, normalize(id, record)).is_some() {
            self.skip(LoadIssue::DuplicateId { id });
        }
    }

    fn place(&mut self, entry: String, id: IdRead, record: &Map<String, Value>) {
        match id {
            IdRead::Usable(id) => self.insert(id, record),
            IdRead::OutOfRange(id) => self.skip(LoadIssue::IdOutOfRange { entry, id }),
            IdRead::Missing => self.skip(LoadIssue::MissingId { entry }),
        }
    }

    fn skip(&mut self, issue: LoadIssue) {
        warn!("{}", issue);
        self.issues.push(issue);
    }
}

/// Pull every recognizable task out of a parsed JSON document
pub(crate) fn extract(document: &Value) -> Extracted {
    let mut out = Extracted::default();

    let source = match document {
        Value::Object(map) => map.get("tasks").unwrap_or(document),
        other => other,
    };

    match source {
        Value::Object(map) => {
            for (key, value) in map {
                let Value::Object(record) = value else {
                    out.skip(LoadIssue::NotARecord { entry: key.clone() });
                    continue;
                };
                // A key that is not an id at all defers to the record's own `id`
                let id = match IdRead::from_text(key) {
                    IdRead::Missing => record_id(record),
                    read => read,
                };
                out.place(key.clone(), id, record);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let entry = format!("#{}", index);
                let Value::Object(record) = value else {
                    out.skip(LoadIssue::NotARecord { entry });
                    continue;
                };
                out.place(entry, record_id(record), record);
            }
        }
        _ => out.skip(LoadIssue::UnrecognizedShape),
    }

    out
}

/// An id read from a mapping key or a record's `id` field
#[derive(Debug, PartialEq, Eq)]
enum IdRead {
    Usable(u32),
    /// Numeric but above [`MAX_TASK_ID`]; keeps the text as written
    OutOfRange(String),
    Missing,
}

impl IdRead {
    fn from_u64(id: u64) -> Self {
        match u32::try_from(id) {
            Ok(0) => IdRead::Missing,
            Ok(id) if id <= MAX_TASK_ID => IdRead::Usable(id),
            _ => IdRead::OutOfRange(id.to_string()),
        }
    }

    fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return IdRead::Missing;
        }
        match text.parse::<u64>() {
            Ok(id) => Self::from_u64(id),
            Err(_) => IdRead::OutOfRange(text.to_string()),
        }
    }

    /// Integers, whole floats such as `3.0`, and digit strings are ids
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => match (n.as_u64(), n.as_f64()) {
                (Some(id), _) => Self::from_u64(id),
                (None, Some(f)) if f.fract() == 0.0 && f >= 1.0 => {
                    if f <= f64::from(MAX_TASK_ID) {
                        IdRead::Usable(f as u32)
                    } else {
                        IdRead::OutOfRange(n.to_string())
                    }
                }
                _ => IdRead::Missing,
            },
            Value::String(s) => Self::from_text(s),
            _ => IdRead::Missing,
        }
    }
}

fn record_id(record: &Map<String, Value>) -> IdRead {
    record.get("id").map_or(IdRead::Missing, IdRead::from_value)
}

/// Map one external record onto the canonical task shape
///
/// Missing fields become empty text (or `false`). `dueDateAlt` only fills in
/// when `dueDate` is missing or empty. The stored `code` is ignored.
pub(crate) fn normalize(id: u32, record: &Map<String, Value>) -> Task {
    let due_date = match text_field(record, "dueDate") {
        due if !due.is_empty() => due,
        _ => text_field(record, "dueDateAlt"),
    };

    Task {
        id,
        code: code_for(id),
        subject: text_field(record, "subject"),
        description: text_field(record, "description"),
        start_date: text_field(record, "startDate"),
        due_date,
        completed: record.get("completed").is_some_and(truthy),
        notes: text_field(record, "notes"),
    }
}

fn text_field(record: &Map<String, Value>, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
