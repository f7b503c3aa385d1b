//! Task model definitions

use std::collections::BTreeMap;

/// Largest id the store will hand out or accept from a file
pub const MAX_TASK_ID: u32 = u32::MAX - 1;

/// Display code for a task id, `T-0007` for id 7
pub fn code_for(id: u32) -> String {
    format!("T-{:04}", id)
}

/// A tracked assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u32,
    /// Always derived from `id`; see [`code_for`]
    pub code: String,
    pub subject: String,
    pub description: String,
    /// `DD/MM/YYYY` or empty
    pub start_date: String,
    /// `DD/MM/YYYY`; may be empty for records recovered from old files
    pub due_date: String,
    pub completed: bool,
    pub notes: String,
}

impl Task {
    /// Days from today until the due date, `None` if it does not parse
    pub fn days_remaining(&self) -> Option<i64> {
        crate::date::days_until(&self.due_date)
    }

    /// Urgency text for the due date, empty if it does not parse
    pub fn urgency_label(&self) -> String {
        crate::date::urgency_label(self.days_remaining())
    }

    pub(crate) fn sync_code(&mut self) {
        self.code = code_for(self.id);
    }
}

/// Input for [`TaskStore::add`](super::TaskStore::add)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub subject: String,
    pub description: String,
    pub due_date: String,
    pub start_date: String,
    pub completed: bool,
    pub notes: String,
}

impl NewTask {
    /// Create a pending task with no start date and no notes
    pub fn new(
        subject: impl Into<String>,
        description: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            description: description.into(),
            due_date: due_date.into(),
            ..Self::default()
        }
    }

    /// Set the start date
    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = start_date.into();
        self
    }

    /// Set the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Set the completion flag
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub(crate) fn into_task(self, id: u32) -> Task {
        Task {
            id,
            code: code_for(id),
            subject: self.subject,
            description: self.description,
            start_date: self.start_date,
            due_date: self.due_date,
            completed: self.completed,
            notes: self.notes,
        }
    }
}

/// Partial update for an existing task; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

impl TaskEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    pub fn due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set completion either way; `false` reopens a completed task
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Completion counters for a group of tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Counts {
    pub(crate) fn record(&mut self, completed: bool) {
        self.total += 1;
        if completed {
            self.completed += 1;
        } else {
            self.pending += 1;
        }
    }
}

/// Aggregate progress over the whole store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// `completed / total * 100`, or `0.0` for an empty store
    pub percent_complete: f64,
    pub by_subject: BTreeMap<String, Counts>,
}
