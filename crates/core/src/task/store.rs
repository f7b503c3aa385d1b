//! In-memory task store
//!
//! Owns the id → task mapping and the autoincrement counter. Lookups by id
//! report absence through `Option`/`bool`; nothing here touches the disk.

use std::collections::BTreeMap;

use super::model::{code_for, Counts, NewTask, Task, TaskEdit, TaskStats, MAX_TASK_ID};
use crate::date;
use crate::{Error, Result};

/// Keyed task store with monotonically assigned ids
#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: BTreeMap<u32, Task>,
    next_id: u32,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create an empty store; the first task gets id 1
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a store from already-keyed tasks
    pub fn from_tasks(tasks: BTreeMap<u32, Task>) -> Self {
        let mut store = Self::new();
        store.replace_all(tasks);
        store.sync_codes_with_ids();
        store
    }

    /// Insert a new task and return its id
    ///
    /// Dates are stored as given; validating them is up to the caller. Fails
    /// only once every id up to [`MAX_TASK_ID`] has been handed out.
    pub fn add(&mut self, new: NewTask) -> Result<u32> {
        let id = self.next_id;
        if id == 0 || id > MAX_TASK_ID || self.tasks.contains_key(&id) {
            return Err(Error::IdsExhausted);
        }
        self.tasks.insert(id, new.into_task(id));
        self.next_id = id.saturating_add(1);
        Ok(id)
    }

    /// Get a task by ID
    pub fn get(&self, id: u32) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Mark a task completed; false if the id is unknown
    pub fn mark_completed(&mut self, id: u32) -> bool {
        match self.tasks.get_mut(&id) {
            Some(task) => {
                task.completed = true;
                true
            }
            None => false,
        }
    }

    /// Apply a partial edit
    ///
    /// Returns `Ok(false)` when the id is unknown. Empty subject or
    /// description, or a due date earlier than the start date, are rejected
    /// without touching the stored task.
    pub fn edit(&mut self, id: u32, edit: TaskEdit) -> Result<bool> {
        let Some(current) = self.tasks.get(&id) else {
            return Ok(false);
        };

        let mut updated = current.clone();
        if let Some(subject) = edit.subject {
            if subject.trim().is_empty() {
                return Err(Error::InvalidInput("subject cannot be empty".into()));
            }
            updated.subject = subject;
        }
        if let Some(description) = edit.description {
            if description.trim().is_empty() {
                return Err(Error::InvalidInput("description cannot be empty".into()));
            }
            updated.description = description;
        }
        if let Some(start_date) = edit.start_date {
            updated.start_date = start_date;
        }
        if let Some(due_date) = edit.due_date {
            updated.due_date = due_date;
        }
        if let Some(notes) = edit.notes {
            updated.notes = notes;
        }
        if let Some(completed) = edit.completed {
            updated.completed = completed;
        }

        if let (Some(start), Some(due)) = (
            date::parse(&updated.start_date),
            date::parse(&updated.due_date),
        ) {
            if due < start {
                return Err(Error::InvalidInput(format!(
                    "due date {} is before start date {}",
                    updated.due_date, updated.start_date
                )));
            }
        }

        self.tasks.insert(id, updated);
        Ok(true)
    }

    /// Remove a task; ids are never handed out again
    pub fn delete(&mut self, id: u32) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Swap in a whole new mapping and recompute the next id
    ///
    /// Codes are left as given; call [`sync_codes_with_ids`](Self::sync_codes_with_ids)
    /// afterwards when the tasks come from outside.
    pub fn replace_all(&mut self, tasks: BTreeMap<u32, Task>) {
        self.next_id = tasks
            .keys()
            .next_back()
            .map_or(1, |max| max.saturating_add(1));
        self.tasks = tasks;
    }

    /// Delete every task; numbering restarts at 1
    pub fn clear(&mut self) {
        self.replace_all(BTreeMap::new());
    }

    /// Rewrite every task's id and code from its key
    pub fn sync_codes_with_ids(&mut self) {
        for (id, task) in self.tasks.iter_mut() {
            task.id = *id;
            task.sync_code();
        }
    }

    /// The id the next [`add`](Self::add) will assign
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Bulk read of the backing map, ordered by id
    pub fn tasks(&self) -> &BTreeMap<u32, Task> {
        &self.tasks
    }

    /// All tasks, ordered by id
    pub fn list_all(&self) -> Vec<&Task> {
        self.tasks.values().collect()
    }

    /// Tasks not yet completed, ordered by id
    pub fn list_pending(&self) -> Vec<&Task> {
        self.tasks.values().filter(|t| !t.completed).collect()
    }

    /// Completed tasks, ordered by id
    pub fn list_completed(&self) -> Vec<&Task> {
        self.tasks.values().filter(|t| t.completed).collect()
    }

    /// Tasks whose subject matches `name` ignoring case
    pub fn list_by_subject(&self, name: &str) -> Vec<&Task> {
        let wanted = name.to_lowercase();
        self.tasks
            .values()
            .filter(|t| t.subject.to_lowercase() == wanted)
            .collect()
    }

    /// Tasks matching `query` by id or code, or containing it in the subject
    /// or description ignoring case
    ///
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Task> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        let by_id = query.parse::<u32>().ok();

        self.tasks
            .values()
            .filter(|t| {
                by_id == Some(t.id)
                    || code_for(t.id).eq_ignore_ascii_case(query)
                    || t.subject.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Tasks ordered by due date, earliest first
    ///
    /// Unparseable due dates sort last; ties keep id order.
    pub fn sorted_by_due_date(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|t| (date::parse(&t.due_date).unwrap_or_else(date::far_future), t.id));
        tasks
    }

    /// Distinct subjects in use, sorted
    pub fn subjects(&self) -> Vec<&str> {
        let mut subjects: Vec<&str> = self.tasks.values().map(|t| t.subject.as_str()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        subjects
    }

    /// Overall and per-subject completion counters
    pub fn stats(&self) -> TaskStats {
        let mut overall = Counts::default();
        let mut by_subject: BTreeMap<String, Counts> = BTreeMap::new();

        for task in self.tasks.values() {
            overall.record(task.completed);
            by_subject
                .entry(task.subject.clone())
                .or_default()
                .record(task.completed);
        }

        let percent_complete = if overall.total > 0 {
            overall.completed as f64 / overall.total as f64 * 100.0
        } else {
            0.0
        };

        TaskStats {
            total: overall.total,
            completed: overall.completed,
            pending: overall.pending,
            percent_complete,
            by_subject,
        }
    }
}
