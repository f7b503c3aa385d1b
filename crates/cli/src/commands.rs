//! Subcommands and their effect on the store

use std::collections::HashMap;
use std::io::Write;

use anyhow::{bail, ensure, Context};
use clap::Subcommand;

use assignments_core::{date, task::code_for, NewTask, Task, TaskEdit, TaskFile, TaskStore};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tasks
    List {
        /// Only tasks not yet completed
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        /// Only completed tasks
        #[arg(long)]
        completed: bool,
        /// Only tasks for this subject (case-insensitive)
        #[arg(long)]
        subject: Option<String>,
        /// Order by due date instead of id
        #[arg(long)]
        by_due: bool,
    },
    /// Show one task in full
    Show {
        /// Task id or code (`7` or `T-0007`)
        #[arg(value_parser = parse_task_ref)]
        id: u32,
    },
    /// Add a task
    Add {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        description: String,
        /// Due date, DD/MM/YYYY
        #[arg(long)]
        due: String,
        /// Start date, DD/MM/YYYY
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change fields of a task
    Edit {
        #[arg(value_parser = parse_task_ref)]
        id: u32,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Start date, DD/MM/YYYY; an empty value clears it
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Mark the task completed
        #[arg(long, conflicts_with = "pending")]
        completed: bool,
        /// Reopen a completed task
        #[arg(long)]
        pending: bool,
    },
    /// Find tasks by id, code, or text in the subject or description
    Search {
        query: String,
    },
    /// Mark a task completed
    Complete {
        #[arg(value_parser = parse_task_ref)]
        id: u32,
    },
    /// Delete a task
    Delete {
        #[arg(value_parser = parse_task_ref)]
        id: u32,
    },
    /// Delete every task
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Completion statistics
    Stats,
    /// Copy the task file to a timestamped backup
    Backup,
    /// Show information about the task file
    Info,
}

/// Accept `7`, `0007` or `T-0007`
fn parse_task_ref(raw: &str) -> Result<u32, String> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("T-")
        .or_else(|| trimmed.strip_prefix("t-"))
        .unwrap_or(trimmed);
    digits
        .parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("'{}' is not a task id or code", raw))
}

fn check_date(label: &str, value: &str) -> anyhow::Result<()> {
    ensure!(
        date::validate(value),
        "{} '{}' is not a valid DD/MM/YYYY date",
        label,
        value
    );
    Ok(())
}

fn not_found(id: u32) -> anyhow::Error {
    anyhow::anyhow!("no task {}", code_for(id))
}

fn summary_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    let urgency = if task.completed {
        String::new()
    } else {
        task.urgency_label()
    };
    format!(
        "{} [{}] {}: {}  due {} {}",
        task.code,
        mark,
        task.subject,
        task.description,
        if task.due_date.is_empty() { "-" } else { task.due_date.as_str() },
        urgency
    )
    .trim_end()
    .to_string()
}

/// Run one command; returns true when the store changed and must be saved
pub fn execute(
    command: Command,
    store: &mut TaskStore,
    file: &TaskFile,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    match command {
        Command::List {
            pending,
            completed,
            subject,
            by_due,
        } => {
            let mut tasks = match (&subject, pending, completed) {
                (Some(subject), _, _) => store.list_by_subject(subject),
                (None, true, _) => store.list_pending(),
                (None, _, true) => store.list_completed(),
                _ => store.list_all(),
            };
            tasks.retain(|t| !(pending && t.completed) && !(completed && !t.completed));
            if by_due {
                let rank: HashMap<u32, usize> = store
                    .sorted_by_due_date()
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (t.id, i))
                    .collect();
                tasks.sort_by_key(|t| rank.get(&t.id).copied());
            }

            if tasks.is_empty() {
                writeln!(out, "No tasks.")?;
            }
            for task in tasks {
                writeln!(out, "{}", summary_line(task))?;
            }
            Ok(false)
        }
        Command::Show { id } => {
            let task = store.get(id).ok_or_else(|| not_found(id))?;
            writeln!(out, "Code:        {}", task.code)?;
            writeln!(out, "Subject:     {}", task.subject)?;
            writeln!(out, "Description: {}", task.description)?;
            writeln!(out, "Start date:  {}", task.start_date)?;
            writeln!(out, "Due date:    {} {}", task.due_date, task.urgency_label())?;
            writeln!(
                out,
                "Status:      {}",
                if task.completed { "completed" } else { "pending" }
            )?;
            if !task.notes.is_empty() {
                writeln!(out, "Notes:       {}", task.notes)?;
            }
            Ok(false)
        }
        Command::Add {
            subject,
            description,
            due,
            start,
            notes,
        } => {
            ensure!(!subject.trim().is_empty(), "subject cannot be empty");
            ensure!(!description.trim().is_empty(), "description cannot be empty");
            check_date("due date", &due)?;
            if let Some(start) = &start {
                check_date("start date", start)?;
                if date::parse(&due) < date::parse(start) {
                    bail!("due date {} is before start date {}", due, start);
                }
            }

            let mut new = NewTask::new(subject, description, due);
            if let Some(start) = start {
                new = new.with_start_date(start);
            }
            if let Some(notes) = notes {
                new = new.with_notes(notes);
            }
            let id = store.add(new)?;
            writeln!(out, "Added {}", code_for(id))?;
            Ok(true)
        }
        Command::Edit {
            id,
            subject,
            description,
            start,
            due,
            notes,
            completed,
            pending,
        } => {
            let mut edit = TaskEdit::new();
            if let Some(subject) = subject {
                edit = edit.subject(subject);
            }
            if let Some(description) = description {
                edit = edit.description(description);
            }
            if let Some(start) = start {
                if start.trim().is_empty() {
                    edit = edit.start_date("");
                } else {
                    check_date("start date", &start)?;
                    edit = edit.start_date(start);
                }
            }
            if let Some(due) = due {
                check_date("due date", &due)?;
                edit = edit.due_date(due);
            }
            if let Some(notes) = notes {
                edit = edit.notes(notes);
            }
            if completed || pending {
                edit = edit.completed(completed);
            }
            if edit.is_empty() {
                writeln!(out, "Nothing to change.")?;
                return Ok(false);
            }

            if !store.edit(id, edit)? {
                return Err(not_found(id));
            }
            writeln!(out, "Updated {}", code_for(id))?;
            Ok(true)
        }
        Command::Search { query } => {
            let tasks = store.search(&query);
            if tasks.is_empty() {
                writeln!(out, "No matches.")?;
            }
            for task in tasks {
                writeln!(out, "{}", summary_line(task))?;
            }
            Ok(false)
        }
        Command::Complete { id } => {
            if !store.mark_completed(id) {
                return Err(not_found(id));
            }
            writeln!(out, "Completed {}", code_for(id))?;
            Ok(true)
        }
        Command::Delete { id } => {
            if !store.delete(id) {
                return Err(not_found(id));
            }
            writeln!(out, "Deleted {}", code_for(id))?;
            Ok(true)
        }
        Command::Clear { yes } => {
            ensure!(yes, "refusing to delete every task without --yes");
            let count = store.len();
            store.clear();
            writeln!(out, "Deleted {} tasks", count)?;
            Ok(true)
        }
        Command::Stats => {
            let stats = store.stats();
            writeln!(out, "Total:     {}", stats.total)?;
            writeln!(out, "Completed: {}", stats.completed)?;
            writeln!(out, "Pending:   {}", stats.pending)?;
            writeln!(out, "Progress:  {:.1}%", stats.percent_complete)?;
            for (subject, counts) in &stats.by_subject {
                writeln!(
                    out,
                    "  {}: {} total, {} completed, {} pending",
                    subject, counts.total, counts.completed, counts.pending
                )?;
            }
            Ok(false)
        }
        Command::Backup => {
            match file.backup().context("backup failed")? {
                Some(path) => writeln!(out, "Backup created: {}", path.display())?,
                None => writeln!(out, "No task file to back up.")?,
            }
            Ok(false)
        }
        Command::Info => {
            match file.metadata()? {
                Some(meta) => {
                    writeln!(out, "File:     {}", meta.path.display())?;
                    writeln!(out, "Size:     {}", meta.human_size)?;
                    writeln!(out, "Modified: {}", meta.modified)?;
                    if let Some(lines) = meta.line_count {
                        writeln!(out, "Lines:    {}", lines)?;
                    }
                }
                None => writeln!(out, "No task file at {}", file.path().display())?,
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(command: Command, store: &mut TaskStore) -> (anyhow::Result<bool>, String) {
        let dir = TempDir::new().unwrap();
        let file = TaskFile::new(dir.path().join("tasks.json"));
        let mut out = Vec::new();
        let result = execute(command, store, &file, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn add(subject: &str, due: &str, start: Option<&str>) -> Command {
        Command::Add {
            subject: subject.to_string(),
            description: format!("{} homework", subject),
            due: due.to_string(),
            start: start.map(str::to_string),
            notes: None,
        }
    }

    fn edit(id: u32) -> Command {
        Command::Edit {
            id,
            subject: None,
            description: None,
            start: None,
            due: None,
            notes: None,
            completed: false,
            pending: false,
        }
    }

    #[test]
    fn test_parse_task_ref() {
        assert_eq!(parse_task_ref("7"), Ok(7));
        assert_eq!(parse_task_ref("T-0007"), Ok(7));
        assert_eq!(parse_task_ref("t-12"), Ok(12));
        assert!(parse_task_ref("0").is_err());
        assert!(parse_task_ref("X-1").is_err());
    }

    #[test]
    fn test_add_validates_dates() {
        let mut store = TaskStore::new();

        let (result, _) = run(add("Math", "2024-12-20", None), &mut store);
        assert!(result.is_err());

        let (result, _) = run(add("Math", "20/12/2024", Some("21/12/2024")), &mut store);
        assert!(result.is_err());
        assert!(store.is_empty());

        let (result, output) = run(add("Math", "20/12/2024", Some("19/12/2024")), &mut store);
        assert!(result.unwrap());
        assert_eq!(output, "Added T-0001\n");
    }

    #[test]
    fn test_complete_and_list() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", None), &mut store).0.unwrap();
        run(add("Art", "21/12/2024", None), &mut store).0.unwrap();

        let (result, _) = run(Command::Complete { id: 2 }, &mut store);
        assert!(result.unwrap());

        let (_, output) = run(
            Command::List {
                pending: false,
                completed: true,
                subject: None,
                by_due: false,
            },
            &mut store,
        );
        assert_eq!(output, "T-0002 [x] Art: Art homework  due 21/12/2024\n");
    }

    #[test]
    fn test_list_by_due_date_and_subject() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", None), &mut store).0.unwrap();
        run(add("Art", "01/12/2024", None), &mut store).0.unwrap();
        run(add("math", "05/12/2024", None), &mut store).0.unwrap();

        let (_, output) = run(
            Command::List {
                pending: true,
                completed: false,
                subject: Some("MATH".to_string()),
                by_due: true,
            },
            &mut store,
        );
        let codes: Vec<&str> = output
            .lines()
            .map(|l| l.split(' ').next().unwrap())
            .collect();
        assert_eq!(codes, vec!["T-0003", "T-0001"]);
    }

    #[test]
    fn test_missing_task_is_an_error() {
        let mut store = TaskStore::new();
        let (result, _) = run(Command::Delete { id: 3 }, &mut store);
        assert_eq!(result.unwrap_err().to_string(), "no task T-0003");
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", None), &mut store).0.unwrap();

        assert!(run(Command::Clear { yes: false }, &mut store).0.is_err());
        assert_eq!(store.len(), 1);

        assert!(run(Command::Clear { yes: true }, &mut store).0.unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_edit_does_not_save() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", None), &mut store).0.unwrap();

        let (result, output) = run(edit(1), &mut store);
        assert!(!result.unwrap());
        assert_eq!(output, "Nothing to change.\n");
    }

    #[test]
    fn test_edit_pending_reopens_task() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", None), &mut store).0.unwrap();
        run(Command::Complete { id: 1 }, &mut store).0.unwrap();

        let mut reopen = edit(1);
        if let Command::Edit { pending, .. } = &mut reopen {
            *pending = true;
        }
        let (result, output) = run(reopen, &mut store);
        assert!(result.unwrap());
        assert_eq!(output, "Updated T-0001\n");
        assert!(!store.get(1).unwrap().completed);

        let mut complete = edit(1);
        if let Command::Edit { completed, .. } = &mut complete {
            *completed = true;
        }
        assert!(run(complete, &mut store).0.unwrap());
        assert!(store.get(1).unwrap().completed);
    }

    #[test]
    fn test_edit_empty_start_clears_it() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", Some("10/12/2024")), &mut store).0.unwrap();

        let mut clear = edit(1);
        if let Command::Edit { start, .. } = &mut clear {
            *start = Some(String::new());
        }
        assert!(run(clear, &mut store).0.unwrap());
        assert!(store.get(1).unwrap().start_date.is_empty());

        let mut bad = edit(1);
        if let Command::Edit { start, .. } = &mut bad {
            *start = Some("10-12-2024".to_string());
        }
        assert!(run(bad, &mut store).0.is_err());
    }

    #[test]
    fn test_search_lists_matches() {
        let mut store = TaskStore::new();
        run(add("Math", "20/12/2024", None), &mut store).0.unwrap();
        run(add("Art", "21/12/2024", None), &mut store).0.unwrap();

        let search = |query: &str| Command::Search {
            query: query.to_string(),
        };
        let (result, output) = run(search("art"), &mut store);
        assert!(!result.unwrap());
        assert!(output.starts_with("T-0002 [ ] Art: Art homework  due 21/12/2024"));
        assert_eq!(output.lines().count(), 1);

        let (_, output) = run(search("T-0001"), &mut store);
        assert!(output.starts_with("T-0001 "));

        let (_, output) = run(search("chemistry"), &mut store);
        assert_eq!(output, "No matches.\n");
    }

    #[test]
    fn test_stats_output() {
        let mut store = TaskStore::new();
        let (_, output) = run(Command::Stats, &mut store);
        assert!(output.contains("Total:     0"));
        assert!(output.contains("Progress:  0.0%"));
    }
}
