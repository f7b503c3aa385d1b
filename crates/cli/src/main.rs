//! Command-line front end for the assignment tracker
//!
//! Each invocation loads the task file, runs one command and, if the command
//! changed anything, writes the file back.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assignments_core::{Config, TaskStore};

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Task file
    ///
    /// Overrides `ASSIGNMENTS_FILE` and `ASSIGNMENTS_DATA_DIR`.
    #[arg(long, short, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assignments=info,assignments_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(path) = args.file {
        config = config.with_task_file(path);
    }
    let task_file = config.task_file();
    tracing::debug!("Using task file: {}", task_file.path().display());

    let mut store = TaskStore::new();
    let report = task_file
        .load_into(&mut store)
        .with_context(|| format!("could not read {}", task_file.path().display()))?;
    for issue in &report.issues {
        eprintln!("warning: {}", issue);
    }

    let mut stdout = io::stdout().lock();
    let changed = commands::execute(args.command, &mut store, &task_file, &mut stdout)?;

    if changed {
        task_file.save(&store).with_context(|| {
            format!(
                "changes were not saved to {}",
                task_file.path().display()
            )
        })?;
    }
    Ok(())
}
