//! Command-line interface for tasktrack
//!
//! This module defines the CLI structure using clap derive macros.
//! One-shot subcommands live in `task`, the interactive menu in `shell`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::events::{EventDestination, EventSink, NullSink};
use crate::manager::TaskManager;
use crate::output::OutputOptions;
use crate::store::DocumentStore;

mod shell;
mod task;

pub use shell::Shell;

/// tasktrack - a small personal task tracker
///
/// Tasks are kept in a local document store. Run without a subcommand for
/// the interactive menu.
#[derive(Parser, Debug)]
#[command(name = "tasktrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to <data-dir>/tasktrack.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the task databases
    #[arg(long, global = true, env = "TASKTRACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write domain events as JSON lines to a file, or "-" for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: String,

        /// Priority: Low, Medium, High
        #[arg(long)]
        priority: String,

        /// Longer description
        #[arg(long = "desc", default_value = "")]
        description: String,
    },

    /// List tasks, open work first
    List {
        /// Only tasks with this status (Pending, In Progress, Completed)
        #[arg(long)]
        status: Option<String>,

        /// Only tasks with this priority
        #[arg(long)]
        priority: Option<String>,

        /// Only tasks due on this date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Secondary sort key: priority, due_date, creation_timestamp
        #[arg(long)]
        sort: Option<String>,
    },

    /// Show one task (full id or unique prefix)
    Show { id: String },

    /// Change fields of a task
    Update {
        /// Task id or prefix
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long = "desc")]
        description: Option<String>,

        #[arg(long)]
        due: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        #[arg(long)]
        status: Option<String>,
    },

    /// Mark a task as completed
    Complete { id: String },

    /// Delete a task
    Delete { id: String },

    /// Print the number of tasks
    Count,

    /// Interactive menu (the default)
    Shell,
}

/// Resolved settings shared by every command of one run.
pub struct CommandContext {
    pub config: Config,
    pub events: Option<String>,
    pub output: OutputOptions,
}

impl CommandContext {
    /// Connect to the store and load the cache, run `f`, then close.
    ///
    /// The store is closed on every path; an early error drops it, which
    /// releases the connection too.
    pub fn with_manager<T>(
        &self,
        f: impl FnOnce(&mut TaskManager<DocumentStore>) -> Result<T>,
    ) -> Result<T> {
        let sink: Box<dyn EventSink> = match EventDestination::parse(self.events.as_deref()) {
            Some(destination) => Box::new(destination.open()?),
            None => Box::new(NullSink),
        };
        let store = DocumentStore::connect(&self.config.store)?;
        let mut manager = TaskManager::load(store, sink)?;

        let result = f(&mut manager);
        manager.into_store().close();
        result
    }
}

impl Cli {
    /// Whether events share stdout, which rules out JSON output.
    pub fn events_to_stdout(&self) -> bool {
        matches!(
            EventDestination::parse(self.events.as_deref()),
            Some(EventDestination::Stdout)
        )
    }

    pub fn resolve_config(&self) -> Result<Config> {
        Config::resolve(self.config.as_deref(), self.data_dir.as_deref())
    }

    /// Execute the CLI command
    pub fn run(self, config: Config) -> Result<()> {
        let output = OutputOptions {
            json: self.json && !self.events_to_stdout(),
            quiet: self.quiet,
        };
        let ctx = CommandContext {
            config,
            events: self.events,
            output,
        };

        match self.command.unwrap_or(Commands::Shell) {
            Commands::Add {
                title,
                due,
                priority,
                description,
            } => task::run_add(
                &ctx,
                task::AddOptions {
                    title,
                    description,
                    due,
                    priority,
                },
            ),
            Commands::List {
                status,
                priority,
                due,
                sort,
            } => task::run_list(
                &ctx,
                task::ListOptions {
                    status,
                    priority,
                    due,
                    sort,
                },
            ),
            Commands::Show { id } => task::run_show(&ctx, task::ShowOptions { id }),
            Commands::Update {
                id,
                title,
                description,
                due,
                priority,
                status,
            } => task::run_update(
                &ctx,
                task::UpdateOptions {
                    id,
                    title,
                    description,
                    due,
                    priority,
                    status,
                },
            ),
            Commands::Complete { id } => task::run_complete(&ctx, task::CompleteOptions { id }),
            Commands::Delete { id } => task::run_delete(&ctx, task::DeleteOptions { id }),
            Commands::Count => task::run_count(&ctx),
            Commands::Shell => shell::run(&ctx),
        }
    }
}
