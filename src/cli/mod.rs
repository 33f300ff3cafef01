//! Command-line interface for taskhub
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in the `task` submodule.

use clap::{Parser, Subcommand};

use crate::error::Result;

mod task;

/// taskhub - role-aware task assignment
///
/// A CLI for assigning tasks, tracking progress, and resolving free-text
/// assignees to the people behind them.
#[derive(Parser, Debug)]
#[command(name = "taskhub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./taskhub.toml)
    #[arg(long, global = true, env = "TASKHUB_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Data directory override (defaults to the configured storage.data_dir)
    #[arg(long, global = true, env = "TASKHUB_DATA_DIR")]
    pub data_dir: Option<std::path::PathBuf>,

    /// Acting user: id, email, or employee id from the user directory
    #[arg(long, global = true, env = "TASKHUB_USER")]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new task (admin only)
    New {
        /// Task title
        #[arg(long)]
        title: String,

        /// Task description
        #[arg(long, default_value = "")]
        description: String,

        /// Assignee identifier as entered (employee id, email, free text)
        #[arg(long)]
        assignee: String,

        /// Display name of the assignee
        #[arg(long)]
        assignee_name: Option<String>,

        /// Priority: low, medium, high
        #[arg(long, default_value = "medium")]
        priority: String,

        /// Due date (RFC 3339, e.g. 2026-09-01T17:00:00Z)
        #[arg(long)]
        due: String,
    },

    /// List tasks visible to the acting user
    List {
        /// Exact assignee filter (admin only)
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Show a task with its comments
    Show {
        /// Task ID
        id: String,
    },

    /// Set task progress (0-100)
    Progress {
        /// Task ID
        id: String,

        /// Progress percentage
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Add a comment to a task
    Comment {
        /// Task ID
        id: String,

        /// Comment text
        text: String,
    },

    /// Edit task fields (admin only)
    Update {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long)]
        assignee_name: Option<String>,

        /// Priority: low, medium, high
        #[arg(long)]
        priority: Option<String>,

        /// Status: pending, in_progress, completed, overdue
        #[arg(long)]
        status: Option<String>,

        /// Progress percentage
        #[arg(long, allow_negative_numbers = true)]
        progress: Option<i64>,

        /// Due date (RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },

    /// Delete a task and its comments (admin only)
    Delete {
        /// Task ID
        id: String,
    },

    /// Per-assignee completion statistics (admin only)
    Stats,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let globals = task::Globals {
            config: self.config,
            data_dir: self.data_dir,
            user: self.user,
            json: self.json,
            quiet: self.quiet,
        };

        runtime.block_on(async move {
            match self.command {
                Commands::New {
                    title,
                    description,
                    assignee,
                    assignee_name,
                    priority,
                    due,
                } => {
                    task::run_new(task::NewOptions {
                        title,
                        description,
                        assignee,
                        assignee_name,
                        priority,
                        due,
                        globals,
                    })
                    .await
                }
                Commands::List { assignee } => {
                    task::run_list(task::ListOptions { assignee, globals }).await
                }
                Commands::Show { id } => task::run_show(task::ShowOptions { id, globals }).await,
                Commands::Progress { id, value } => {
                    task::run_progress(task::ProgressOptions { id, value, globals }).await
                }
                Commands::Comment { id, text } => {
                    task::run_comment(task::CommentOptions { id, text, globals }).await
                }
                Commands::Update {
                    id,
                    title,
                    description,
                    assignee,
                    assignee_name,
                    priority,
                    status,
                    progress,
                    due,
                } => {
                    task::run_update(task::UpdateOptions {
                        id,
                        title,
                        description,
                        assignee,
                        assignee_name,
                        priority,
                        status,
                        progress,
                        due,
                        globals,
                    })
                    .await
                }
                Commands::Delete { id } => {
                    task::run_delete(task::DeleteOptions { id, globals }).await
                }
                Commands::Stats => task::run_stats(task::StatsOptions { globals }).await,
            }
        })
    }
}
