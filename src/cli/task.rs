//! taskhub command implementations.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::auth::{AuthSession, ConfigAuthProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::principal::Principal;
use crate::resolver;
use crate::storage::JsonStorage;
use crate::store::TaskService;
use crate::task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus, validate_progress};

/// Flags shared by every subcommand
pub struct Globals {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

pub struct NewOptions {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub assignee_name: Option<String>,
    pub priority: String,
    pub due: String,
    pub globals: Globals,
}

pub struct ListOptions {
    pub assignee: Option<String>,
    pub globals: Globals,
}

pub struct ShowOptions {
    pub id: String,
    pub globals: Globals,
}

pub struct ProgressOptions {
    pub id: String,
    pub value: i64,
    pub globals: Globals,
}

pub struct CommentOptions {
    pub id: String,
    pub text: String,
    pub globals: Globals,
}

pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub assignee_name: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub progress: Option<i64>,
    pub due: Option<String>,
    pub globals: Globals,
}

pub struct DeleteOptions {
    pub id: String,
    pub globals: Globals,
}

pub struct StatsOptions {
    pub globals: Globals,
}

struct TaskContext {
    service: TaskService<JsonStorage>,
    principal: Principal,
    config: Config,
    output: OutputOptions,
}

async fn load_context(globals: &Globals) -> Result<TaskContext> {
    let config = match globals.config.as_ref() {
        Some(path) => Config::load(path)?,
        None => Config::load_from_dir(std::path::Path::new("."))?,
    };

    let session = AuthSession::new(ConfigAuthProvider::new(config.clone()));
    let principal = match globals.user.as_deref() {
        Some(selector) => session.sign_in(selector)?,
        None => match config.default_principal()? {
            Some(principal) => principal,
            None => {
                return Err(Error::InvalidConfig(
                    "no acting user; pass --user or set actor.default".to_string(),
                ))
            }
        },
    };

    let data_dir = globals
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.data_dir.clone());

    let mut service = TaskService::new(JsonStorage::new(data_dir));
    service.refresh().await?;

    Ok(TaskContext {
        service,
        principal,
        config,
        output: OutputOptions {
            json: globals.json,
            quiet: globals.quiet,
        },
    })
}

pub async fn run_new(options: NewOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals).await?;

    let priority: TaskPriority = TaskPriority::from_str(&options.priority)?;
    let due_date = parse_due(&options.due)?;

    // Fall back to the user directory for the display name, then to the
    // identifier itself for assignees outside the directory.
    let assignee_name = options.assignee_name.unwrap_or_else(|| {
        ctx.config
            .principal(&options.assignee)
            .map(|p| p.name)
            .unwrap_or_else(|_| options.assignee.clone())
    });

    let task = ctx
        .service
        .create(
            NewTask {
                title: options.title,
                description: options.description,
                assigned_to: options.assignee,
                assigned_to_name: assignee_name,
                priority,
                due_date,
            },
            &ctx.principal,
        )
        .await?;

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary(
        "Assignee",
        format!("{} ({})", task.assigned_to_name, task.assigned_to),
    );
    human.push_summary("Priority", task.priority.as_str());
    human.push_summary("Due", task.due_date.to_rfc3339());

    emit_success(ctx.output, "new", &task, Some(&human))
}

#[derive(serde::Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

pub async fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(&options.globals).await?;

    if options.assignee.is_some() && !ctx.principal.is_admin() {
        return Err(Error::Permission(
            "Only admins can filter by assignee".to_string(),
        ));
    }

    let tasks = ctx
        .service
        .list_for(&ctx.principal, options.assignee.as_deref());

    let output = TaskListOutput {
        total: tasks.len(),
        tasks: tasks.clone(),
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    if let Some(assignee) = options.assignee {
        human.push_summary("Assignee", assignee);
    }
    for task in &tasks {
        human.push_detail(format!(
            "[{}][{}] {} {} ({}, {}%)",
            task.status.as_str(),
            task.priority.as_str(),
            task.id,
            task.title,
            task.assigned_to_name,
            task.progress
        ));
    }

    emit_success(ctx.output, "list", &output, Some(&human))
}

pub async fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(&options.globals).await?;

    let task = ctx
        .service
        .get(&options.id)
        .ok_or_else(|| Error::NotFound(options.id.clone()))?;

    // Tasks outside an employee's view read as missing.
    if !ctx.principal.is_admin() && !resolver::resolves(&ctx.principal, task) {
        return Err(Error::NotFound(options.id.clone()));
    }

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.as_str());
    human.push_summary("Priority", task.priority.as_str());
    human.push_summary("Progress", format!("{}%", task.progress));
    human.push_summary(
        "Assignee",
        format!("{} ({})", task.assigned_to_name, task.assigned_to),
    );
    human.push_summary("Assigned by", task.assigned_by_name.clone());
    human.push_summary("Due", task.due_date.to_rfc3339());
    if let Some(completed_at) = task.completed_at {
        human.push_summary("Completed", completed_at.to_rfc3339());
    }
    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }
    for comment in &task.comments {
        human.push_detail(format!(
            "[{}] {}: {}",
            comment.created_at.to_rfc3339(),
            comment.user_name,
            comment.text
        ));
    }

    emit_success(ctx.output, "show", task, Some(&human))
}

pub async fn run_progress(options: ProgressOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals).await?;

    let task = ctx
        .service
        .set_progress(&options.id, options.value, &ctx.principal)
        .await?;

    let mut human = HumanOutput::new("Progress updated");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Progress", format!("{}%", task.progress));
    human.push_summary("Status", task.status.as_str());
    if let Some(completed_at) = task.completed_at {
        human.push_summary("Completed", completed_at.to_rfc3339());
    }

    emit_success(ctx.output, "progress", &task, Some(&human))
}

pub async fn run_comment(options: CommentOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals).await?;

    let comment = ctx
        .service
        .add_comment(&options.id, &options.text, &ctx.principal)
        .await?;

    let mut human = HumanOutput::new("Comment added");
    human.push_summary("Task", comment.task_id.clone());
    human.push_summary("By", comment.user_name.clone());
    human.push_summary("Comment", comment.text.clone());

    emit_success(ctx.output, "comment", &comment, Some(&human))
}

pub async fn run_update(options: UpdateOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals).await?;

    let patch = TaskPatch {
        title: options.title,
        description: options.description,
        assigned_to: options.assignee,
        assigned_to_name: options.assignee_name,
        priority: options
            .priority
            .as_deref()
            .map(TaskPriority::from_str)
            .transpose()?,
        status: options
            .status
            .as_deref()
            .map(TaskStatus::from_str)
            .transpose()?,
        progress: options.progress.map(validate_progress).transpose()?,
        due_date: options.due.as_deref().map(parse_due).transpose()?,
    };

    let task = ctx
        .service
        .update(&options.id, patch, &ctx.principal)
        .await?;

    let mut human = HumanOutput::new("Task updated");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.as_str());
    human.push_summary("Progress", format!("{}%", task.progress));

    emit_success(ctx.output, "update", &task, Some(&human))
}

pub async fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = load_context(&options.globals).await?;

    let removed = ctx.service.delete(&options.id, &ctx.principal).await?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", removed.id.clone());
    human.push_summary("Title", removed.title.clone());

    emit_success(ctx.output, "delete", &removed, Some(&human))
}

pub async fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = load_context(&options.globals).await?;

    let summary = ctx.service.assignee_summary(&ctx.principal)?;

    let mut human = HumanOutput::new("Team statistics");
    human.push_summary("Assignees", summary.len().to_string());
    for entry in &summary {
        human.push_detail(format!(
            "{} ({}): {}/{} completed ({}%)",
            entry.assigned_to_name,
            entry.assigned_to,
            entry.completed,
            entry.total,
            entry.completion_rate
        ));
    }

    emit_success(ctx.output, "stats", &summary, Some(&human))
}

fn parse_due(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| Error::Validation(format!("invalid due date '{value}': {err}")))
}
