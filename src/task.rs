//! Task and comment records, plus the status transition rules.
//!
//! Every mutation path derives status through [`derive_status`] so the
//! progress/status coupling lives in exactly one place:
//! - pending -> in_progress when progress first moves above 0
//! - anything but completed -> completed when progress reaches 100
//! - completed is terminal with respect to progress changes
//!
//! `overdue` is applied by an external scheduler through an explicit status
//! patch; it is never derived here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::principal::Principal;

const TASK_ID_PREFIX: &str = "task";

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Overdue => "overdue",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "overdue" => Ok(TaskStatus::Overdue),
            other => Err(Error::Validation(format!("unknown task status '{other}'"))),
        }
    }
}

/// Priority of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(Error::Validation(format!(
                "unknown task priority '{other}' (expected low, medium, high)"
            ))),
        }
    }
}

/// A comment on a task. Append-only; never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A task record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Owner reference. Intended to hold an employee identifier but observed
    /// to sometimes carry an email or account id; see `resolver`.
    pub assigned_to: String,
    pub assigned_to_name: String,
    pub assigned_by: String,
    pub assigned_by_name: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

/// Fields supplied when creating a task. Identity, timestamps, and the
/// assigning principal are filled in by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub assigned_to: String,
    pub assigned_to_name: String,
    pub priority: TaskPriority,
    pub due_date: DateTime<Utc>,
}

/// Partial update applied by `TaskService::update`. Only present fields are
/// written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub assigned_to_name: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub progress: Option<u8>,
}

impl Task {
    /// Build a fresh task from creation input and the creating principal.
    pub fn create(input: NewTask, assigned_by: &Principal, now: DateTime<Utc>) -> Self {
        Task {
            id: new_task_id(),
            title: input.title,
            description: input.description,
            assigned_to: input.assigned_to,
            assigned_to_name: input.assigned_to_name,
            assigned_by: assigned_by.id.clone(),
            assigned_by_name: assigned_by.name.clone(),
            status: TaskStatus::Pending,
            priority: input.priority,
            created_at: now,
            due_date: input.due_date,
            completed_at: None,
            progress: 0,
            comments: Vec::new(),
        }
    }
}

/// Generate a task id (`task-<ulid>`)
pub fn new_task_id() -> String {
    format!("{}-{}", TASK_ID_PREFIX, Ulid::new().to_string().to_lowercase())
}

/// Generate a comment id
pub fn new_comment_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validate a progress value supplied by a caller, returning the in-range
/// representation. Out-of-range values are refused without touching state.
pub fn validate_progress(progress: i64) -> Result<u8> {
    if !(0..=100).contains(&progress) {
        return Err(Error::Validation(format!(
            "progress must be between 0 and 100, got {progress}"
        )));
    }
    Ok(progress as u8)
}

/// Outcome of applying a progress value to a task's current status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub status: TaskStatus,
    /// True when this transition enters `Completed` from another state, which
    /// is the only moment `completed_at` may be stamped.
    pub completes: bool,
}

/// Derive the status that follows from a progress change.
pub fn derive_status(current: TaskStatus, progress: u8) -> StatusTransition {
    if current == TaskStatus::Completed {
        // Terminal for progress-driven transitions; later progress edits
        // update the field without demoting the status.
        return StatusTransition {
            status: TaskStatus::Completed,
            completes: false,
        };
    }

    if progress == 100 {
        return StatusTransition {
            status: TaskStatus::Completed,
            completes: true,
        };
    }

    if progress > 0 && current == TaskStatus::Pending {
        return StatusTransition {
            status: TaskStatus::InProgress,
            completes: false,
        };
    }

    StatusTransition {
        status: current,
        completes: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_in_progress_on_first_progress() {
        let transition = derive_status(TaskStatus::Pending, 1);
        assert_eq!(transition.status, TaskStatus::InProgress);
        assert!(!transition.completes);
    }

    #[test]
    fn pending_with_zero_progress_stays_pending() {
        let transition = derive_status(TaskStatus::Pending, 0);
        assert_eq!(transition.status, TaskStatus::Pending);
    }

    #[test]
    fn full_progress_completes_from_any_open_state() {
        for current in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Overdue] {
            let transition = derive_status(current, 100);
            assert_eq!(transition.status, TaskStatus::Completed);
            assert!(transition.completes);
        }
    }

    #[test]
    fn completed_is_terminal_for_progress_changes() {
        let transition = derive_status(TaskStatus::Completed, 60);
        assert_eq!(transition.status, TaskStatus::Completed);
        assert!(!transition.completes);

        // Re-applying 100 does not count as a fresh completion
        let transition = derive_status(TaskStatus::Completed, 100);
        assert!(!transition.completes);
    }

    #[test]
    fn overdue_keeps_status_below_full_progress() {
        let transition = derive_status(TaskStatus::Overdue, 50);
        assert_eq!(transition.status, TaskStatus::Overdue);
    }

    #[test]
    fn progress_bounds_are_enforced() {
        assert!(validate_progress(-1).is_err());
        assert!(validate_progress(101).is_err());
        assert_eq!(validate_progress(0).unwrap(), 0);
        assert_eq!(validate_progress(100).unwrap(), 100);
    }

    #[test]
    fn status_round_trips_through_wire_form() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Overdue,
        ] {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn task_ids_are_prefixed_and_unique() {
        let a = new_task_id();
        let b = new_task_id();
        assert!(a.starts_with("task-"));
        assert_ne!(a, b);
    }
}
