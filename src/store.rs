//! Task service: owns the in-memory task + comment snapshot and every
//! mutation invariant.
//!
//! The service fronts an async [`Storage`] collaborator. Mutations persist
//! through storage first and only then touch the snapshot, so a failed call
//! leaves the last-known-good state intact. Refreshes fetch tasks and
//! comments concurrently and join them only once both sources return; a
//! monotonically increasing fetch token keeps a superseded fetch from
//! overwriting fresher state.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, instrument};

use crate::error::{Error, Result};
use crate::notify::{LogNotifier, Notifier, NotifyKind};
use crate::policy;
use crate::principal::Principal;
use crate::resolver;
use crate::storage::Storage;
use crate::task::{
    derive_status, new_comment_id, validate_progress, Comment, NewTask, Task, TaskPatch,
    TaskStatus,
};

/// Result of a refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot was replaced with the fetched state
    Applied,
    /// A newer fetch started before this one finished; results discarded
    Superseded,
}

/// Per-assignee rollup for the team overview
#[derive(Debug, Clone, Serialize)]
pub struct AssigneeSummary {
    pub assigned_to: String,
    pub assigned_to_name: String,
    pub total: usize,
    pub completed: usize,
    /// Percentage of completed tasks, rounded
    pub completion_rate: u8,
}

/// Task and comment store backed by a storage collaborator
pub struct TaskService<S: Storage> {
    storage: S,
    notifier: Box<dyn Notifier>,
    tasks: Vec<Task>,
    fetch_seq: AtomicU64,
}

impl<S: Storage> TaskService<S> {
    pub fn new(storage: S) -> Self {
        Self::with_notifier(storage, Box::new(LogNotifier))
    }

    pub fn with_notifier(storage: S, notifier: Box<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            tasks: Vec::new(),
            fetch_seq: AtomicU64::new(0),
        }
    }

    /// Current in-memory snapshot
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    // =========================================================================
    // Refresh (concurrent fetch + join)
    // =========================================================================

    /// Reload the snapshot from storage. Tasks and comments are fetched
    /// concurrently; the merged view is applied only after both complete.
    pub async fn refresh(&mut self) -> Result<RefreshOutcome> {
        let token = self.begin_fetch();

        let (tasks, comments) =
            tokio::join!(self.storage.list_tasks(), self.storage.list_comments());
        let tasks = tasks.map_err(surface_storage_error)?;
        let comments = comments.map_err(surface_storage_error)?;

        Ok(self.apply_fetch(token, tasks, comments))
    }

    /// Stamp the start of a fetch. Any fetch started earlier is superseded
    /// from this point on.
    pub fn begin_fetch(&self) -> u64 {
        self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply fetched state if `token` still identifies the newest fetch;
    /// otherwise discard it so stale results never clobber fresher state.
    pub fn apply_fetch(
        &mut self,
        token: u64,
        tasks: Vec<Task>,
        comments: Vec<Comment>,
    ) -> RefreshOutcome {
        if self.fetch_seq.load(Ordering::SeqCst) != token {
            return RefreshOutcome::Superseded;
        }
        self.tasks = join_comments(tasks, comments);
        RefreshOutcome::Applied
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a task. Admin only.
    #[instrument(skip(self, input, principal), fields(principal = %principal.id))]
    pub async fn create(&mut self, input: NewTask, principal: &Principal) -> Result<Task> {
        policy::require(policy::can_create(principal), "Only admins can create tasks")?;

        if input.title.trim().is_empty() {
            return Err(Error::Validation("task title cannot be empty".to_string()));
        }
        if input.assigned_to.trim().is_empty() {
            return Err(Error::Validation(
                "task must be assigned to an employee".to_string(),
            ));
        }

        let task = Task::create(input, principal, Utc::now());
        self.storage
            .insert_task(&task)
            .await
            .map_err(surface_storage_error)?;

        self.tasks.push(task.clone());
        self.notifier
            .notify(NotifyKind::Success, "Task created successfully");
        Ok(task)
    }

    /// Apply a partial update. Admin only; only present fields are written.
    /// An explicit transition into `completed` stamps `completed_at` and
    /// forces progress to 100, overriding conflicting patch values.
    #[instrument(skip(self, patch, principal), fields(principal = %principal.id))]
    pub async fn update(
        &mut self,
        task_id: &str,
        patch: TaskPatch,
        principal: &Principal,
    ) -> Result<Task> {
        let index = self.index_of(task_id)?;
        policy::require(
            policy::can_edit_full(principal, &self.tasks[index]),
            "Only admins can edit tasks",
        )?;

        let was_completed = self.tasks[index].status == TaskStatus::Completed;
        let mut updated = self.tasks[index].clone();

        if let Some(title) = patch.title {
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(assigned_to) = patch.assigned_to {
            updated.assigned_to = assigned_to;
        }
        if let Some(assigned_to_name) = patch.assigned_to_name {
            updated.assigned_to_name = assigned_to_name;
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = due_date;
        }
        if let Some(progress) = patch.progress {
            updated.progress = validate_progress(i64::from(progress))?;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }

        if updated.status == TaskStatus::Completed && !was_completed {
            updated.completed_at = Some(Utc::now());
            updated.progress = 100;
        }

        self.storage
            .update_task(&updated)
            .await
            .map_err(surface_storage_error)?;

        self.tasks[index] = updated.clone();
        self.notifier
            .notify(NotifyKind::Success, "Task updated successfully");
        Ok(updated)
    }

    /// Set a task's progress, deriving status through the single transition
    /// function. Admin or assignee only.
    #[instrument(skip(self, principal), fields(principal = %principal.id))]
    pub async fn set_progress(
        &mut self,
        task_id: &str,
        progress: i64,
        principal: &Principal,
    ) -> Result<Task> {
        // Range check comes first and refuses without touching state.
        let progress = validate_progress(progress)?;

        let index = self.index_of(task_id)?;
        policy::require(
            policy::can_update_progress(principal, &self.tasks[index]),
            "You can only update progress on your own tasks",
        )?;

        let mut updated = self.tasks[index].clone();
        let transition = derive_status(updated.status, progress);
        updated.progress = progress;
        updated.status = transition.status;
        if transition.completes && updated.completed_at.is_none() {
            updated.completed_at = Some(Utc::now());
        }

        self.storage
            .update_task(&updated)
            .await
            .map_err(surface_storage_error)?;

        self.tasks[index] = updated.clone();
        self.notifier.notify(NotifyKind::Success, "Progress updated");
        Ok(updated)
    }

    /// Append a comment. Comments are collaborative and never mutated.
    #[instrument(skip(self, text, principal), fields(principal = %principal.id))]
    pub async fn add_comment(
        &mut self,
        task_id: &str,
        text: &str,
        principal: &Principal,
    ) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("comment text cannot be empty".to_string()));
        }

        let index = self.index_of(task_id)?;
        policy::require(
            policy::can_comment(principal, &self.tasks[index]),
            "You cannot comment on this task",
        )?;

        let comment = Comment {
            id: new_comment_id(),
            task_id: task_id.to_string(),
            user_id: principal.id.clone(),
            user_name: principal.name.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        self.storage
            .insert_comment(&comment)
            .await
            .map_err(surface_storage_error)?;

        self.tasks[index].comments.push(comment.clone());
        self.notifier.notify(NotifyKind::Success, "Comment added");
        Ok(comment)
    }

    /// Delete a task and its comments. Admin only.
    #[instrument(skip(self, principal), fields(principal = %principal.id))]
    pub async fn delete(&mut self, task_id: &str, principal: &Principal) -> Result<Task> {
        policy::require(policy::can_delete(principal), "Only admins can delete tasks")?;

        let index = self.index_of(task_id)?;
        self.storage
            .delete_task(task_id)
            .await
            .map_err(surface_storage_error)?;

        let removed = self.tasks.remove(index);
        self.notifier.notify(NotifyKind::Success, "Task deleted");
        Ok(removed)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Tasks visible to the principal. Admins see everything, optionally
    /// exact-filtered by an employee identifier (trusted input, not fuzzed);
    /// employees see the tasks the resolver attributes to them.
    pub fn list_for(&self, principal: &Principal, employee_filter: Option<&str>) -> Vec<Task> {
        if principal.is_admin() {
            return match employee_filter {
                Some(filter) => self
                    .tasks
                    .iter()
                    .filter(|task| task.assigned_to == filter)
                    .cloned()
                    .collect(),
                None => self.tasks.clone(),
            };
        }

        if principal.known_identifiers().is_empty() {
            return Vec::new();
        }

        self.tasks
            .iter()
            .filter(|task| resolver::resolves(principal, task))
            .cloned()
            .collect()
    }

    /// Per-assignee totals and completion rate. Admin only.
    pub fn assignee_summary(&self, principal: &Principal) -> Result<Vec<AssigneeSummary>> {
        policy::require(
            principal.is_admin(),
            "Only admins can view team statistics",
        )?;

        let mut summaries: Vec<AssigneeSummary> = Vec::new();
        for task in &self.tasks {
            let found = summaries
                .iter()
                .position(|summary| summary.assigned_to == task.assigned_to);
            let index = match found {
                Some(index) => index,
                None => {
                    summaries.push(AssigneeSummary {
                        assigned_to: task.assigned_to.clone(),
                        assigned_to_name: task.assigned_to_name.clone(),
                        total: 0,
                        completed: 0,
                        completion_rate: 0,
                    });
                    summaries.len() - 1
                }
            };
            summaries[index].total += 1;
            if task.status == TaskStatus::Completed {
                summaries[index].completed += 1;
            }
        }

        for summary in &mut summaries {
            summary.completion_rate = if summary.total == 0 {
                0
            } else {
                ((summary.completed * 100 + summary.total / 2) / summary.total) as u8
            };
        }

        Ok(summaries)
    }

    fn index_of(&self, task_id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))
    }
}

/// Join comments onto their tasks, oldest first. Comments referencing a
/// missing task are dropped; the back-reference is not ownership.
fn join_comments(mut tasks: Vec<Task>, mut comments: Vec<Comment>) -> Vec<Task> {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    for task in &mut tasks {
        task.comments.clear();
    }
    for comment in comments {
        if let Some(task) = tasks.iter_mut().find(|task| task.id == comment.task_id) {
            task.comments.push(comment);
        }
    }
    tasks
}

/// Translate a storage transport failure into the surfaced taxonomy, logging
/// it; domain errors pass through untouched.
fn surface_storage_error(err: Error) -> Error {
    match err {
        Error::Storage(_) => err,
        other => {
            error!("storage call failed: {other}");
            Error::Storage(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::Role;
    use crate::storage::MemoryStorage;
    use crate::task::TaskPriority;
    use chrono::{Duration, Utc};

    fn admin() -> Principal {
        Principal {
            id: "admin-1".to_string(),
            name: "Admin User".to_string(),
            employee_id: None,
            email: Some("admin@example.com".to_string()),
            role: Role::Admin,
        }
    }

    fn employee(employee_id: &str, email: Option<&str>) -> Principal {
        Principal {
            id: format!("user-{employee_id}"),
            name: "John Employee".to_string(),
            employee_id: Some(employee_id.to_string()),
            email: email.map(str::to_string),
            role: Role::Employee,
        }
    }

    fn new_task(assigned_to: &str) -> NewTask {
        NewTask {
            title: "Complete quarterly report".to_string(),
            description: "Prepare and submit the quarterly report".to_string(),
            assigned_to: assigned_to.to_string(),
            assigned_to_name: "John Employee".to_string(),
            priority: TaskPriority::High,
            due_date: Utc::now() + Duration::days(1),
        }
    }

    fn service() -> TaskService<MemoryStorage> {
        TaskService::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn create_requires_admin() {
        let mut service = service();
        let err = service
            .create(new_task("EMP001"), &employee("EMP001", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        assert!(service.tasks().is_empty());
    }

    #[tokio::test]
    async fn create_fills_identity_and_defaults() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        assert!(task.id.starts_with("task-"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress, 0);
        assert_eq!(task.assigned_by, "admin-1");
        assert_eq!(task.assigned_by_name, "Admin User");
        assert!(task.comments.is_empty());
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn create_rejects_blank_required_fields() {
        let mut service = service();
        let mut input = new_task("EMP001");
        input.title = "   ".to_string();
        assert!(matches!(
            service.create(input, &admin()).await.unwrap_err(),
            Error::Validation(_)
        ));

        let mut input = new_task("EMP001");
        input.assigned_to = String::new();
        assert!(matches!(
            service.create(input, &admin()).await.unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn listing_matches_resolver_in_both_directions() {
        let mut service = service();
        let assignments = ["EMP001", "EMP002", "alice@example.com", "EMP-alice-07"];
        for assigned_to in assignments {
            service.create(new_task(assigned_to), &admin()).await.unwrap();
        }

        let alice = Principal {
            id: "user-alice".to_string(),
            name: "Alice".to_string(),
            employee_id: None,
            email: Some("alice@example.com".to_string()),
            role: Role::Employee,
        };

        let listed = service.list_for(&alice, None);
        for task in service.tasks() {
            let visible = listed.iter().any(|candidate| candidate.id == task.id);
            assert_eq!(visible, resolver::resolves(&alice, task), "task {}", task.id);
        }
        // Union semantics: raw email exact plus embedded local part
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn admin_sees_all_and_filters_exactly() {
        let mut service = service();
        service.create(new_task("EMP001"), &admin()).await.unwrap();
        service.create(new_task("EMP002"), &admin()).await.unwrap();

        assert_eq!(service.list_for(&admin(), None).len(), 2);
        let filtered = service.list_for(&admin(), Some("EMP001"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].assigned_to, "EMP001");
        // Admin filters are trusted: no fuzzy match
        assert!(service.list_for(&admin(), Some("emp001")).is_empty());
    }

    #[tokio::test]
    async fn progress_drives_status_transitions() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();
        let worker = employee("EMP001", None);

        let updated = service.set_progress(&task.id, 50, &worker).await.unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.completed_at.is_none());

        let before = Utc::now();
        let updated = service.set_progress(&task.id, 100, &worker).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.progress, 100);
        let completed_at = updated.completed_at.unwrap();
        assert!(completed_at >= before);

        // Later progress edits keep the terminal status and the original stamp
        let updated = service.set_progress(&task.id, 60, &worker).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.progress, 60);
        assert_eq!(updated.completed_at, Some(completed_at));
    }

    #[tokio::test]
    async fn set_progress_is_idempotent_at_full() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();
        let worker = employee("EMP001", None);

        let first = service.set_progress(&task.id, 100, &worker).await.unwrap();
        let second = service.set_progress(&task.id, 100, &worker).await.unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.completed_at, second.completed_at);
        assert_eq!(first.progress, second.progress);
    }

    #[tokio::test]
    async fn out_of_range_progress_is_refused_without_mutation() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();
        let worker = employee("EMP001", None);
        service.set_progress(&task.id, 30, &worker).await.unwrap();

        for bad in [-1, 101] {
            let err = service.set_progress(&task.id, bad, &worker).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(service.get(&task.id).unwrap().progress, 30);
    }

    #[tokio::test]
    async fn progress_on_someone_elses_task_is_refused() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let err = service
            .set_progress(&task.id, 10, &employee("EMP002", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        assert_eq!(service.get(&task.id).unwrap().progress, 0);
    }

    #[tokio::test]
    async fn missing_task_reports_not_found() {
        let mut service = service();
        let err = service
            .set_progress("task-missing", 10, &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = service
            .update("task-missing", TaskPatch::default(), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn explicit_completion_forces_progress_and_stamp() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            progress: Some(25), // conflicting value is overridden
            ..TaskPatch::default()
        };
        let updated = service.update(&task.id, patch, &admin()).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.progress, 100);
        assert!(updated.completed_at.is_some());

        // Updating an already-completed task does not restamp
        let stamp = updated.completed_at;
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            ..TaskPatch::default()
        };
        let updated = service.update(&task.id, patch, &admin()).await.unwrap();
        assert_eq!(updated.completed_at, stamp);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let patch = TaskPatch {
            title: Some("Revised title".to_string()),
            ..TaskPatch::default()
        };
        let updated = service.update(&task.id, patch, &admin()).await.unwrap();
        assert_eq!(updated.title, "Revised title");
        assert_eq!(updated.description, task.description);
        assert_eq!(updated.assigned_to, task.assigned_to);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn update_is_admin_only() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let err = service
            .update(&task.id, TaskPatch::default(), &employee("EMP001", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
    }

    #[tokio::test]
    async fn overdue_is_applied_externally_and_survives_progress() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        // Scheduling collaborator marks the task overdue through a patch
        let patch = TaskPatch {
            status: Some(TaskStatus::Overdue),
            ..TaskPatch::default()
        };
        service.update(&task.id, patch, &admin()).await.unwrap();

        let worker = employee("EMP001", None);
        let updated = service.set_progress(&task.id, 50, &worker).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Overdue);

        let updated = service.set_progress(&task.id, 100, &worker).await.unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn comments_append_in_order_and_reject_blank() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();
        let worker = employee("EMP001", None);

        service
            .add_comment(&task.id, "Started on the draft", &worker)
            .await
            .unwrap();
        service
            .add_comment(&task.id, "Looks good so far", &admin())
            .await
            .unwrap();

        let task = service.get(&task.id).unwrap().clone();
        assert_eq!(task.comments.len(), 2);
        assert_eq!(task.comments[0].text, "Started on the draft");
        assert_eq!(task.comments[0].user_id, worker.id);
        assert_eq!(task.comments[1].user_name, "Admin User");

        let err = service.add_comment(&task.id, "   ", &worker).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn delete_requires_admin_and_removes_task() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let err = service
            .delete(&task.id, &employee("EMP001", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
        assert!(service.get(&task.id).is_some());

        service.delete(&task.id, &admin()).await.unwrap();
        assert!(service.get(&task.id).is_none());
    }

    #[tokio::test]
    async fn refresh_joins_comments_after_both_fetches() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();
        service
            .add_comment(&task.id, "note", &admin())
            .await
            .unwrap();

        // A fresh service over the same storage sees the joined view
        let mut reloaded = TaskService::new(MemoryStorage::with_records(
            service.storage.list_tasks().await.unwrap(),
            service.storage.list_comments().await.unwrap(),
        ));
        assert_eq!(reloaded.refresh().await.unwrap(), RefreshOutcome::Applied);
        let task = reloaded.get(&task.id).unwrap();
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.comments[0].text, "note");
    }

    #[tokio::test]
    async fn stale_fetch_results_are_discarded() {
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let stale_token = service.begin_fetch();
        let fresh_token = service.begin_fetch();

        // The fresh fetch lands first
        let outcome = service.apply_fetch(
            fresh_token,
            vec![service.get(&task.id).unwrap().clone()],
            Vec::new(),
        );
        assert_eq!(outcome, RefreshOutcome::Applied);

        // The stale fetch completes afterwards with an emptier view
        let outcome = service.apply_fetch(stale_token, Vec::new(), Vec::new());
        assert_eq!(outcome, RefreshOutcome::Superseded);
        assert_eq!(service.tasks().len(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_principal_sees_nothing() {
        let mut service = service();
        service.create(new_task("EMP001"), &admin()).await.unwrap();

        let anonymous = Principal {
            id: "  ".to_string(),
            name: String::new(),
            employee_id: None,
            email: None,
            role: Role::Employee,
        };
        assert!(service.list_for(&anonymous, None).is_empty());
    }

    #[tokio::test]
    async fn assignee_summary_rolls_up_completion() {
        let mut service = service();
        let a = service.create(new_task("EMP001"), &admin()).await.unwrap();
        service.create(new_task("EMP001"), &admin()).await.unwrap();
        service.create(new_task("EMP002"), &admin()).await.unwrap();

        let worker = employee("EMP001", None);
        service.set_progress(&a.id, 100, &worker).await.unwrap();

        let summary = service.assignee_summary(&admin()).unwrap();
        let emp1 = summary
            .iter()
            .find(|entry| entry.assigned_to == "EMP001")
            .unwrap();
        assert_eq!(emp1.total, 2);
        assert_eq!(emp1.completed, 1);
        assert_eq!(emp1.completion_rate, 50);

        let err = service.assignee_summary(&worker).unwrap_err();
        assert!(matches!(err, Error::Permission(_)));
    }

    /// Delegates to memory storage until told to fail
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: std::sync::atomic::AtomicBool,
    }

    impl FlakyStorage {
        fn new() -> Self {
            Self {
                inner: MemoryStorage::new(),
                failing: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing
                .store(failing, std::sync::atomic::Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Error::Storage("backend offline".to_string()));
            }
            Ok(())
        }
    }

    impl crate::storage::Storage for FlakyStorage {
        async fn list_tasks(&self) -> Result<Vec<Task>> {
            self.check()?;
            self.inner.list_tasks().await
        }

        async fn list_comments(&self) -> Result<Vec<Comment>> {
            self.check()?;
            self.inner.list_comments().await
        }

        async fn insert_task(&self, task: &Task) -> Result<()> {
            self.check()?;
            self.inner.insert_task(task).await
        }

        async fn update_task(&self, task: &Task) -> Result<()> {
            self.check()?;
            self.inner.update_task(task).await
        }

        async fn delete_task(&self, task_id: &str) -> Result<()> {
            self.check()?;
            self.inner.delete_task(task_id).await
        }

        async fn insert_comment(&self, comment: &Comment) -> Result<()> {
            self.check()?;
            self.inner.insert_comment(comment).await
        }
    }

    #[tokio::test]
    async fn storage_failure_keeps_last_known_snapshot() {
        let mut service = TaskService::new(FlakyStorage::new());
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        service.storage.set_failing(true);

        let err = service.refresh().await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(service.tasks().len(), 1);

        // A failed mutation leaves the snapshot untouched too
        let worker = employee("EMP001", None);
        let err = service.set_progress(&task.id, 40, &worker).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(service.get(&task.id).unwrap().progress, 0);

        service.storage.set_failing(false);
        service.set_progress(&task.id, 40, &worker).await.unwrap();
        assert_eq!(service.get(&task.id).unwrap().progress, 40);
    }

    #[tokio::test]
    async fn mutations_notify_success() {
        use crate::notify::testing::RecordingNotifier;
        use std::sync::Arc;

        let recorder = Arc::new(RecordingNotifier::default());
        let mut service =
            TaskService::with_notifier(MemoryStorage::new(), Box::new(recorder.clone()));

        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();
        service
            .set_progress(&task.id, 100, &employee("EMP001", None))
            .await
            .unwrap();

        let messages = recorder.messages.lock().unwrap();
        assert_eq!(
            *messages,
            vec![
                (NotifyKind::Success, "Task created successfully".to_string()),
                (NotifyKind::Success, "Progress updated".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn full_assignment_scenario() {
        // Admin creates, employee progresses to completion, progress edits
        // after completion do not regress the status.
        let mut service = service();
        let task = service.create(new_task("EMP001"), &admin()).await.unwrap();

        let p2 = employee("EMP001", None);
        let visible = service.list_for(&p2, None);
        assert!(visible.iter().any(|candidate| candidate.id == task.id));

        service.set_progress(&task.id, 50, &p2).await.unwrap();
        assert_eq!(service.get(&task.id).unwrap().status, TaskStatus::InProgress);

        service.set_progress(&task.id, 100, &p2).await.unwrap();
        let current = service.get(&task.id).unwrap();
        assert_eq!(current.status, TaskStatus::Completed);
        assert!(current.completed_at.is_some());

        service.set_progress(&task.id, 60, &p2).await.unwrap();
        let current = service.get(&task.id).unwrap();
        assert_eq!(current.progress, 60);
        assert_eq!(current.status, TaskStatus::Completed);
    }
}
