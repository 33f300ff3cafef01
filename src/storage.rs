//! Storage collaborator for tasks and comments.
//!
//! The core consumes this contract but does not own the persistence format.
//! Tasks and comments are fetched separately and joined by the store only
//! after both calls return. Two backends ship here:
//!
//! - [`JsonStorage`]: a data directory holding `tasks.json` (atomic
//!   temp+rename writes behind a lock file) and `comments.jsonl` (append).
//! - [`MemoryStorage`]: an in-process backend for tests and embedding.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::{Comment, Task};

const TASKS_FILE: &str = "tasks.json";
const COMMENTS_FILE: &str = "comments.jsonl";

/// Async storage contract the task service is built against.
///
/// Every call may fail with a transport error; the service translates those
/// into `Error::Storage` and keeps its last-known-good snapshot.
pub trait Storage: Send + Sync {
    fn list_tasks(&self) -> impl std::future::Future<Output = Result<Vec<Task>>> + Send;
    fn list_comments(&self) -> impl std::future::Future<Output = Result<Vec<Comment>>> + Send;
    fn insert_task(&self, task: &Task) -> impl std::future::Future<Output = Result<()>> + Send;
    fn update_task(&self, task: &Task) -> impl std::future::Future<Output = Result<()>> + Send;
    fn delete_task(&self, task_id: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    fn insert_comment(&self, comment: &Comment)
        -> impl std::future::Future<Output = Result<()>> + Send;
}

// =============================================================================
// JSON file backend
// =============================================================================

/// File-backed storage rooted at a data directory
#[derive(Debug, Clone)]
pub struct JsonStorage {
    data_dir: PathBuf,
}

impl JsonStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    fn comments_file(&self) -> PathBuf {
        self.data_dir.join(COMMENTS_FILE)
    }

    fn read_tasks(&self) -> Result<Vec<Task>> {
        let path = self.tasks_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_tasks(&self, tasks: &[Task]) -> Result<()> {
        // Comments travel in their own file; persist tasks without them so
        // the two sources stay independent.
        let stripped: Vec<Task> = tasks
            .iter()
            .map(|task| {
                let mut task = task.clone();
                task.comments = Vec::new();
                task
            })
            .collect();
        let json = serde_json::to_string_pretty(&stripped)?;
        lock::write_atomic(self.tasks_file(), json.as_bytes())
    }

    fn read_comments(&self) -> Result<Vec<Comment>> {
        let path = self.comments_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path)?;
        let mut comments = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            comments.push(serde_json::from_str(line)?);
        }
        Ok(comments)
    }

    fn with_tasks_locked<T>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T>) -> Result<T> {
        let lock_path = self.tasks_file().with_extension("json.lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut tasks = self.read_tasks()?;
        let result = f(&mut tasks)?;
        self.write_tasks(&tasks)?;
        Ok(result)
    }
}

impl Storage for JsonStorage {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.read_tasks()
    }

    async fn list_comments(&self) -> Result<Vec<Comment>> {
        self.read_comments()
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        self.with_tasks_locked(|tasks| {
            if tasks.iter().any(|existing| existing.id == task.id) {
                return Err(Error::Storage(format!("task already exists: {}", task.id)));
            }
            tasks.push(task.clone());
            Ok(())
        })
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        self.with_tasks_locked(|tasks| {
            let slot = tasks
                .iter_mut()
                .find(|existing| existing.id == task.id)
                .ok_or_else(|| Error::Storage(format!("task missing in storage: {}", task.id)))?;
            *slot = task.clone();
            Ok(())
        })
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.with_tasks_locked(|tasks| {
            tasks.retain(|task| task.id != task_id);
            Ok(())
        })?;

        // Drop the task's comments as well; rewrite under the same pattern.
        let lock_path = self.comments_file().with_extension("jsonl.lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;
        let remaining: Vec<Comment> = self
            .read_comments()?
            .into_iter()
            .filter(|comment| comment.task_id != task_id)
            .collect();
        let mut buffer = Vec::new();
        for comment in &remaining {
            let json = serde_json::to_string(comment)?;
            buffer.extend_from_slice(json.as_bytes());
            buffer.push(b'\n');
        }
        lock::write_atomic(self.comments_file(), &buffer)
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        let path = self.comments_file();
        let lock_path = path.with_extension("jsonl.lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(comment)?;
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        writeln!(file, "{json}")?;
        file.sync_all()?;
        Ok(())
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// In-process storage used by unit tests and embedders
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tasks: Mutex<Vec<Task>>,
    comments: Mutex<Vec<Comment>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with existing records
    pub fn with_records(tasks: Vec<Task>, comments: Vec<Comment>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            comments: Mutex::new(comments),
        }
    }
}

impl Storage for MemoryStorage {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn list_comments(&self) -> Result<Vec<Comment>> {
        Ok(self.comments.lock().unwrap().clone())
    }

    async fn insert_task(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.iter().any(|existing| existing.id == task.id) {
            return Err(Error::Storage(format!("task already exists: {}", task.id)));
        }
        tasks.push(task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let slot = tasks
            .iter_mut()
            .find(|existing| existing.id == task.id)
            .ok_or_else(|| Error::Storage(format!("task missing in storage: {}", task.id)))?;
        *slot = task.clone();
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> Result<()> {
        self.tasks.lock().unwrap().retain(|task| task.id != task_id);
        self.comments
            .lock()
            .unwrap()
            .retain(|comment| comment.task_id != task_id);
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        self.comments.lock().unwrap().push(comment.clone());
        Ok(())
    }
}
