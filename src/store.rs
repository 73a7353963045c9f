//! Task persistence.
//!
//! `TaskStore` is the contract the engine needs from a persistence service: list,
//! create, partially update and delete tasks by id. `JsonStore` implements it over a
//! single JSON file per project, written atomically.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::task::{NewTask, Task, TaskId, TaskPatch};

/// Persistence service for tasks.
///
/// Calls are synchronous; a caller sequencing several operations observes each one's
/// effect before issuing the next.
pub trait TaskStore {
    /// All tasks in creation order.
    fn load(&self) -> Result<Vec<Task>, StoreError>;

    /// Store a new task and return the id assigned to it.
    fn insert(&mut self, task: NewTask) -> Result<TaskId, StoreError>;

    /// Apply `patch` to the task with `id`.
    fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), StoreError>;

    /// Remove the task with `id`. Other tasks are left untouched.
    fn delete(&mut self, id: TaskId) -> Result<(), StoreError>;

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }

    fn children(&self, parent: TaskId) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|t| t.parent == Some(parent))
            .collect())
    }
}

/// On-disk document for one project.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub next_id: TaskId,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Database {
    /// The id the next insert will receive; never below any stored id.
    fn allocate_id(&mut self) -> TaskId {
        let floor = self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }

    fn position(&self, id: TaskId) -> Result<usize, StoreError> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::UnknownTask(id))
    }
}

/// A `TaskStore` backed by a JSON file (or by memory only, for scratch use and tests).
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    db: Database,
}

impl JsonStore {
    /// Open the file at `path`. A missing file is an empty project.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = if path.exists() {
            let buf = fs::read_to_string(path).map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&buf).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Database::default()
        };
        debug!(path = %path.display(), tasks = db.tasks.len(), "opened task store");
        Ok(JsonStore { path: Some(path.to_path_buf()), db })
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        JsonStore { path: None, db: Database::default() }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist `db` and only then make it the current state.
    fn commit(&mut self, db: Database) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            save(&db, path)?;
        }
        self.db = db;
        Ok(())
    }
}

/// Write the database via temp file + rename.
fn save(db: &Database, path: &Path) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io { path: path.to_path_buf(), source };
    let data = serde_json::to_string_pretty(db)?;
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp).map_err(io_err)?;
    f.write_all(data.as_bytes()).map_err(io_err)?;
    f.flush().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

impl TaskStore for JsonStore {
    fn load(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.db.tasks.clone())
    }

    fn insert(&mut self, task: NewTask) -> Result<TaskId, StoreError> {
        let mut db = self.db.clone();
        let id = db.allocate_id();
        db.tasks.push(task.into_task(id, Utc::now().timestamp()));
        self.commit(db)?;
        Ok(id)
    }

    fn update(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        let mut db = self.db.clone();
        let i = db.position(id)?;
        let task = &mut db.tasks[i];
        patch.apply_to(task);
        task.updated_at_utc = Utc::now().timestamp();
        self.commit(db)
    }

    fn delete(&mut self, id: TaskId) -> Result<(), StoreError> {
        let mut db = self.db.clone();
        let i = db.position(id)?;
        db.tasks.remove(i);
        self.commit(db)
    }

    fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.db.tasks.iter().find(|t| t.id == id).cloned())
    }
}
