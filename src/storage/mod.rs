//! Persistence of task records.
//!
//! The pipeline only decides whether and when to persist; how records are laid
//! out is up to the [`RecordStore`]. [`FileStore`] keeps everything as pretty
//! JSON under the task's directory:
//!
//! ```text
//! <task dir>/task.json
//! <task dir>/runs/<run id>/task_run.json
//! <task dir>/fine_tunes/<fine-tune id>/finetune.json
//! ```

mod file_store;

pub use file_store::{FileStore, FINETUNE_FILE, RUN_FILE, TASK_FILE};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::datamodel::{Finetune, Task, TaskRun};

/// Errors that can occur during record storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The owning task has no durable location.
    #[error("Task '{0}' has no path to save to")]
    MissingLocation(String),

    /// The record has no id to derive its location from.
    #[error("{0} has no id")]
    MissingId(&'static str),

    /// The record id cannot be used as a single path component.
    #[error("Invalid record id '{0}'")]
    InvalidId(String),

    /// A loaded record failed validation.
    #[error("Invalid record at {path}: {message}")]
    InvalidRecord { path: String, message: String },
}

/// Durable storage for task records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Saves a run under its owning task, returning where it was written.
    async fn save_run(&self, task: &Task, run: &TaskRun) -> Result<PathBuf, StorageError>;

    /// Saves a fine-tune under its owning task, returning where it was written.
    async fn save_finetune(&self, task: &Task, finetune: &Finetune)
        -> Result<PathBuf, StorageError>;
}
