//! JSON file storage rooted at each task's directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::datamodel::{Finetune, Task, TaskRun};

use super::{RecordStore, StorageError};

pub const TASK_FILE: &str = "task.json";
pub const RUN_FILE: &str = "task_run.json";
pub const FINETUNE_FILE: &str = "finetune.json";

/// Stores records as pretty JSON files under the task's path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    /// Writes the task definition to `<task dir>/task.json`.
    pub async fn save_task(&self, task: &Task) -> Result<PathBuf, StorageError> {
        let dir = task_dir(task)?;
        write_json(&dir.join(TASK_FILE), task).await
    }

    /// Loads a task from its directory, including every run saved under `runs/`.
    ///
    /// The task itself is validated first (schemas, requirement ids and embedded
    /// runs). Runs already embedded in `task.json` are kept; saved runs with the
    /// same id are skipped. Every loaded run is validated against the task.
    pub async fn load_task(&self, dir: impl AsRef<Path>) -> Result<Task, StorageError> {
        let dir = dir.as_ref();
        let task_path = dir.join(TASK_FILE);
        let content = fs::read_to_string(&task_path).await?;
        let mut task: Task = serde_json::from_str(&content)?;
        task = task.with_path(dir);
        task.validate().map_err(|e| StorageError::InvalidRecord {
            path: task_path.display().to_string(),
            message: e.to_string(),
        })?;

        let runs_dir = dir.join("runs");
        if !fs::try_exists(&runs_dir).await? {
            return Ok(task);
        }

        let mut run_paths = Vec::new();
        let mut entries = fs::read_dir(&runs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path().join(RUN_FILE);
            if fs::try_exists(&path).await? {
                run_paths.push(path);
            }
        }
        // directory iteration order is unspecified; history order is by creation time
        let mut runs = Vec::with_capacity(run_paths.len());
        for path in run_paths {
            let content = fs::read_to_string(&path).await?;
            let run: TaskRun = serde_json::from_str(&content)?;
            runs.push((path, run));
        }
        runs.sort_by_key(|(_, run)| run.created_at());

        for (path, run) in runs {
            if task.runs().iter().any(|r| r.id().is_some() && r.id() == run.id()) {
                continue;
            }
            task.add_run(run).map_err(|e| StorageError::InvalidRecord {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        debug!(task_id = %task.id(), runs = task.runs().len(), "Loaded task");
        Ok(task)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn save_run(&self, task: &Task, run: &TaskRun) -> Result<PathBuf, StorageError> {
        let id = run.id().ok_or(StorageError::MissingId("Task run"))?;
        check_id(id)?;
        let path = task_dir(task)?.join("runs").join(id).join(RUN_FILE);
        write_json(&path, run).await
    }

    async fn save_finetune(
        &self,
        task: &Task,
        finetune: &Finetune,
    ) -> Result<PathBuf, StorageError> {
        if finetune.id.is_empty() {
            return Err(StorageError::MissingId("Fine-tune"));
        }
        check_id(&finetune.id)?;
        let path = task_dir(task)?
            .join("fine_tunes")
            .join(&finetune.id)
            .join(FINETUNE_FILE);
        write_json(&path, finetune).await
    }
}

fn task_dir(task: &Task) -> Result<PathBuf, StorageError> {
    task.path()
        .map(Path::to_path_buf)
        .ok_or_else(|| StorageError::MissingLocation(task.id().to_string()))
}

/// Ids become directory names, so they must stay a single normal component.
fn check_id(id: &str) -> Result<(), StorageError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf, StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).await?;
    debug!(path = %path.display(), "Saved record");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{DataSource, TaskOutput, TaskRequirement};
    use chrono::{Duration, Utc};

    fn human() -> DataSource {
        DataSource::human("tester").unwrap()
    }

    fn run(task: &Task, input: &str, offset_secs: i64) -> TaskRun {
        TaskRun::builder(input, human(), TaskOutput::new("out", human()))
            .created_at(Utc::now() + Duration::seconds(offset_secs))
            .build(task)
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load_runs() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task::new("T", "Do it").with_path(dir.path());
        let store = FileStore::new();

        store.save_task(&task).await.unwrap();
        let second = run(&task, "second", 10);
        let first = run(&task, "first", 0);
        let path = store.save_run(&task, &second).await.unwrap();
        store.save_run(&task, &first).await.unwrap();

        assert!(path.ends_with(format!("runs/{}/task_run.json", second.id().unwrap())));

        let loaded = store.load_task(dir.path()).await.unwrap();
        assert_eq!(loaded.id(), task.id());
        assert_eq!(loaded.path(), Some(dir.path()));
        let inputs: Vec<&str> = loaded.runs().iter().map(|r| r.input()).collect();
        assert_eq!(inputs, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_save_requires_location_and_id() {
        let task = Task::new("T", "Do it");
        let store = FileStore::new();
        let mut r = run(&task, "x", 0);

        assert!(matches!(
            store.save_run(&task, &r).await,
            Err(StorageError::MissingLocation(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let task = task.with_path(dir.path());
        r.mark_transient();
        assert!(matches!(
            store.save_run(&task, &r).await,
            Err(StorageError::MissingId(_))
        ));
    }

    #[tokio::test]
    async fn test_save_rejects_ids_outside_task_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("task");
        let task = Task::new("T", "Do it").with_path(&dir);
        let store = FileStore::new();

        for bad_id in ["../../x", "a/b", "a\\b", "..", "."] {
            let mut value = serde_json::to_value(run(&task, "x", 0)).unwrap();
            value["id"] = serde_json::json!(bad_id);
            let r: TaskRun = serde_json::from_value(value).unwrap();
            assert!(
                matches!(store.save_run(&task, &r).await, Err(StorageError::InvalidId(_))),
                "id {bad_id:?} accepted"
            );
        }
        assert!(!root.path().join("x").exists());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_task_file() {
        let store = FileStore::new();
        let task = Task::new("T", "Do it")
            .with_requirement(TaskRequirement::new("Funny", "Be funny").with_id("r1"))
            .unwrap();
        let base = serde_json::to_value(&task).unwrap();

        let mut bad_schema = base.clone();
        bad_schema["output_json_schema"] = serde_json::json!(r#"{"type": 12}"#);

        let mut duplicate_requirements = base.clone();
        let requirement = base["requirements"][0].clone();
        duplicate_requirements["requirements"] = serde_json::json!([requirement.clone(), requirement]);

        let mut unknown_rating = base.clone();
        let mut embedded = serde_json::to_value(run(&task, "x", 0)).unwrap();
        embedded["output"]["rating"] = serde_json::json!({
            "type": "five_star",
            "value": 3.0,
            "requirement_ratings": {"nope": 3.0}
        });
        unknown_rating["runs"] = serde_json::json!([embedded]);

        let mut unpaired_repair = base.clone();
        let mut embedded = serde_json::to_value(run(&task, "x", 0)).unwrap();
        embedded["repaired_output"] = serde_json::to_value(TaskOutput::new("fixed", human())).unwrap();
        embedded["repair_instructions"] = serde_json::Value::Null;
        unpaired_repair["runs"] = serde_json::json!([embedded]);

        for value in [bad_schema, duplicate_requirements, unknown_rating, unpaired_repair] {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join(TASK_FILE), value.to_string()).unwrap();
            match store.load_task(dir.path()).await {
                Err(StorageError::InvalidRecord { path, .. }) => assert!(path.ends_with(TASK_FILE)),
                other => panic!("expected InvalidRecord, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_load_missing_task() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FileStore::new().load_task(dir.path()).await,
            Err(StorageError::Io(_))
        ));
    }
}
