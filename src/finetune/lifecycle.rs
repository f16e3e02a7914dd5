//! Starting fine-tune jobs against external training services.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::ProviderCatalog;
use crate::datamodel::{
    DatasetSplit, Finetune, FinetuneDataStrategy, FinetuneStatusType, ParameterValue, Task,
};
use crate::error::FinetuneError;
use crate::storage::RecordStore;

use super::parameters::{validate_parameters, FinetuneParameter};

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "cosmic", "crimson", "eager", "gentle", "golden",
    "humble", "jolly", "lively", "lucky", "mellow", "nimble", "quiet", "rapid", "silver", "sunny",
];

const NOUNS: &[&str] = &[
    "badger", "comet", "falcon", "fern", "glacier", "harbor", "heron", "lantern", "maple", "meadow",
    "otter", "pebble", "quartz", "river", "sparrow", "summit", "thistle", "tiger", "willow", "zephyr",
];

/// Job status with a message suitable for showing to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinetuneStatus {
    pub status: FinetuneStatusType,
    #[serde(default)]
    pub message: Option<String>,
}

impl FinetuneStatus {
    pub fn new(status: FinetuneStatusType) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A fine-tuning service.
#[async_trait]
pub trait FinetuneAdapter: Send + Sync {
    /// Parameters this service accepts.
    fn available_parameters(&self) -> Vec<FinetuneParameter>;

    /// Launches the job. Implementations record the provider's job id on
    /// `finetune` and may update its status.
    async fn start(
        &self,
        finetune: &mut Finetune,
        dataset: &DatasetSplit,
    ) -> Result<(), FinetuneError>;

    async fn status(&self, finetune: &Finetune) -> Result<FinetuneStatus, FinetuneError>;
}

/// What to fine-tune, before any check has run.
#[derive(Debug, Clone)]
pub struct FinetuneRequest {
    pub provider: String,
    pub base_model_id: String,
    pub train_split_name: String,
    pub validation_split_name: Option<String>,
    pub system_message: String,
    pub thinking_instructions: Option<String>,
    pub data_strategy: FinetuneDataStrategy,
    pub parameters: BTreeMap<String, ParameterValue>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl FinetuneRequest {
    pub fn new(
        provider: impl Into<String>,
        base_model_id: impl Into<String>,
        train_split_name: impl Into<String>,
        system_message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_model_id: base_model_id.into(),
            train_split_name: train_split_name.into(),
            validation_split_name: None,
            system_message: system_message.into(),
            thinking_instructions: None,
            data_strategy: FinetuneDataStrategy::default(),
            parameters: BTreeMap::new(),
            name: None,
            description: None,
        }
    }

    pub fn with_validation_split(mut self, split: impl Into<String>) -> Self {
        self.validation_split_name = Some(split.into());
        self
    }

    pub fn with_thinking_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.thinking_instructions = Some(instructions.into());
        self
    }

    pub fn with_data_strategy(mut self, strategy: FinetuneDataStrategy) -> Self {
        self.data_strategy = strategy;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Fails with [`FinetuneError::UnknownModel`] unless the catalog lists the
/// provider with this fine-tunable base model.
pub fn check_valid_provider_model(
    catalog: &dyn ProviderCatalog,
    provider: &str,
    base_model_id: &str,
) -> Result<(), FinetuneError> {
    if catalog.is_valid_finetune_pair(provider, base_model_id) {
        Ok(())
    } else {
        Err(FinetuneError::UnknownModel {
            provider: provider.to_string(),
            base_model: base_model_id.to_string(),
        })
    }
}

/// Two random words, e.g. `calm otter`.
pub fn generate_memorable_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("quiet");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("river");
    format!("{} {}", adjective, noun)
}

/// Validates the request, starts the job and saves the fine-tune record.
///
/// Every check runs before the service is contacted. The record is only
/// saved once the job has started.
pub async fn create_and_start(
    adapter: &dyn FinetuneAdapter,
    catalog: &dyn ProviderCatalog,
    store: &dyn RecordStore,
    task: &Task,
    dataset: &DatasetSplit,
    request: FinetuneRequest,
) -> Result<Finetune, FinetuneError> {
    check_valid_provider_model(catalog, &request.provider, &request.base_model_id)?;

    let dataset_split_id = dataset
        .id
        .clone()
        .ok_or_else(|| FinetuneError::InvalidRequest("Dataset must have an id".to_string()))?;

    if !dataset.has_split(&request.train_split_name) {
        return Err(FinetuneError::InvalidRequest(format!(
            "Train split {} not found in dataset",
            request.train_split_name
        )));
    }
    if let Some(validation) = &request.validation_split_name {
        if !dataset.has_split(validation) {
            return Err(FinetuneError::InvalidRequest(format!(
                "Validation split {} not found in dataset",
                validation
            )));
        }
    }

    validate_parameters(&adapter.available_parameters(), &request.parameters)?;

    if task.path().is_none() {
        return Err(FinetuneError::InvalidRequest(
            "Dataset must have a parent task with a path".to_string(),
        ));
    }

    let mut finetune = Finetune {
        id: crate::datamodel::task::new_id(),
        name: request.name.unwrap_or_else(generate_memorable_name),
        description: request.description,
        provider: request.provider,
        base_model_id: request.base_model_id,
        provider_job_id: None,
        dataset_split_id,
        train_split_name: request.train_split_name,
        validation_split_name: request.validation_split_name,
        parameters: request.parameters,
        system_message: request.system_message,
        thinking_instructions: request.thinking_instructions,
        data_strategy: request.data_strategy,
        status: FinetuneStatusType::Unknown,
        created_at: Utc::now(),
    };

    adapter.start(&mut finetune, dataset).await?;
    let path = store.save_finetune(task, &finetune).await?;

    info!(
        finetune_id = %finetune.id,
        provider = %finetune.provider,
        base_model = %finetune.base_model_id,
        job_id = ?finetune.provider_job_id,
        path = %path.display(),
        "Started fine-tune"
    );

    Ok(finetune)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::finetune::parameters::ParameterType;
    use crate::storage::{FileStore, FINETUNE_FILE};
    use std::sync::Mutex;

    /// Records started jobs instead of calling a service.
    struct MockTrainer {
        started: Mutex<Vec<String>>,
    }

    impl MockTrainer {
        fn new() -> Self {
            Self {
                started: Mutex::new(Vec::new()),
            }
        }

        fn started(&self) -> Vec<String> {
            self.started.lock().expect("lock poisoned").clone()
        }
    }

    #[async_trait]
    impl FinetuneAdapter for MockTrainer {
        fn available_parameters(&self) -> Vec<FinetuneParameter> {
            vec![
                FinetuneParameter::new("epochs", ParameterType::Int, "passes"),
                FinetuneParameter::new("learning_rate", ParameterType::Float, "lr"),
            ]
        }

        async fn start(
            &self,
            finetune: &mut Finetune,
            dataset: &DatasetSplit,
        ) -> Result<(), FinetuneError> {
            self.started
                .lock()
                .expect("lock poisoned")
                .push(dataset.name.clone());
            finetune.provider_job_id = Some("job-123".to_string());
            finetune.status = FinetuneStatusType::Pending;
            Ok(())
        }

        async fn status(&self, finetune: &Finetune) -> Result<FinetuneStatus, FinetuneError> {
            Ok(FinetuneStatus::new(finetune.status).with_message("queued"))
        }
    }

    fn dataset() -> DatasetSplit {
        DatasetSplit::new("jokes-v1")
            .with_split("train", vec!["r1".into(), "r2".into()])
            .with_split("val", vec!["r3".into()])
    }

    fn request() -> FinetuneRequest {
        FinetuneRequest::new("openai", "gpt-4o-mini-2024-07-18", "train", "You are funny.")
    }

    #[tokio::test]
    async fn test_create_and_start_saves_record() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task::new("Jokes", "Tell a joke.").with_path(dir.path());
        let trainer = MockTrainer::new();

        let finetune = create_and_start(
            &trainer,
            &StaticCatalog::builtin(),
            &FileStore::new(),
            &task,
            &dataset(),
            request()
                .with_validation_split("val")
                .with_parameter("learning_rate", ParameterValue::Float(1.0)),
        )
        .await
        .unwrap();

        assert_eq!(trainer.started(), vec!["jokes-v1"]);
        assert_eq!(finetune.provider_job_id.as_deref(), Some("job-123"));
        assert_eq!(finetune.status, FinetuneStatusType::Pending);
        assert_eq!(finetune.name.split(' ').count(), 2);
        assert!(dir
            .path()
            .join("fine_tunes")
            .join(&finetune.id)
            .join(FINETUNE_FILE)
            .exists());

        let status = trainer.status(&finetune).await.unwrap();
        assert_eq!(status.message.as_deref(), Some("queued"));
    }

    #[tokio::test]
    async fn test_checks_run_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task::new("Jokes", "Tell a joke.").with_path(dir.path());
        let trainer = MockTrainer::new();
        let catalog = StaticCatalog::builtin();
        let store = FileStore::new();

        let err = create_and_start(
            &trainer,
            &catalog,
            &store,
            &task,
            &dataset(),
            FinetuneRequest::new("openai", "gpt-2", "train", "s"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FinetuneError::UnknownModel { .. }));

        let err = create_and_start(
            &trainer,
            &catalog,
            &store,
            &task,
            &dataset(),
            FinetuneRequest::new("openai", "gpt-4o-mini-2024-07-18", "test", "s"),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid fine-tune request: Train split test not found in dataset"
        );

        let err = create_and_start(
            &trainer,
            &catalog,
            &store,
            &task,
            &dataset(),
            request().with_parameter("learning_rate", ParameterValue::Int(1)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FinetuneError::TypeMismatch { .. }));

        let mut unnamed = dataset();
        unnamed.id = None;
        let err = create_and_start(&trainer, &catalog, &store, &task, &unnamed, request())
            .await
            .unwrap_err();
        assert!(matches!(err, FinetuneError::InvalidRequest(_)));

        let no_path = Task::new("Jokes", "Tell a joke.");
        let err = create_and_start(&trainer, &catalog, &store, &no_path, &dataset(), request())
            .await
            .unwrap_err();
        assert!(matches!(err, FinetuneError::InvalidRequest(_)));

        assert!(trainer.started().is_empty());
    }

    #[test]
    fn test_explicit_name_kept() {
        let request = request().with_name("my tune");
        assert_eq!(request.name.as_deref(), Some("my tune"));
        assert!(!generate_memorable_name().is_empty());
    }
}
