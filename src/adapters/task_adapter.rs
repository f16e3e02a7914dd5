//! The task execution pipeline.
//!
//! One invocation runs six gates in order, any of which aborts the run:
//!
//! 1. Input validation against the task's input schema
//! 2. Model invocation under the selected [`RunStrategy`]
//! 3. Parsing with the provider's output parser
//! 4. Output validation against the task's output schema
//! 5. Construction of the [`TaskRun`] record
//! 6. Persistence, when saving is enabled and the task has a path
//!
//! Only the last step has side effects. Nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::catalog::{ModelProvider, ProviderCatalog};
use crate::config::{AdapterConfig, RuntimeConfig};
use crate::datamodel::json_schema::{parse_schema, validate_value};
use crate::datamodel::{DataSource, Task, TaskInput, TaskOutput, TaskRun};
use crate::error::{AdapterError, AdapterResult, ValidationError};
use crate::llm::{Message, OutputFormat};
use crate::prompts::{PromptBuilder, PromptId};
use crate::storage::RecordStore;

use super::invoker::{InvocationRequest, ModelInvoker};
use super::parsers::parser_for;
use super::run_output::{ParsedOutput, RunOutput};
use super::run_strategy::RunStrategy;

/// What to run: the task, the model and provider, and the prompt.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub task: Arc<Task>,
    pub model_name: String,
    pub model_provider_name: String,
    pub prompt_id: PromptId,
}

impl RunConfig {
    pub fn new(
        task: Arc<Task>,
        model_name: impl Into<String>,
        model_provider_name: impl Into<String>,
        prompt_id: PromptId,
    ) -> Self {
        Self {
            task,
            model_name: model_name.into(),
            model_provider_name: model_provider_name.into(),
            prompt_id,
        }
    }
}

/// Runs a task against one model provider and records the result.
///
/// The provider entry and the prompt builder are resolved once, at
/// construction; a run never re-resolves them.
pub struct TaskAdapter {
    run_config: RunConfig,
    prompt_builder: PromptBuilder,
    provider: ModelProvider,
    invoker: Arc<dyn ModelInvoker>,
    runtime: RuntimeConfig,
    config: AdapterConfig,
    store: Option<Arc<dyn RecordStore>>,
    default_tags: Vec<String>,
}

impl TaskAdapter {
    pub fn new(
        run_config: RunConfig,
        invoker: Arc<dyn ModelInvoker>,
        catalog: &dyn ProviderCatalog,
        runtime: RuntimeConfig,
    ) -> AdapterResult<Self> {
        let unknown = || AdapterError::UnknownProvider {
            model: run_config.model_name.clone(),
            provider: run_config.model_provider_name.clone(),
        };
        if run_config.model_name.is_empty() || run_config.model_provider_name.is_empty() {
            return Err(unknown());
        }
        let provider = catalog
            .find_provider(&run_config.model_name, &run_config.model_provider_name)
            .ok_or_else(unknown)?;

        let prompt_builder =
            PromptBuilder::from_prompt_id(&run_config.prompt_id, run_config.task.clone())?;

        Ok(Self {
            run_config,
            prompt_builder,
            provider,
            invoker,
            runtime,
            config: AdapterConfig::default(),
            store: None,
            default_tags: Vec::new(),
        })
    }

    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn task(&self) -> &Task {
        &self.run_config.task
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    pub fn provider(&self) -> &ModelProvider {
        &self.provider
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompt_builder
    }

    pub fn has_structured_output(&self) -> bool {
        self.task().output_schema().is_some()
    }

    /// System prompt; carries the schema in the text only for providers whose
    /// structured output mode relies on instructions.
    pub fn build_prompt(&self) -> String {
        let include_json_instructions = self.has_structured_output()
            && self.provider.structured_output_mode.needs_json_instructions();
        self.prompt_builder.build_prompt(include_json_instructions)
    }

    pub fn run_strategy(&self) -> RunStrategy {
        RunStrategy::select(
            self.prompt_builder.chain_of_thought_prompt(),
            self.provider.reasoning_capable,
        )
    }

    /// Runs the task and returns the recorded run.
    pub async fn invoke(
        &self,
        input: TaskInput,
        input_source: Option<DataSource>,
    ) -> AdapterResult<TaskRun> {
        let (run, _) = self.invoke_returning_run_output(input, input_source).await?;
        Ok(run)
    }

    /// Runs the task and returns the final output alone: the parsed JSON
    /// object for structured tasks, the text otherwise.
    pub async fn invoke_returning_raw(
        &self,
        input: TaskInput,
        input_source: Option<DataSource>,
    ) -> AdapterResult<Value> {
        let run = self.invoke(input, input_source).await?;
        if self.has_structured_output() {
            let value = serde_json::from_str(&run.output().output)
                .map_err(|e| ValidationError::TypeMismatch(e.to_string()))?;
            Ok(value)
        } else {
            Ok(Value::String(run.output().output.clone()))
        }
    }

    /// Runs the task and returns both the recorded run and the invoker's output.
    pub async fn invoke_returning_run_output(
        &self,
        input: TaskInput,
        input_source: Option<DataSource>,
    ) -> AdapterResult<(TaskRun, RunOutput)> {
        self.validate_input(&input)?;

        let strategy = self.run_strategy();
        let request = InvocationRequest {
            model_id: self
                .provider
                .model_id
                .clone()
                .unwrap_or_else(|| self.run_config.model_name.clone()),
            messages: vec![
                Message::system(self.build_prompt()),
                Message::user(self.prompt_builder.build_user_message(&input)),
            ],
            strategy: strategy.clone(),
            output_format: self.output_format()?,
            top_logprobs: self.config.top_logprobs,
        };

        info!(
            task_id = %self.task().id(),
            model = %self.run_config.model_name,
            provider = %self.run_config.model_provider_name,
            strategy = %strategy,
            "Invoking model"
        );
        let raw = self.invoker.invoke(request).await?;
        debug!(fragments = raw.intermediate_outputs.len(), "Model invocation finished");

        let parser = parser_for(self.provider.parser);
        let parsed = parser.parse(raw.clone(), self.has_structured_output())?;
        self.validate_output(&parsed)?;

        let mut run = self.generate_run(&input, input_source, parsed)?;
        self.persist(&mut run).await?;

        Ok((run, raw))
    }

    fn validate_input(&self, input: &TaskInput) -> Result<(), ValidationError> {
        let Some(schema) = self.task().input_schema() else {
            return Ok(());
        };
        match input {
            TaskInput::Structured(map) => {
                validate_value(&Value::Object(map.clone()), schema, "Task input")
            }
            TaskInput::Text(_) => Err(ValidationError::TypeMismatch(
                "structured input is not an object".to_string(),
            )),
        }
    }

    fn output_format(&self) -> Result<Option<OutputFormat>, ValidationError> {
        self.task()
            .output_schema()
            .map(|schema| {
                Ok(OutputFormat {
                    mode: self.provider.structured_output_mode,
                    schema: parse_schema(schema)?,
                })
            })
            .transpose()
    }

    fn validate_output(&self, parsed: &ParsedOutput) -> Result<(), ValidationError> {
        match (self.task().output_schema(), &parsed.output) {
            (Some(schema), Value::Object(_)) => validate_value(&parsed.output, schema, "Task output"),
            (Some(_), other) => Err(ValidationError::TypeMismatch(format!(
                "structured response is not an object: {}",
                other
            ))),
            (None, Value::String(_)) => Ok(()),
            (None, other) => Err(ValidationError::TypeMismatch(format!(
                "response is not a string for non-structured task: {}",
                other
            ))),
        }
    }

    fn generate_run(
        &self,
        input: &TaskInput,
        input_source: Option<DataSource>,
        parsed: ParsedOutput,
    ) -> Result<TaskRun, ValidationError> {
        let output = match parsed.output {
            Value::String(text) => text,
            other => other.to_string(),
        };

        let input_source = match input_source {
            Some(source) => source,
            None => DataSource::human(self.runtime.user_id.clone())?,
        };
        let output_source = DataSource::synthetic(
            self.invoker.adapter_name(),
            self.run_config.model_name.clone(),
            self.run_config.model_provider_name.clone(),
            self.run_config.prompt_id.to_string(),
        )?;

        TaskRun::builder(
            input.to_stored_string(),
            input_source,
            TaskOutput::new(output, output_source),
        )
        .intermediate_outputs(parsed.intermediate_outputs)
        .tags(self.default_tags.iter().cloned())
        .build(self.task())
    }

    async fn persist(&self, run: &mut TaskRun) -> AdapterResult<()> {
        let store = self.store.as_ref().filter(|_| {
            self.config.allow_saving && self.runtime.autosave_runs && self.task().path().is_some()
        });

        match store {
            Some(store) => {
                let path = store.save_run(self.task(), run).await?;
                info!(run_id = ?run.id(), path = %path.display(), "Saved task run");
            }
            None => {
                run.mark_transient();
                debug!("Task run not saved");
            }
        }
        Ok(())
    }
}
