//! Task runs and their outputs.
//!
//! A [`TaskRun`] is validated against its owning [`Task`] when it is built and
//! again on every mutation. Mutations are applied to a candidate copy and only
//! committed when the candidate passes, so a rejected change leaves the run as
//! it was.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

use super::json_schema::{validate_json_text, validate_value};
use super::rating::TaskOutputRating;
use super::source::DataSource;
use super::task::{new_id, Task};

/// Input handed to a task: free text, or a structured JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskInput {
    Text(String),
    Structured(Map<String, Value>),
}

impl TaskInput {
    /// Converts an arbitrary JSON value; only strings and objects are inputs.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::String(s) => Ok(TaskInput::Text(s)),
            Value::Object(map) => Ok(TaskInput::Structured(map)),
            other => Err(ValidationError::TypeMismatch(format!(
                "input must be a string or an object, got {}",
                other
            ))),
        }
    }

    /// Canonical string form stored on the run.
    pub fn to_stored_string(&self) -> String {
        match self {
            TaskInput::Text(s) => s.clone(),
            TaskInput::Structured(map) => Value::Object(map.clone()).to_string(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, TaskInput::Structured(_))
    }
}

impl From<&str> for TaskInput {
    fn from(value: &str) -> Self {
        TaskInput::Text(value.to_string())
    }
}

impl From<String> for TaskInput {
    fn from(value: String) -> Self {
        TaskInput::Text(value)
    }
}

impl From<Map<String, Value>> for TaskInput {
    fn from(value: Map<String, Value>) -> Self {
        TaskInput::Structured(value)
    }
}

/// One output of a task run, with provenance and an optional rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Output text; structured outputs are stored as serialized JSON.
    pub output: String,
    pub source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<TaskOutputRating>,
}

impl TaskOutput {
    pub fn new(output: impl Into<String>, source: DataSource) -> Self {
        Self {
            output: output.into(),
            source,
            rating: None,
        }
    }

    pub fn with_rating(mut self, rating: TaskOutputRating) -> Self {
        self.rating = Some(rating);
        self
    }

    fn validate(&self, task: &Task, context: &str) -> Result<(), ValidationError> {
        self.source.validate()?;
        if let Some(schema) = task.output_schema() {
            validate_json_text(&self.output, schema, context)?;
        }
        if let Some(rating) = &self.rating {
            rating.validate(task)?;
        }
        Ok(())
    }
}

/// One recorded execution of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRun {
    #[serde(default)]
    id: Option<String>,
    created_at: DateTime<Utc>,
    input: String,
    input_source: DataSource,
    output: TaskOutput,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    intermediate_outputs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repair_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repaired_output: Option<TaskOutput>,
    #[serde(default)]
    tags: BTreeSet<String>,
}

impl TaskRun {
    /// Starts building a run; nothing is validated until [`TaskRunBuilder::build`].
    pub fn builder(
        input: impl Into<String>,
        input_source: DataSource,
        output: TaskOutput,
    ) -> TaskRunBuilder {
        TaskRunBuilder {
            run: TaskRun {
                id: Some(new_id()),
                created_at: Utc::now(),
                input: input.into(),
                input_source,
                output,
                intermediate_outputs: BTreeMap::new(),
                repair_instructions: None,
                repaired_output: None,
                tags: BTreeSet::new(),
            },
        }
    }

    /// Persistence id; `None` for a transient run.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Raw input text, or canonical JSON for structured tasks.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_source(&self) -> &DataSource {
        &self.input_source
    }

    pub fn output(&self) -> &TaskOutput {
        &self.output
    }

    /// Named side outputs such as `chain_of_thought` or `reasoning`.
    pub fn intermediate_outputs(&self) -> &BTreeMap<String, String> {
        &self.intermediate_outputs
    }

    /// Set together with [`TaskRun::repaired_output`] or not at all.
    pub fn repair_instructions(&self) -> Option<&str> {
        self.repair_instructions.as_deref()
    }

    pub fn repaired_output(&self) -> Option<&TaskOutput> {
        self.repaired_output.as_ref()
    }

    /// Tags in sorted order, without duplicates.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Rating value of the primary output, if rated.
    pub fn rating_value(&self) -> Option<f64> {
        self.output.rating.as_ref().and_then(|r| r.value)
    }

    /// Clears the identity marker; a run without an id has not been persisted.
    pub fn mark_transient(&mut self) {
        self.id = None;
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Returns whether the tag was present.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Replaces the input and revalidates against `task`.
    ///
    /// This and the other `set_*`/`clear_*` mutators apply the change to a copy
    /// first. On error the run is left exactly as it was.
    pub fn set_input(&mut self, task: &Task, input: impl Into<String>) -> Result<(), ValidationError> {
        let input = input.into();
        self.apply(task, |run| run.input = input)
    }

    /// Replaces the primary output, rating included.
    pub fn set_output(&mut self, task: &Task, output: TaskOutput) -> Result<(), ValidationError> {
        self.apply(task, |run| run.output = output)
    }

    /// Rates the primary output; `None` removes the rating.
    pub fn set_output_rating(
        &mut self,
        task: &Task,
        rating: Option<TaskOutputRating>,
    ) -> Result<(), ValidationError> {
        self.apply(task, |run| run.output.rating = rating)
    }

    /// Attaches a repair: the corrected output and the instructions behind it.
    pub fn set_repair(
        &mut self,
        task: &Task,
        instructions: impl Into<String>,
        repaired_output: TaskOutput,
    ) -> Result<(), ValidationError> {
        let instructions = instructions.into();
        self.apply(task, |run| {
            run.repair_instructions = Some(instructions);
            run.repaired_output = Some(repaired_output);
        })
    }

    /// Drops both repair fields.
    pub fn clear_repair(&mut self, task: &Task) -> Result<(), ValidationError> {
        self.apply(task, |run| {
            run.repair_instructions = None;
            run.repaired_output = None;
        })
    }

    fn apply(&mut self, task: &Task, change: impl FnOnce(&mut TaskRun)) -> Result<(), ValidationError> {
        let mut candidate = self.clone();
        change(&mut candidate);
        candidate.validate(task)?;
        *self = candidate;
        Ok(())
    }

    /// Validates every cross-referential rule against the owning task.
    pub fn validate(&self, task: &Task) -> Result<(), ValidationError> {
        match (&self.repair_instructions, &self.repaired_output) {
            (Some(_), None) => {
                return Err(ValidationError::invariant(
                    "Repair instructions are set but repaired output is missing",
                ))
            }
            (None, Some(_)) => {
                return Err(ValidationError::invariant(
                    "Repaired output is set but repair instructions are missing",
                ))
            }
            _ => {}
        }

        if let Some(repaired) = &self.repaired_output {
            if repaired.rating.is_some() {
                return Err(ValidationError::invariant(
                    "Repaired output rating must be None. Repaired outputs are assumed to have a perfect rating",
                ));
            }
        }

        self.input_source.validate()?;
        if let Some(schema) = task.input_schema() {
            let value: Value =
                serde_json::from_str(&self.input).map_err(|e| ValidationError::SchemaViolation {
                    context: "Task input".to_string(),
                    message: format!("not valid JSON: {}", e),
                })?;
            validate_value(&value, schema, "Task input")?;
        }

        self.output.validate(task, "Task output")?;
        if let Some(repaired) = &self.repaired_output {
            repaired.validate(task, "Repaired output")?;
        }

        Ok(())
    }
}

/// Builder for [`TaskRun`]; `build` validates against the owning task.
#[derive(Debug, Clone)]
pub struct TaskRunBuilder {
    run: TaskRun,
}

impl TaskRunBuilder {
    /// Overrides the generated id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.run.id = Some(id.into());
        self
    }

    /// Overrides the creation time, which defaults to now.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.run.created_at = created_at;
        self
    }

    pub fn intermediate_outputs(mut self, outputs: BTreeMap<String, String>) -> Self {
        self.run.intermediate_outputs = outputs;
        self
    }

    /// Adds tags to any already set.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Must be paired with [`TaskRunBuilder::repaired_output`].
    pub fn repair_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.run.repair_instructions = Some(instructions.into());
        self
    }

    pub fn repaired_output(mut self, output: TaskOutput) -> Self {
        self.run.repaired_output = Some(output);
        self
    }

    /// Validates the run against `task` and returns it.
    pub fn build(self, task: &Task) -> Result<TaskRun, ValidationError> {
        self.run.validate(task)?;
        Ok(self.run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{RatingType, TaskRequirement};

    const PERSON_SCHEMA: &str = r#"{
        "type": "object",
        "properties": {"name": {"type": "string"}, "age": {"type": "integer"}},
        "required": ["name", "age"]
    }"#;

    fn human() -> DataSource {
        DataSource::human("john_doe").unwrap()
    }

    fn plain_task() -> Task {
        Task::new("Plain", "Say something")
            .with_requirement(TaskRequirement::new("Polite", "Be polite").with_id("req-1"))
            .unwrap()
            .with_requirement(TaskRequirement::new("Brief", "Be brief").with_id("req-2"))
            .unwrap()
    }

    fn structured_task() -> Task {
        Task::new("Person", "Describe a person")
            .with_output_schema(PERSON_SCHEMA)
            .unwrap()
    }

    #[test]
    fn test_build_valid_run() {
        let task = plain_task();
        let run = TaskRun::builder("hello", human(), TaskOutput::new("hi there", human()))
            .tags(["b", "a", "b"])
            .build(&task)
            .unwrap();

        assert!(run.id().is_some());
        assert_eq!(run.input(), "hello");
        assert_eq!(run.output().output, "hi there");
        assert_eq!(run.tags().iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_rating_keys_must_reference_requirements() {
        let task = plain_task();
        let rated = TaskOutput::new("ok", human()).with_rating(
            TaskOutputRating::five_star(4.0)
                .with_requirement_rating("req-1", 5.0)
                .with_requirement_rating("req-2", 4.0),
        );
        assert!(TaskRun::builder("in", human(), rated).build(&task).is_ok());

        let bad = TaskOutput::new("ok", human())
            .with_rating(TaskOutputRating::five_star(4.0).with_requirement_rating("unknown_id", 5.0));
        let err = TaskRun::builder("in", human(), bad).build(&task).unwrap_err();
        assert!(matches!(err, ValidationError::InvariantViolation(_)));
    }

    #[test]
    fn test_repair_fields_must_pair() {
        let task = plain_task();

        let err = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .repaired_output(TaskOutput::new("fixed", human()))
            .build(&task)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvariantViolation(_)));

        let err = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .repair_instructions("Fix it")
            .build(&task)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvariantViolation(_)));

        let run = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .repair_instructions("Fix it")
            .repaired_output(TaskOutput::new("fixed", human()))
            .build(&task)
            .unwrap();
        assert_eq!(run.repair_instructions(), Some("Fix it"));
    }

    #[test]
    fn test_repaired_output_cannot_be_rated() {
        let task = plain_task();
        let err = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .repair_instructions("Fix it")
            .repaired_output(
                TaskOutput::new("fixed", human())
                    .with_rating(TaskOutputRating::new(RatingType::FiveStar, 5.0)),
            )
            .build(&task)
            .unwrap_err();
        assert!(err.to_string().contains("Repaired output rating must be None"));
    }

    #[test]
    fn test_output_schema_roundtrip_and_mutation() {
        let task = structured_task();
        let mut run = TaskRun::builder(
            "Generate info for John Doe",
            human(),
            TaskOutput::new(r#"{"name": "John Doe", "age": 30}"#, human()),
        )
        .build(&task)
        .unwrap();

        // re-validating the same content never fails
        assert!(run.validate(&task).is_ok());
        assert!(run.validate(&task).is_ok());

        let err = run
            .set_output(
                &task,
                TaskOutput::new(r#"{"name": "John Doe", "age": "thirty"}"#, human()),
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::SchemaViolation { .. }));
        // rejected mutation leaves the run untouched
        assert_eq!(run.output().output, r#"{"name": "John Doe", "age": 30}"#);
    }

    #[test]
    fn test_repaired_output_checked_against_schema() {
        let task = structured_task();
        let mut run = TaskRun::builder(
            "in",
            human(),
            TaskOutput::new(r#"{"name": "John Doe", "age": 30}"#, human()),
        )
        .build(&task)
        .unwrap();

        let err = run
            .set_repair(&task, "Age is 31", TaskOutput::new(r#"{"name": "John Doe"}"#, human()))
            .unwrap_err();
        assert!(err.to_string().contains("Repaired output"));
        assert!(run.repaired_output().is_none());

        run.set_repair(
            &task,
            "Age is 31",
            TaskOutput::new(r#"{"name": "John Doe", "age": 31}"#, human()),
        )
        .unwrap();
        assert!(run.repaired_output().is_some());

        run.clear_repair(&task).unwrap();
        assert!(run.repair_instructions().is_none());
    }

    #[test]
    fn test_input_schema_validation() {
        let task = Task::new("In", "Take a person")
            .with_input_schema(PERSON_SCHEMA)
            .unwrap();
        let mut run = TaskRun::builder(
            r#"{"name": "John Doe", "age": 30}"#,
            human(),
            TaskOutput::new("Test output", human()),
        )
        .build(&task)
        .unwrap();

        let err = run
            .set_input(&task, r#"{"name": "John Doe", "age": "thirty"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Task input does not match schema"));
    }

    #[test]
    fn test_rating_attached_later() {
        let task = plain_task();
        let mut run = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .build(&task)
            .unwrap();

        assert!(run
            .set_output_rating(&task, Some(TaskOutputRating::five_star(5.0).with_requirement_rating("nope", 1.0)))
            .is_err());
        assert!(run.output().rating.is_none());

        run.set_output_rating(&task, Some(TaskOutputRating::five_star(5.0)))
            .unwrap();
        assert_eq!(run.rating_value(), Some(5.0));
    }

    #[test]
    fn test_task_input_canonicalization() {
        let mut map = Map::new();
        map.insert("a".to_string(), Value::from("x"));
        map.insert("b".to_string(), Value::from(2));
        let input = TaskInput::from(map);
        assert!(input.is_structured());
        assert_eq!(input.to_stored_string(), r#"{"a":"x","b":2}"#);

        assert_eq!(TaskInput::from("plain").to_stored_string(), "plain");
        assert!(TaskInput::from_value(Value::from(3)).is_err());
    }

    #[test]
    fn test_rejected_mutation_leaves_run_unchanged() {
        let task = plain_task();
        let mut run = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .build(&task)
            .unwrap();
        let before = run.clone();

        let bad_rating = TaskOutputRating::five_star(3.0).with_requirement_rating("nope", 3.0);
        assert!(run.set_output_rating(&task, Some(bad_rating)).is_err());
        let rated_repair = TaskOutput::new("fixed", human()).with_rating(TaskOutputRating::five_star(5.0));
        assert!(run.set_repair(&task, "Fix it", rated_repair).is_err());
        assert_eq!(run, before);

        run.set_repair(&task, "Fix it", TaskOutput::new("fixed", human())).unwrap();
        assert_eq!(run.repair_instructions(), Some("Fix it"));
        run.clear_repair(&task).unwrap();
        assert!(run.repaired_output().is_none());
    }

    #[test]
    fn test_mark_transient() {
        let task = plain_task();
        let mut run = TaskRun::builder("in", human(), TaskOutput::new("out", human()))
            .build(&task)
            .unwrap();
        run.mark_transient();
        assert!(run.id().is_none());
    }
}
