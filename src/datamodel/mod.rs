//! Provenance and invariant data model.
//!
//! Tasks own their requirements, run history, saved prompts and fine-tunes.
//! Every cross-referential rule (rating keys name real requirements, repair
//! fields come in pairs, outputs match the task schema) is enforced when a
//! record is built or mutated, never deferred to storage.
//!
//! # Example
//!
//! ```
//! use task_forge::datamodel::{
//!     DataSource, Task, TaskOutput, TaskOutputRating, TaskRequirement, TaskRun,
//! };
//!
//! let task = Task::new("Greeter", "Greet the user")
//!     .with_requirement(TaskRequirement::new("Polite", "Be polite").with_id("polite"))
//!     .unwrap();
//!
//! let source = DataSource::human("alice").unwrap();
//! let output = TaskOutput::new("Hello!", source.clone())
//!     .with_rating(TaskOutputRating::five_star(5.0).with_requirement_rating("polite", 5.0));
//!
//! let run = TaskRun::builder("Hi", source, output).build(&task).unwrap();
//! assert!(run.output().rating.as_ref().unwrap().is_high_quality());
//! ```

pub mod finetune;
pub mod json_schema;
pub mod rating;
pub mod run;
pub mod source;
pub mod task;

pub use finetune::{
    DatasetSplit, Finetune, FinetuneDataStrategy, FinetuneStatusType, ParameterValue,
};
pub use rating::{RatingType, TaskOutputRating, HIGH_QUALITY_STARS};
pub use run::{TaskInput, TaskOutput, TaskRun, TaskRunBuilder};
pub use source::{DataSource, DataSourceType, PropertyValue};
pub use task::{Prompt, Task, TaskRequirement};
