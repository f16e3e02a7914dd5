//! CLI command definitions for task-forge.
//!
//! Commands operate on task records stored as JSON, either a single task file
//! or a task directory as written by [`FileStore`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::StaticCatalog;
use crate::datamodel::{ParameterValue, Task, TaskRun};
use crate::finetune::{builtin_parameters, check_valid_provider_model, validate_parameters};
use crate::prompts::{prompt_builder_from_id, PromptId};
use crate::storage::FileStore;

/// Prompt building, run validation and fine-tune checks for task records.
#[derive(Parser)]
#[command(name = "task-forge")]
#[command(about = "Build prompts and validate task records for LLM task runs")]
#[command(version)]
#[command(
    long_about = "task-forge builds prompts for tasks, validates recorded runs against their task, and checks fine-tune parameters before a job is launched.\n\nExample usage:\n  task-forge prompt --task ./tasks/jokes --prompt-id few_shot_prompt_builder"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Check that a prompt identifier is well formed.
    CheckId(CheckIdArgs),

    /// Print the system prompt a builder produces for a task.
    Prompt(PromptArgs),

    /// Validate a task run record against its task.
    ValidateRun(ValidateRunArgs),

    /// Check fine-tune parameters for a provider and base model.
    FinetuneParams(FinetuneParamsArgs),
}

/// Arguments for `task-forge check-id`.
#[derive(Parser, Debug)]
pub struct CheckIdArgs {
    /// Prompt identifier, e.g. `id::abc123` or `simple_prompt_builder`.
    pub id: String,
}

/// Arguments for `task-forge prompt`.
#[derive(Parser, Debug)]
pub struct PromptArgs {
    /// Task JSON file or task directory.
    #[arg(short, long)]
    pub task: String,

    /// Prompt identifier.
    #[arg(short, long, default_value = "simple_prompt_builder")]
    pub prompt_id: String,

    /// Append the output schema as format instructions.
    #[arg(long)]
    pub json_instructions: bool,

    /// Print the prompt as shown to people, thinking instructions included.
    #[arg(long, conflicts_with = "json_instructions")]
    pub ui: bool,
}

/// Arguments for `task-forge validate-run`.
#[derive(Parser, Debug)]
pub struct ValidateRunArgs {
    /// Task JSON file or task directory.
    #[arg(short, long)]
    pub task: String,

    /// Task run JSON file.
    #[arg(short, long)]
    pub run: String,
}

/// Arguments for `task-forge finetune-params`.
#[derive(Parser, Debug)]
pub struct FinetuneParamsArgs {
    /// Fine-tune provider, e.g. `openai`.
    #[arg(long)]
    pub provider: String,

    /// Provider-side base model id.
    #[arg(long)]
    pub base_model: String,

    /// JSON object of parameter values.
    #[arg(long)]
    pub params: Option<String>,

    /// YAML model catalog to use instead of the built-in one.
    #[arg(long, env = "TASK_FORGE_CATALOG")]
    pub catalog: Option<String>,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::CheckId(args) => run_check_id_command(args),
        Commands::Prompt(args) => run_prompt_command(args).await,
        Commands::ValidateRun(args) => run_validate_run_command(args).await,
        Commands::FinetuneParams(args) => run_finetune_params_command(args),
    }
}

#[derive(Debug, Serialize)]
struct CheckIdOutput {
    id: String,
    kind: &'static str,
}

fn run_check_id_command(args: CheckIdArgs) -> anyhow::Result<()> {
    let parsed = PromptId::parse(&args.id)?;
    let kind = match parsed {
        PromptId::Generator(_) => "generator",
        PromptId::Saved(_) => "saved",
        PromptId::FineTune(_) => "fine_tune",
        PromptId::Eval { .. } => "eval",
    };
    let output = CheckIdOutput {
        id: parsed.to_string(),
        kind,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_prompt_command(args: PromptArgs) -> anyhow::Result<()> {
    let task = Arc::new(load_task(Path::new(&args.task)).await?);
    let builder = prompt_builder_from_id(&args.prompt_id, task)?;
    debug!(builder = builder.name(), "Resolved prompt builder");

    let prompt = if args.ui {
        builder.build_prompt_for_ui()
    } else {
        builder.build_prompt(args.json_instructions)
    };
    println!("{}", prompt);
    Ok(())
}

async fn run_validate_run_command(args: ValidateRunArgs) -> anyhow::Result<()> {
    let task = load_task(Path::new(&args.task)).await?;
    let content = tokio::fs::read_to_string(&args.run)
        .await
        .with_context(|| format!("Failed to read run file {}", args.run))?;
    let run: TaskRun = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse run file {}", args.run))?;

    run.validate(&task)?;
    info!(task_id = %task.id(), run_id = ?run.id(), "Run is valid");
    println!("valid");
    Ok(())
}

fn run_finetune_params_command(args: FinetuneParamsArgs) -> anyhow::Result<()> {
    let catalog = match &args.catalog {
        Some(path) => StaticCatalog::load_file(path)?,
        None => StaticCatalog::builtin(),
    };
    check_valid_provider_model(&catalog, &args.provider, &args.base_model)?;

    let parameters: BTreeMap<String, ParameterValue> = match &args.params {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read parameter file {}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Parameter file {} is not a JSON object", path))?
        }
        None => BTreeMap::new(),
    };

    let declared = builtin_parameters(&args.provider);
    validate_parameters(&declared, &parameters)?;

    println!("{}", serde_json::to_string_pretty(&declared)?);
    Ok(())
}

/// Loads a task from a task directory or a single JSON file.
async fn load_task(path: &Path) -> anyhow::Result<Task> {
    if path.is_dir() {
        return Ok(FileStore::new().load_task(path).await?);
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    let task: Task = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse task file {}", path.display()))?;
    task.validate()?;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{DataSource, TaskOutput, TaskOutputRating, TaskRequirement};

    fn write_task(dir: &Path) -> String {
        let task = Task::new("Jokes", "Tell a joke.")
            .with_requirement(TaskRequirement::new("Funny", "Be funny").with_id("funny"))
            .unwrap();
        let path = dir.join("task.json");
        std::fs::write(&path, serde_json::to_string(&task).unwrap()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["task-forge", "check-id", "id::abc"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckId(ref args) if args.id == "id::abc"));
        assert_eq!(cli.log_level, "info");

        let cli = Cli::try_parse_from([
            "task-forge",
            "prompt",
            "--task",
            "t.json",
            "--prompt-id",
            "few_shot_prompt_builder",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Prompt(ref args) if !args.ui));

        assert!(Cli::try_parse_from(["task-forge", "prompt", "--task", "t", "--ui", "--json-instructions"]).is_err());
    }

    #[tokio::test]
    async fn test_check_id_command() {
        let cli = Cli::try_parse_from(["task-forge", "check-id", "eval_prompt::p::t::e::c"]).unwrap();
        assert!(run_with_cli(cli).await.is_ok());

        let cli = Cli::try_parse_from(["task-forge", "check-id", "id::"]).unwrap();
        assert!(run_with_cli(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_prompt_and_validate_run() {
        let dir = tempfile::tempdir().unwrap();
        let task_path = write_task(dir.path());

        let cli = Cli::try_parse_from(["task-forge", "prompt", "--task", task_path.as_str()]).unwrap();
        assert!(run_with_cli(cli).await.is_ok());

        let task = load_task(Path::new(&task_path)).await.unwrap();
        let source = DataSource::human("tester").unwrap();
        let good = TaskRun::builder(
            "cats",
            source.clone(),
            TaskOutput::new("meow", source.clone())
                .with_rating(TaskOutputRating::five_star(4.0).with_requirement_rating("funny", 4.0)),
        )
        .build(&task)
        .unwrap();
        let run_path = dir.path().join("run.json");
        std::fs::write(&run_path, serde_json::to_string(&good).unwrap()).unwrap();

        let run_arg = run_path.display().to_string();
        let cli = Cli::try_parse_from([
            "task-forge",
            "validate-run",
            "--task",
            task_path.as_str(),
            "--run",
            run_arg.as_str(),
        ])
        .unwrap();
        assert!(run_with_cli(cli).await.is_ok());

        // rating keyed by a requirement the task does not have
        let mut bad = serde_json::to_value(&good).unwrap();
        bad["output"]["rating"]["requirement_ratings"] = serde_json::json!({"missing": 3.0});
        std::fs::write(&run_path, bad.to_string()).unwrap();
        let cli = Cli::try_parse_from([
            "task-forge",
            "validate-run",
            "--task",
            task_path.as_str(),
            "--run",
            run_arg.as_str(),
        ])
        .unwrap();
        assert!(run_with_cli(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_finetune_params_command() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("params.json");
        std::fs::write(&params, r#"{"epochs": 3, "learning_rate_multiplier": 2}"#).unwrap();
        let params_arg = params.display().to_string();

        let args = |base_model: &str| {
            Cli::try_parse_from([
                "task-forge",
                "finetune-params",
                "--provider",
                "openai",
                "--base-model",
                base_model,
                "--params",
                params_arg.as_str(),
            ])
            .unwrap()
        };

        // integer literal for a float parameter
        assert!(run_with_cli(args("gpt-4o-mini-2024-07-18")).await.is_err());

        std::fs::write(&params, r#"{"epochs": 3, "learning_rate_multiplier": 2.0}"#).unwrap();
        assert!(run_with_cli(args("gpt-4o-mini-2024-07-18")).await.is_ok());
        assert!(run_with_cli(args("gpt-2")).await.is_err());
    }
}
