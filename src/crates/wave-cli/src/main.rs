//! `wave`: a small CLI wrapping the waveforge engine — import a workflow definition, validate
//! it, inspect its execution plan, or run it end to end and print the resulting [`Execution`].
//!
//! Grounded on `langgraph-cli`'s `Validate`/`Check`/`Run` subcommand shape (clap-derived
//! `Cli`/`Commands`) and `orchestrator-server`'s `tracing-subscriber` + `EnvFilter`
//! initialization. This binary only registers the two reference executors from
//! `wave-registry::builtins` (`echo`, `conditional`) — a real deployment supplies its own
//! registry built from its own executor implementations.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wave_model::Value;
use wave_registry::{ConditionalExecutor, EchoExecutor, ExecutorRegistry};
use wave_scheduler::{ExecutionOptions, Scheduler};

#[derive(Parser)]
#[command(name = "wave")]
#[command(about = "waveforge CLI - validate, plan, and run workflow definitions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow definition (YAML or JSON) and report errors, if any.
    Validate {
        /// Path to the workflow definition file.
        file: PathBuf,
    },
    /// Validate a workflow and print its execution plan: wave depths and adjacency.
    Plan {
        /// Path to the workflow definition file.
        file: PathBuf,
    },
    /// Run a workflow definition against an input and print the resulting execution record.
    Run {
        /// Path to the workflow definition file.
        file: PathBuf,
        /// Input JSON (defaults to `{}`).
        #[arg(short, long)]
        input: Option<String>,
        /// Bound concurrency within a wave (0 or omitted means unbounded).
        #[arg(long, env = "WAVE_MAX_PARALLELISM")]
        max_parallelism: Option<usize>,
        /// Continue scheduling remaining nodes after a node fails.
        #[arg(long, env = "WAVE_CONTINUE_ON_ERROR", default_value_t = false)]
        continue_on_error: bool,
    },
}

fn init_tracing() {
    let filter = std::env::var("WAVE_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// The demo registry available to `wave run`/`wave plan`'s port-metadata checks: the two
/// bundled reference executors, `EchoExecutor` and `ConditionalExecutor`.
fn demo_registry() -> ExecutorRegistry {
    ExecutorRegistry::new()
        .with("echo", Arc::new(EchoExecutor))
        .with("conditional", Arc::new(ConditionalExecutor))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => validate_command(&file),
        Commands::Plan { file } => plan_command(&file),
        Commands::Run { file, input, max_parallelism, continue_on_error } => {
            run_command(&file, input.as_deref(), max_parallelism, continue_on_error).await
        }
    }
}

fn load_workflow(file: &PathBuf) -> anyhow::Result<wave_model::Workflow> {
    wave_import::import_file(file).map_err(|e| anyhow::anyhow!("{}", e.message().to_string()))
}

fn validate_command(file: &PathBuf) -> anyhow::Result<()> {
    let workflow = load_workflow(file)?;
    let registry = demo_registry();
    match wave_validate::validate(&workflow, Some(&registry)) {
        Ok(plan) => {
            println!("✓ workflow is valid");
            println!("  name: {}", workflow.name);
            println!("  nodes: {}", workflow.nodes.len());
            println!("  edges: {}", workflow.edges.len());
            println!("  waves: {}", plan.waves.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ validation failed: {}", e.message());
            std::process::exit(1);
        }
    }
}

fn plan_command(file: &PathBuf) -> anyhow::Result<()> {
    let workflow = load_workflow(file)?;
    let registry = demo_registry();
    let plan = wave_validate::validate(&workflow, Some(&registry)).map_err(|e| anyhow::anyhow!("{}", e.message().to_string()))?;

    println!("workflow: {} (v{})", workflow.name, workflow.version);
    for (depth, wave) in plan.waves.iter().enumerate() {
        println!("wave {depth}: {}", wave.join(", "));
    }
    Ok(())
}

async fn run_command(file: &PathBuf, input: Option<&str>, max_parallelism: Option<usize>, continue_on_error: bool) -> anyhow::Result<()> {
    let workflow = load_workflow(file)?;
    let registry = demo_registry();
    let plan = wave_validate::validate(&workflow, Some(&registry)).map_err(|e| anyhow::anyhow!("{}", e.message().to_string()))?;

    let input_value: Value = match input {
        Some(raw) => {
            let json: serde_json::Value = serde_json::from_str(raw)?;
            Value::from_json(json)
        }
        None => Value::map(),
    };

    let mut options = ExecutionOptions::new().with_continue_on_error(continue_on_error);
    if let Some(n) = max_parallelism {
        options = options.with_max_parallelism(n);
    }

    let scheduler = Scheduler::new(&workflow, &plan, &registry);
    let (execution, _journal) = scheduler.run(input_value, options, CancellationToken::new()).await;

    println!("{}", serde_json::to_string_pretty(&execution)?);
    if execution.status != wave_model::ExecutionStatus::Completed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_workflow(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    const LINEAR_WORKFLOW: &str = r#"
metadata:
  name: "cli demo"
nodes:
  - id: a
    name: "A"
    type: echo
  - id: b
    name: "B"
    type: echo
edges:
  - id: e1
    from: a
    to: b
"#;

    #[test]
    fn validate_command_accepts_a_well_formed_workflow() {
        let f = write_temp_workflow(LINEAR_WORKFLOW);
        assert!(validate_command(&f.path().to_path_buf()).is_ok());
    }

    #[test]
    fn plan_command_reports_two_waves() {
        let f = write_temp_workflow(LINEAR_WORKFLOW);
        assert!(plan_command(&f.path().to_path_buf()).is_ok());
    }

    #[tokio::test]
    async fn run_command_executes_to_completion() {
        let f = write_temp_workflow(LINEAR_WORKFLOW);
        let result = run_command(&f.path().to_path_buf(), Some(r#"{"x":1}"#), None, false).await;
        assert!(result.is_ok());
    }
}
