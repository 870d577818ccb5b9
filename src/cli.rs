//! Command-line interface and composition root.
//!
//! The CLI is the only place that constructs concrete collaborators; the
//! engine and runner receive everything by injection. A workflow run is
//! spawned as its own task with its own fault boundary, and the CLI then
//! acts as one more observer of the broadcaster.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ideaforge_config::Config;
use ideaforge_engine::{PhaseRunner, ProgressBroadcaster, WorkflowEngine};
use ideaforge_llm::{CostEstimator, OpenRouterCaller};
use ideaforge_phases::PhaseExecutor;
use ideaforge_storage::{MemoryStorage, Storage};
use ideaforge_trace::{LoggingTraceRecorder, NoopTraceRecorder, TraceRecorder};
use ideaforge_types::{Project, WorkflowEvent, WorkflowEventKind};

#[derive(Debug, Parser)]
#[command(name = "ideaforge", version, about = "Turn a product idea into design documents")]
struct Cli {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full document pipeline for one idea.
    Run {
        /// The product idea to expand into design documents.
        idea: String,

        /// Write the generated markdown documents into this directory.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

/// Parse arguments, set up logging and drive the selected command.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    match cli.command {
        Command::Run { idea, out_dir } => {
            runtime.block_on(run_workflow(config, idea, out_dir.as_deref()))
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

async fn run_workflow(config: Config, idea: String, out_dir: Option<&Path>) -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let broadcaster = Arc::new(ProgressBroadcaster::new());
    let trace: Arc<dyn TraceRecorder> = if config.trace.enabled {
        Arc::new(LoggingTraceRecorder)
    } else {
        Arc::new(NoopTraceRecorder)
    };

    let caller = OpenRouterCaller::from_config(&config)
        .context("configuring the OpenRouter model caller")?;
    let executor = PhaseExecutor::new(
        Arc::new(caller),
        CostEstimator::new(&config.pricing),
        config.llm.models.clone(),
        Duration::from_secs(config.llm.call_timeout_secs),
    );
    let runner = PhaseRunner::new(executor, Arc::clone(&storage), Arc::clone(&trace));
    let engine = Arc::new(WorkflowEngine::new(
        Arc::clone(&storage),
        runner,
        Arc::clone(&broadcaster),
        trace,
    ));

    let project = Project::new(Uuid::new_v4(), idea);
    let project_id = project.id;
    storage.insert_project(project).await?;
    println!("project {project_id} accepted");

    // Observe before spawning so no event is missed.
    let (_, mut events) = broadcaster.subscribe(project_id);

    // The run owns its fault boundary; this path only confirms acceptance
    // and then watches.
    let run = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.execute_workflow(project_id).await })
    };

    while let Some(event) = events.recv().await {
        print_event(&event);
        if matches!(
            event.kind,
            WorkflowEventKind::WorkflowCompleted { .. } | WorkflowEventKind::WorkflowFailed { .. }
        ) {
            break;
        }
    }

    let succeeded = run.await.unwrap_or(false);
    if succeeded {
        if let Some(out_dir) = out_dir {
            write_documents(storage.as_ref(), project_id, out_dir).await?;
        }
        Ok(())
    } else {
        anyhow::bail!("workflow failed for project {project_id}")
    }
}

fn print_event(event: &WorkflowEvent) {
    match &event.kind {
        WorkflowEventKind::PhaseStarted { phase, message } => {
            println!("[{phase}] {message}");
        }
        WorkflowEventKind::PhaseProgress { phase, message } => {
            println!("[{phase}] {message}");
        }
        WorkflowEventKind::PhaseCompleted {
            phase,
            duration_seconds,
            cost_usd,
        } => {
            println!("[{phase}] completed in {duration_seconds}s (${cost_usd})");
        }
        WorkflowEventKind::PhaseFailed { phase, error, .. } => {
            println!("[{phase}] failed: {error}");
        }
        WorkflowEventKind::WorkflowCompleted {
            total_duration_seconds,
            total_cost_usd,
            documents_generated,
        } => {
            println!(
                "done: {documents_generated} documents in {total_duration_seconds}s (${total_cost_usd})"
            );
        }
        WorkflowEventKind::WorkflowFailed { error } => {
            println!("workflow failed: {error}");
        }
    }
}

async fn write_documents(
    storage: &dyn Storage,
    project_id: Uuid,
    out_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    for document in storage.list_documents(project_id).await? {
        let file_name = format!("{}.md", document.doc_type.to_string().to_lowercase());
        let path = out_dir.join(file_name);
        std::fs::write(&path, &document.content_md)
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "document written");
        println!("wrote {}", path.display());
    }
    Ok(())
}
