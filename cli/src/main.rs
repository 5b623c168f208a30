//! CLI entrypoint for kestrel
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod render;
mod wiring;

use anyhow::{Context, Result, bail};
use clap::Parser;
use commands::{Cli, Commands};
use kestrel_application::tools::JsonSchemaToolConverter;
use kestrel_application::{EventLogger, NoEventLogger, RunError, TaskManager, TaskNotification};
use kestrel_domain::{Model, TaskStatus};
use kestrel_infrastructure::{ConfigLoader, FileConfig, JsonlEventLogger, ScriptedLlmGateway};
use render::EventPrinter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use wiring::Wiring;

/// Install the diagnostics subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config = ConfigLoader::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            replay,
            log_events,
            plugin_dir,
            model,
            json,
        } => {
            let mut config = config;
            if let Some(model) = model {
                config.agent.model = model;
            }
            wiring::check_config(&config)?;
            run(
                &config,
                RunArgs {
                    input,
                    replay,
                    log_events,
                    plugin_dirs: plugin_dir,
                    json,
                },
            )
            .await
        }
        Commands::Tools { plugin_dir } => list_tools(&config, &plugin_dir).await,
        Commands::Config => {
            show_config(&config, cli.config.as_deref());
            Ok(())
        }
    }
}

struct RunArgs {
    input: String,
    replay: PathBuf,
    log_events: Option<PathBuf>,
    plugin_dirs: Vec<PathBuf>,
    json: bool,
}

async fn run(config: &FileConfig, args: RunArgs) -> Result<()> {
    let gateway = Arc::new(
        ScriptedLlmGateway::from_file(&args.replay)
            .await
            .context("Failed to load replay script")?,
    );

    let event_logger: Arc<dyn EventLogger> = match &args.log_events {
        Some(path) => match JsonlEventLogger::new(path) {
            Some(logger) => Arc::new(logger),
            None => bail!("Cannot write event log {}", path.display()),
        },
        None => Arc::new(NoEventLogger),
    };

    let assembly = Wiring::new(config, gateway)
        .with_event_logger(event_logger)
        .with_plugin_dirs(wiring::plugin_dirs(config, &args.plugin_dirs))
        .assemble()
        .await?;
    info!(
        model = %assembly.runtime.config().model,
        tools = assembly.runtime.registry().len(),
        "Starting run"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            ctrl_c.cancel();
        }
    });

    let notifications = assembly.tasks.subscribe();
    let mut handle = assembly.runtime.start_run(args.input, cancel.clone());
    let mut printer = EventPrinter::default();
    if !args.json {
        while let Some(event) = handle.next_event().await {
            printer.print(&event);
        }
    }

    let result = match handle.result().await {
        Ok(result) => result,
        Err(RunError::Gateway { message, partial }) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&partial)?);
            }
            bail!("Run failed: {}", message);
        }
        Err(e) if e.is_cancelled() => bail!("Run cancelled"),
        Err(e) => return Err(e.into()),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    wait_for_background_tasks(&assembly.tasks, notifications, &cancel).await;
    Ok(())
}

/// Keep the process alive until detached tasks finish, printing their
/// notifications. A second interrupt cancels them.
async fn wait_for_background_tasks(
    tasks: &Arc<TaskManager>,
    mut notifications: broadcast::Receiver<TaskNotification>,
    cancel: &CancellationToken,
) {
    loop {
        let running = tasks
            .list()
            .await
            .iter()
            .filter(|record| record.status == TaskStatus::Running)
            .count();
        if running == 0 {
            return;
        }
        eprintln!("-- waiting for {} background task(s)", running);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                for record in tasks.list().await {
                    tasks.cancel(&record.id).await;
                }
                return;
            }
            notification = notifications.recv() => match notification {
                Ok(notification) => {
                    eprintln!("{}", render::format_notification(&notification));
                    // The parent run is over; nothing can query a finished record now.
                    if matches!(
                        notification,
                        TaskNotification::Completed { .. } | TaskNotification::Failed { .. }
                    ) {
                        tasks.remove(notification.task_id()).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed task notifications");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        }
    }
}

async fn list_tools(config: &FileConfig, extra_dirs: &[PathBuf]) -> Result<()> {
    let gateway = Arc::new(ScriptedLlmGateway::new(Vec::new()));
    let assembly = Wiring::new(config, gateway)
        .with_plugin_dirs(wiring::plugin_dirs(config, extra_dirs))
        .assemble()
        .await?;
    let registry = assembly.runtime.registry();

    let mut specs = registry.get_all();
    specs.sort_by(|a, b| a.name().cmp(b.name()));
    for spec in specs {
        let definition = &spec.definition;
        let risk = definition
            .risk_level
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{:<20} {:<10} {:<10} {}",
            definition.name, definition.domain, risk, definition.description
        );
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        let schemas = JsonSchemaToolConverter::registry_schema(registry);
        tracing::debug!("{}", serde_json::to_string_pretty(&schemas)?);
    }
    Ok(())
}

fn show_config(config: &FileConfig, explicit: Option<&Path>) {
    println!("Configuration sources (highest to lowest priority):");
    for source in ConfigLoader::sources(explicit) {
        let marker = if source.found { "found" } else { "-" };
        println!("  {:<10} {:<6} {}", source.label, marker, source.location);
    }

    println!();
    println!("Model:          {}", Model::from(config.agent.model.as_str()));
    println!("Max iterations: {}", config.agent.max_iterations);
    println!(
        "Compaction:     {} tokens, keep {} messages",
        config.compaction.threshold_tokens, config.compaction.keep_recent_messages
    );
    let profiles: Vec<&str> = config.agents.iter().map(|a| a.name.as_str()).collect();
    if !profiles.is_empty() {
        println!("Agents:         {}", profiles.join(", "));
    }

    let issues = config.validate();
    if issues.is_empty() {
        println!("\nNo configuration issues.");
        return;
    }
    println!("\nIssues:");
    for issue in issues {
        let label = if issue.is_error() { "error" } else { "warning" };
        println!("  {}: {}", label, issue.message);
    }
}
