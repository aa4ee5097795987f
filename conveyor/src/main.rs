//! The `conveyor` command line: load a pipeline definition, run it, report.

use clap::{Parser, Subcommand};
use conveyor::errors::EngineError;
use conveyor::events::TracingEventSink;
use conveyor::executor::{Executor, ExecutorConfig};
use conveyor::history::RunArchive;
use conveyor::observability::{init_logging, LogFormat};
use conveyor::pipeline::PipelineDefinition;
use conveyor::run::RunIdentity;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "conveyor", version, about = "A push-to-deploy pipeline engine")]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a pipeline definition to completion.
    Run {
        /// Path to the pipeline definition (JSON).
        definition: PathBuf,

        /// Maximum simultaneously running stages.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Global run deadline in seconds.
        #[arg(long, default_value_t = 3600)]
        timeout_secs: u64,

        /// Grace period in seconds for cancelled stages to wind down.
        #[arg(long, default_value_t = 5)]
        grace_secs: u64,

        /// Append the finished run to this JSON-lines archive.
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Commit SHA to attach to the run (also tags the built image).
        #[arg(long)]
        commit: Option<String>,

        /// Who or what triggered the run.
        #[arg(long)]
        actor: Option<String>,
    },
    /// List runs recorded in an archive.
    History {
        /// Path to the JSON-lines archive.
        archive: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    match dispatch(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command) -> Result<ExitCode, EngineError> {
    match command {
        Command::Run {
            definition,
            concurrency,
            timeout_secs,
            grace_secs,
            archive,
            commit,
            actor,
        } => {
            let graph = PipelineDefinition::from_path(&definition)?.into_graph()?;

            let mut identity = RunIdentity::new();
            if let Some(sha) = commit {
                identity = identity.with_commit_sha(sha);
            }
            if let Some(actor) = actor {
                identity = identity.with_actor(actor);
            }

            let executor = Executor::new(ExecutorConfig {
                max_concurrency: concurrency,
                run_timeout: Duration::from_secs(timeout_secs),
                cancel_grace: Duration::from_secs(grace_secs),
            })
            .with_events(Arc::new(TracingEventSink));

            let report = executor.run(&graph, identity).await;
            println!("{}", report.render());

            if let Some(path) = archive {
                RunArchive::new(path).append(&report)?;
            }

            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::History { archive } => {
            for report in RunArchive::new(archive).load()? {
                println!(
                    "{} {} {} ({} stages)",
                    report.finished_at.format("%Y-%m-%d %H:%M:%S"),
                    report.run.run_id,
                    report.status,
                    report.stages.len()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
