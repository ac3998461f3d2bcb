// src/main.rs

mod cli;

use clap::Parser;
use color_eyre::eyre::Result;
use serde::Serialize;
use serde_json::{json, Map};
use std::path::PathBuf;
use strum::VariantArray;
use tracing::{debug, warn};

use cli::{BackendArgs, Cli, Commands};
use scorton::config::{ConfigSources, DEFAULT_API_ENDPOINT};
use scorton::core::models::Tool;
use scorton::logging;
use scorton::orchestrator::Orchestrator;
use scorton::output::OutputSink;
use scorton::providers::{LegacyCli, NativeEngine};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if let Err(e) = logging::initialize_logging(cli.verbose) {
        eprintln!("Warning: file logging disabled: {e}");
    }

    run(cli).await
}

fn orchestrator(sources: &ConfigSources, backend: BackendArgs) -> Orchestrator<NativeEngine, LegacyCli> {
    let settings = sources.resolve().with_overrides(backend.api, backend.token);
    debug!(native = settings.use_fast_backend, fallback = settings.fallback_enabled, "Building orchestrator.");
    Orchestrator::new(
        NativeEngine::from_settings(&settings),
        LegacyCli::from_settings(&settings),
        OutputSink::in_working_dir(),
    )
}

/// Prints the record on stdout and the artifact paths on stderr.
fn emit<T: Serialize>(record: &T, artifacts: &[PathBuf]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    for path in artifacts {
        eprintln!("Saved {}", path.display());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let sources = ConfigSources::from_process();

    match cli.command {
        Commands::Scan { tool, target, backend } => {
            let run = orchestrator(&sources, backend).scan(tool, &target).await?;
            emit(&run.record, &run.artifacts)?;
        }

        Commands::Score { target, backend } => {
            let run = orchestrator(&sources, backend).score(&target).await?;
            emit(&run.record, &run.artifacts)?;
        }

        Commands::Audit { target, backend } => {
            let run = orchestrator(&sources, backend).audit(&target).await?;
            emit(&run.record, &run.artifacts)?;
        }

        Commands::Compliance { framework, target, backend } => {
            let run = orchestrator(&sources, backend).compliance(framework, &target).await?;
            match &run.combined {
                Some(combined) => emit(combined, &run.artifacts)?,
                None => emit(&run.records.first(), &run.artifacts)?,
            }
        }

        Commands::Config { set } => {
            if let Some((key, value)) = set {
                let mut partial = Map::new();
                partial.insert(key, value);
                sources.persist_project_override(partial)?;
            }
            println!("{}", sources.resolve());
        }

        Commands::Init { template } => {
            if sources.project_file.exists() {
                warn!(path = %sources.project_file.display(), "Project config exists, merging.");
            }
            let mut partial = Map::new();
            partial.insert("apiEndpoint".to_string(), json!(DEFAULT_API_ENDPOINT));
            partial.insert("template".to_string(), json!(template));
            sources.persist_project_override(partial)?;
            eprintln!("Initialized {}", sources.project_file.display());
            println!("{}", sources.resolve());
        }

        Commands::Tools => {
            for tool in Tool::VARIANTS {
                let backends = if NativeEngine::supports(*tool) { "native, legacy" } else { "legacy" };
                println!("{:<14} {}", tool.to_string(), backends);
            }
        }
    }

    Ok(())
}
