//! framepipe command-line front end.
//!
//! Loads a pipeline configuration file, builds the chain against the built-in
//! stage catalog, and runs it. Exits 0 on full success and nonzero on any
//! configuration, validation, or runtime failure.

use clap::{Parser, Subcommand};
use framepipe_rs::config::load_pipeline_file;
use framepipe_rs::pipeline::{builtin_catalog, run_pipeline, RunOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "framepipe", version, about = "Declarative filter-chain pipeline engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and run the pipeline described by a configuration file.
    Run {
        /// Pipeline file (.json or .toml).
        pipeline: PathBuf,
        /// Directory for per-worker log files.
        #[arg(long, default_value = ".")]
        log_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,framepipe_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { pipeline, log_dir } => {
            tracing::info!(file = %pipeline.display(), "setting up pipeline");
            let specs = load_pipeline_file(&pipeline)?;
            let catalog = Arc::new(builtin_catalog());
            let options = RunOptions {
                module: pipeline
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("pipeline")
                    .to_string(),
                log_dir,
            };
            run_pipeline(&specs, &catalog, &options)?;
            tracing::info!("done");
        }
    }
    Ok(())
}
