use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::{
    io::{self, StoredReport},
    DifferentiationEngine, Engine, EngineConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Finite-difference stencil CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve finite-difference weights for explicit offsets
    Coefficients {
        #[arg(long)]
        deriv: usize,
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        offsets: Vec<f64>,
    },

    /// Print the centered and one-sided stencils for a uniform axis
    Stencil {
        #[arg(long)]
        deriv: usize,
        #[arg(long, default_value_t = 2)]
        acc: usize,
        #[arg(long, default_value_t = 1.0)]
        spacing: f64,
    },

    /// Differentiate every request of a JSON batch file
    Run {
        #[arg(long)]
        batch: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Display engine banner
    Banner,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Coefficients { deriv, offsets } => {
            let coefficients = engine::solve(&offsets, deriv)?;
            println!("{}", serde_json::to_string_pretty(&coefficients)?);
        }
        Command::Stencil {
            deriv,
            acc,
            spacing,
        } => {
            let set = engine::build_stencil_set(spacing, deriv, acc)?;
            println!("{}", serde_json::to_string_pretty(&set)?);
        }
        Command::Run {
            batch,
            config,
            output,
        } => {
            let cfg = match config {
                Some(path) => EngineConfig::from_path(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            let batch_path = batch
                .or_else(|| cfg.io.batch.clone().map(PathBuf::from))
                .context("no batch file given (--batch or io.batch)")?;
            let output = output.or_else(|| cfg.io.outputs.clone().map(PathBuf::from));

            let batch = io::load_batch(&batch_path)
                .with_context(|| format!("loading batch {}", batch_path.display()))?;
            let mut engine = Engine::new();
            engine.prepare(cfg)?;
            let handle = engine.submit(batch)?;
            let report = engine.join(handle)?;
            tracing::info!("{}", report.summary());

            let stored = StoredReport::from(&report);
            match output {
                Some(path) => io::write_json(&path, &stored)?,
                None => println!("{}", serde_json::to_string_pretty(&stored)?),
            }
            engine.shutdown()?;
        }
        Command::Banner => {
            println!("{}", engine::banner());
        }
    }
    Ok(())
}
