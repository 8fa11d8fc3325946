//! GammaField Headless Simulation Driver
//!
//! Runs configured simulations, writes diagnostics, and hosts the
//! validation harness. Runs entirely in-process with no rendering.
//!
//! Usage:
//!   cargo run -p gammafield-simtest -- harness --verbose
//!   cargo run -p gammafield-simtest --release -- scenario --csv out/two_body.csv
//!   cargo run -p gammafield-simtest -- run --config data/two_body.json --ticks 2000

mod harness;
mod output;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gammafield_core::prelude::*;

use output::CsvDiagnostics;

#[derive(Parser)]
#[command(name = "gammafield-simtest")]
#[command(about = "Self-gravitating quantum field sandbox: runs, scenarios and validation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one configuration.
    Run {
        /// JSON run config (defaults to the two-body scenario)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the tick count
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Override the seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Control mode: spread the field but never move entities
        #[arg(long)]
        frozen: bool,

        /// Resume from a snapshot instead of a config
        #[arg(long, conflicts_with = "config")]
        resume: Option<PathBuf>,

        /// Write a snapshot at the end of the run
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Per-tick diagnostics CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// JSON run summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Two-body attraction scenario plus its frozen control.
    Scenario {
        /// Override the tick count
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Skip the frozen control run
        #[arg(long)]
        no_control: bool,

        /// Diagnostics CSV for the moving run
        #[arg(long)]
        csv: Option<PathBuf>,

        /// JSON summaries of both runs
        #[arg(short, long, default_value = "results/two_body.json")]
        output: PathBuf,
    },

    /// Fast validation checks; exits non-zero on any failure.
    Harness,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG overrides
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            seed,
            frozen,
            resume,
            snapshot,
            csv,
            output,
        } => {
            let mut engine = match resume {
                Some(path) => {
                    let file = std::fs::File::open(&path)
                        .with_context(|| format!("opening {}", path.display()))?;
                    let engine = SimulationEngine::load(std::io::BufReader::new(file))
                        .with_context(|| format!("loading {}", path.display()))?;
                    info!("resumed '{}' at tick {}", engine.config().name, engine.tick());
                    engine
                }
                None => {
                    let mut run_config = match &config {
                        Some(path) => RunConfig::from_path(path)?,
                        None => RunConfig::default(),
                    };
                    if let Some(seed) = seed {
                        run_config.seed = seed;
                    }
                    if frozen {
                        run_config = run_config.frozen();
                    }
                    if let Some(ticks) = ticks {
                        run_config.ticks = ticks;
                    }
                    SimulationEngine::new(run_config)?
                }
            };
            if engine.tick() > 0 {
                if let Some(extra) = ticks {
                    engine.extend_ticks(extra);
                }
            }

            let summary = run_engine(&mut engine, csv.as_deref())?;
            output::print_summary(&summary);

            if let Some(path) = snapshot {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                engine
                    .save(std::io::BufWriter::new(file))
                    .with_context(|| format!("writing snapshot {}", path.display()))?;
                info!("snapshot saved to {}", path.display());
            }
            if let Some(path) = output {
                output::write_summary(&path, std::slice::from_ref(&summary))?;
                info!("summary written to {}", path.display());
            }
        }

        Commands::Scenario {
            ticks,
            no_control,
            csv,
            output,
        } => {
            let mut config = RunConfig::default();
            config.check_every_tick = false;
            if let Some(ticks) = ticks {
                config.ticks = ticks;
            }

            let mut summaries = Vec::new();
            let mut engine = SimulationEngine::new(config.clone())?;
            let moving = run_engine(&mut engine, csv.as_deref())?;
            output::print_summary(&moving);
            summaries.push(moving);

            if !no_control {
                let mut control_config = config.frozen();
                control_config.name = format!("{}-control", control_config.name);
                let mut control = SimulationEngine::new(control_config)?;
                let frozen = run_engine(&mut control, None)?;
                output::print_summary(&frozen);
                summaries.push(frozen);
            }

            output::write_summary(&output, &summaries)?;
            info!("summaries written to {}", output.display());

            let verdict = output::attraction_verdict(&summaries);
            match &verdict {
                Ok(()) => println!("\nAttraction: yes"),
                Err(e) => println!("\nAttraction check failed: {}", e),
            }
            verdict?;
        }

        Commands::Harness => {
            if !harness::run_all(cli.verbose) {
                bail!("harness reported failures");
            }
        }
    }

    Ok(())
}

/// Run to completion, streaming diagnostics to `csv` when given.
fn run_engine(
    engine: &mut SimulationEngine,
    csv: Option<&std::path::Path>,
) -> Result<RunSummary> {
    let Some(path) = csv else {
        return Ok(engine.run()?);
    };

    let mut writer = CsvDiagnostics::create(path, engine.entities().len())?;
    let mut write_error = None;
    let summary = engine.run_with(|diagnostics| {
        if write_error.is_none() {
            if let Err(e) = writer.write_row(diagnostics) {
                write_error = Some(e);
            }
        }
    })?;
    if let Some(e) = write_error {
        return Err(e);
    }
    let rows = writer.finish()?;
    info!("{} diagnostics rows written to {}", rows, path.display());
    Ok(summary)
}
