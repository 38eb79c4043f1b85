use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pmatrix::manager::{DEFAULT_SEED, Manager};
use std::{path::PathBuf, time::Instant};

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// 64-bit seed, 0 draws a random one.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a MessagePack report of the runs to this file.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate a randomly generated scenario.
    Random,

    /// Simulate the scenario stored in a TOML file.
    Run {
        #[arg(long)]
        model: PathBuf,
    },

    /// Fit weights to observed outcomes and simulate both fitted regimes.
    Fit {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let start = Instant::now();
    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
    log::info!("finished in {:.3?}", start.elapsed());
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.config.as_deref(), args.seed, args.out)
        .context("failed to construct mgr")?;

    match args.command {
        Command::Random => mgr.simulate_random()?,
        Command::Run { model } => mgr.simulate_file(model)?,
        Command::Fit { file } => mgr.fit_file(file)?,
    }

    Ok(())
}
