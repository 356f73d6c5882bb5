#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter running headless arena sessions.
//!
//! `arena defence` builds a tower layout and plays waves against it;
//! `arena drive` breeds generations of neural drivers on a track. Both read
//! an optional TOML configuration and print a summary when done.

mod config;
mod defence;
mod drive;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::ArenaConfig;
use defence::DefenceSession;
use drive::DriveSession;

/// Seconds a generation may last when neither the config nor the flags cap it.
const DEFAULT_GENERATION_SECONDS: f32 = 30.0;

#[derive(Parser, Debug)]
#[command(name = "arena", about = "Headless tower defence and neuro-evolution driving")]
struct Cli {
    /// TOML file overriding the default configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Play waves against the configured tower layout
    Defence(DefenceArgs),
    /// Evolve neural drivers on a track
    Drive(DriveArgs),
}

#[derive(Args, Debug)]
struct DefenceArgs {
    /// Number of waves to play
    #[arg(long, default_value_t = 3)]
    waves: u32,
    /// Upper bound on simulated frames
    #[arg(long, default_value_t = 200_000)]
    max_ticks: u64,
    /// Seed for wave composition
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct DriveArgs {
    /// Number of generations to evolve
    #[arg(long, default_value_t = 5)]
    generations: u32,
    /// Upper bound on simulated frames
    #[arg(long, default_value_t = 500_000)]
    max_ticks: u64,
    /// Track identifier
    #[arg(long)]
    track: Option<String>,
    /// TOML file with additional `[[tracks]]`
    #[arg(long)]
    track_file: Option<PathBuf>,
    /// Cars per generation
    #[arg(long)]
    population: Option<usize>,
    /// Simulated seconds after which a generation ends
    #[arg(long)]
    generation_seconds: Option<f32>,
    /// Seed for the initial population and evolution
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();
    let mut config = ArenaConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.mode {
        Mode::Defence(args) => {
            if let Some(seed) = args.seed {
                config.spawning.seed = seed;
            }
            let mut session = DefenceSession::new(&config);
            let summary = session.run(&config.defence.towers, args.waves, args.max_ticks);
            println!("{summary}");
        }
        Mode::Drive(args) => {
            if let Some(track) = args.track {
                config.driving.track = track;
            }
            if let Some(population) = args.population {
                config.driving.population = population;
            }
            if let Some(seed) = args.seed {
                config.driving.seed = seed;
            }
            config.driving.generation_time_limit = args
                .generation_seconds
                .or(config.driving.generation_time_limit)
                .or(Some(DEFAULT_GENERATION_SECONDS));

            let mut session = DriveSession::new(&config, args.track_file.as_deref())?;
            let summary = session.run(args.generations, args.max_ticks)?;
            println!("{summary}");
        }
    }
    Ok(())
}
