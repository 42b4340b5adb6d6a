//! # sonarsim
//!
//! Runs a sonar scenario headless. Without `--scenario` the bundled harbour
//! scene with one sonar of each kind is used. With `--out` every delivered
//! frame is written as PNG. Built with `--features gpu` the kernels run on
//! the first wgpu adapter found, otherwise on the CPU.

mod app;
mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::scenario::{Scenario, DEFAULT_SCENARIO};

#[derive(Parser)]
#[command(name = "sonarsim", about = "Synthetic sonar scenario runner")]
struct Cli {
    /// Scenario JSON file
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 100)]
    ticks: u32,
    /// Directory receiving the PNG frames
    #[arg(long)]
    out: Option<PathBuf>,
    /// Noise seed; sensors get consecutive seeds from it
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::parse(DEFAULT_SCENARIO)?,
    };
    app::run(
        scenario,
        &app::RunOptions {
            ticks: cli.ticks,
            out_dir: cli.out,
            seed: cli.seed,
        },
    )
}
