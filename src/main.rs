use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use swarmdyn::manager::Manager;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Directory containing `config.toml`.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new run.
    Create,

    /// Continue an existing run from its checkpoint.
    Resume {
        #[arg(long)]
        run_idx: usize,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Create => mgr.run_simulation(None)?,
        Command::Resume { run_idx } => mgr.run_simulation(Some(run_idx))?,
    }

    Ok(())
}
