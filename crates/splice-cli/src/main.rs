use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    allocate::{self, AllocateArgs},
    db::{self, DbArgs},
    plan::{self, PlanArgs},
    segment::{self, SegmentArgs},
};
use config::CliConfig;

mod commands;
mod config;
mod logging;

#[derive(Parser, Debug)]
#[command(name = "splice", about = "Strand allocation and splice matching for fiber and copper plant")]
struct Cli {
    /// Optional YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Tracing filter, e.g. `debug` or `splice_engine=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Allocate strands for a pasted list of identifiers.
    Allocate(AllocateArgs),
    /// Break a spliced range into ribbon rows.
    Segment(SegmentArgs),
    /// Build a plant from YAML in memory and emit its snapshot.
    Plan(PlanArgs),
    /// Operate on a SQLite plant database.
    Db(DbArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = CliConfig::load(cli.config.as_deref())?;
    logging::init(cli.log_level.as_deref(), config.log_filter.as_deref());
    match cli.command {
        Command::Allocate(args) => allocate::run(&args, &config),
        Command::Segment(args) => segment::run(&args, &config),
        Command::Plan(args) => plan::run(&args, &config),
        Command::Db(args) => db::run(&args, &config),
    }
}
