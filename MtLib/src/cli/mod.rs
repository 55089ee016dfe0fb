//! MtLib CLI - Command-line interface for MT Framework asset tools

pub mod commands;
pub mod progress;

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use commands::{Commands, ToolContext};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mtlib")]
#[command(about = "MtLib: MT Framework model, material and texture tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Tool configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target profile (mvc3-pc, aa-pc), overrides the config
    #[arg(long, global = true)]
    target: Option<String>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Run the MtLib CLI
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let context = ToolContext::load(cli.config.as_deref(), cli.target.as_deref())?;
    cli.command.execute(&context)?;

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mtlib={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
