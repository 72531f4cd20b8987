//! Amped CLI - HTML to AMP conversion.
//!
//! Provides commands for:
//! - `convert`: Convert an HTML fragment to AMP markup
//! - `dimensions`: Resolve remote image sizes through the dimension cache

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConvertArgs, DimensionsArgs};
use output::Output;

/// Amped - HTML to AMP conversion.
#[derive(Parser)]
#[command(name = "amped", version, about)]
struct Cli {
    /// Enable verbose output (configuration and stage logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert HTML to AMP markup.
    Convert(ConvertArgs),
    /// Resolve image dimensions for one or more URLs.
    Dimensions(DimensionsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Dimensions(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
