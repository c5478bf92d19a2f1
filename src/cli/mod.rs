//! CLI interface for poly-history
//!
//! Provides subcommands for:
//! - `export`: Run the full history export (default)
//! - `lookup`: Show best bid/ask for every outcome of one event
//! - `config`: Show the effective configuration

mod export;
mod lookup;

pub use export::ExportArgs;
pub use lookup::LookupArgs;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "poly-history")]
#[command(about = "Export historical Polymarket price data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file; defaults are used when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover markets, fetch price history and export it
    Export(ExportArgs),
    /// Show best bid/ask for an event given its slug or URL
    Lookup(LookupArgs),
    /// Show the effective configuration
    Config,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Export(ExportArgs::default())
    }
}
