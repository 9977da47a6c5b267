use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skuforge")]
#[command(author, version, about = "Product catalog enrichment engine")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the enrichment pipeline over a feed file
    Run {
        /// Feed file to read (overrides the configured path)
        #[arg(long)]
        feed: Option<PathBuf>,

        /// Stop after this many data rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Run the pipeline continuously over rows arriving on stdin
    Stream,

    /// Run the setup chain and report what it could and could not do
    Check,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default locations if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
