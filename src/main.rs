mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use skuforge::{config, runner};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            // Verbose mode: trace for the engine crates, debug for providers
            "skuforge=trace,skuforge_pipeline=trace,skuforge_chain=trace,skuforge_providers=debug,skuforge_core=debug".to_string()
        } else {
            // Normal mode: debug for the app and pipeline, info elsewhere
            "skuforge=debug,skuforge_pipeline=debug,skuforge_chain=info,skuforge_providers=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    match cli.command {
        Commands::Run { feed, limit } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(runner::run_batch(
                cli.config.as_deref(),
                feed.as_deref(),
                limit,
            ))
        }
        Commands::Stream => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(runner::run_stream(cli.config.as_deref()))
        }
        Commands::Check => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(runner::run_check(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("skuforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!(
                "  Feed: {} (delimiter {:?})",
                config.feed.path, config.feed.delimiter
            );
            println!("  Warehouse: {}", config.warehouse.path);
            println!(
                "  Embedding: {} (dimension {})",
                config.embedding.endpoint.as_deref().unwrap_or("stub"),
                config.embedding.dimension
            );
            println!("  Generation enabled: {}", config.generation.enabled);
            println!("  Max parallelism: {}", config.pipeline.max_parallelism);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = skuforge_core::Config::default();
            println!("Default config:");
            println!("  Feed: {}", config.feed.path);
            println!("  Warehouse: {}", config.warehouse.path);
        }
    }

    Ok(())
}
