use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hatena_core::Config;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// MCP server exposing a Hatena Blog over stdio
#[derive(Debug, Parser)]
#[command(name = "hatena-mcp", version, about)]
struct Cli {
    /// Configuration file (defaults to the platform config dir)
    #[arg(long, env = "HATENA_MCP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for cached entries
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn initialize_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    // stdout carries the protocol
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    if cli.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load_with(cli.config.as_deref(), |key| std::env::var(key).ok())
        .context("failed to load configuration")?;
    if let Some(dir) = &cli.cache_dir {
        config.cache.dir.clone_from(dir);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    let config = load_config(&cli)?;
    hatena_mcp::serve_stdio(&config).await?;
    Ok(())
}
