mod config;
mod progress;
mod steps;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use objectstore::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "manualtest",
    version,
    about = "Round-trip a test object through an objectstore base path"
)]
struct Cli {
    /// Base path to test with, e.g. s3://bucket/prefix or blob://account/container
    #[arg(short = 'o', long = "object")]
    base_path: String,

    /// Object name below the base path
    #[arg(long, default_value = steps::DEFAULT_NAME)]
    name: String,

    /// Run all steps without asking
    #[arg(short, long)]
    yes: bool,

    /// Adapter configuration (TOML); defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("ERROR: {err:#}");
        std::process::exit(-1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let store = Store::with_config(&cli.base_path, &config)
        .with_context(|| format!("cannot open '{}'", cli.base_path))?;
    info!(kind = %store.kind(), location = %store.location(), "testing object store");

    steps::run(&store, &cli.name, !cli.yes).await
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["manualtest", "-o", "s3://bucket/prefix"]).unwrap();
        assert_eq!(cli.base_path, "s3://bucket/prefix");
        assert_eq!(cli.name, steps::DEFAULT_NAME);
        assert!(!cli.yes);
        assert!(cli.config.is_none());
    }

    #[test]
    fn base_path_is_required() {
        assert!(Cli::try_parse_from(["manualtest", "--yes"]).is_err());
    }
}
