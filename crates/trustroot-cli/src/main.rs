//! `trustroot` command-line tool.
//!
//! Opens the shared API store and the private home store (both SQLite)
//! and runs one controller operation against them.

mod cli;
mod commands;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trustroot::store::SqliteStore;
use trustroot::{Environment, TrustConfig};

use crate::cli::Cli;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn,trustroot=info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => TrustConfig::load(path)
            .await
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrustConfig::default(),
    };

    let api = SqliteStore::open(&cli.api)
        .with_context(|| format!("opening API store {}", cli.api.display()))?;
    let home = SqliteStore::open(&cli.home)
        .with_context(|| format!("opening home store {}", cli.home.display()))?;
    info!(api = %cli.api.display(), home = %cli.home.display(), "stores opened");

    let env = Environment::new(Arc::new(api), Arc::new(home), config);
    commands::run(&env, cli.command).await
}
