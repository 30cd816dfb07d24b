//! Sociograph CLI
//!
//! Menu-driven demo shell over a social-network graph:
//! - apply the static schema
//! - ingest the CSV dataset (entities first, then relationships)
//! - run canned analytical queries
//! - drop all data

use anyhow::{Context, Result};
use clap::Parser;
use sociograph_client::DgraphClient;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod menu;
mod queries;

#[derive(Parser)]
#[command(name = "sociograph")]
#[command(author, version, about = "Social-network graph demo: CSV ingestion and canned queries")]
struct Cli {
    /// Graph service HTTP endpoint. Falls back to $DGRAPH_URL, then the
    /// default local Alpha.
    #[arg(long)]
    endpoint: Option<String>,

    /// Directory containing the CSV dataset.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let endpoint = cli
        .endpoint
        .or_else(|| env::var(sociograph_client::ENDPOINT_ENV).ok())
        .unwrap_or_else(|| sociograph_client::DEFAULT_ENDPOINT.to_string());

    let client = DgraphClient::new(&endpoint);
    client
        .check_health()
        .await
        .with_context(|| format!("cannot reach graph service at {endpoint}"))?;
    tracing::info!(endpoint = %endpoint, "connected to graph service");

    menu::run(&client, &cli.data_dir).await
}
