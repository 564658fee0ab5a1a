//! agent-demo
//!
//! Runs the catalog's structured agents from the command line.
//!
//! ```text
//! agent-demo list
//! agent-demo providers
//! agent-demo run lead_qualifier --set industry=healthcare
//! agent-demo run expense_splitter --offline
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); demo output goes to stdout.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use agent_runtime::credentials;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    match credentials::load_bash_secrets() {
        Ok(0) => {}
        Ok(loaded) => tracing::debug!(loaded, "Loaded keys from ~/.bash_secrets"),
        Err(e) => tracing::warn!("Could not read ~/.bash_secrets: {e}"),
    }

    cli::Cli::parse().run().await
}
