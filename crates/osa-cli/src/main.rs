//! osa CLI
//!
//! Runs the OpenShift-on-Azure plugin chain on manifest and config files.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use osa_cli::{Cli, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for rendered documents
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    cli.run().await
}
