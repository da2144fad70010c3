//! osa health - wait until a provisioned cluster is healthy

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use osa_plugins::{DefaultHealthChecker, HealthChecker};

use super::{read_config, read_validated, report, HealthSettingsArgs};
use crate::{Error, Result};

/// Wait for cluster health
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Manifest of the cluster
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Config the cluster was provisioned with
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    #[command(flatten)]
    pub health: HealthSettingsArgs,
}

pub async fn run(args: HealthArgs) -> Result<()> {
    let manifest = read_validated(&args.file, None)?;
    let config = read_config(&args.config)?;

    let checker = DefaultHealthChecker::http(args.health.settings());
    let errors = checker.check(&manifest, &config).await;
    if !errors.is_empty() {
        report("cluster is not healthy", &errors);
        return Err(Error::Unhealthy {
            count: errors.len(),
        });
    }

    info!(cluster = %manifest.name, "cluster is healthy");
    Ok(())
}
