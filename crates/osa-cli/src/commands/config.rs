//! osa config - generate or upgrade the cluster config

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use osa_plugins::{ConfigManager, DefaultConfigManager};

use super::{read_config, read_validated, write_output, PluginSettingsArgs};
use crate::Result;

/// Generate the cluster config
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Manifest to generate the config for
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Config persisted by a previous run; its secrets and certificates are kept
    #[arg(long)]
    pub existing: Option<PathBuf>,

    /// Write the config here instead of stdout
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub settings: PluginSettingsArgs,
}

pub async fn run(args: ConfigArgs) -> Result<()> {
    let manifest = read_validated(&args.file, None)?;
    let existing = args.existing.as_deref().map(read_config).transpose()?;

    let manager = DefaultConfigManager::new(args.settings.settings());
    let config = manager.generate(&manifest, existing.as_ref())?;
    info!(
        cluster = %manifest.name,
        upgrade = existing.is_some(),
        certificates = config.certificates.len(),
        "config generated"
    );

    write_output(args.out.as_ref(), &config.to_bytes()?)
}
