//! CLI commands

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use tracing::info;

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::OpenShiftAzureConfig;
use osa_plugins::{validator_for, ConfigSettings, HealthSettings};

use crate::{Error, Result};

pub mod config;
pub mod health;
pub mod provision;
pub mod render;
pub mod schema;
pub mod validate;

/// Config manager settings shared by the commands that generate configs
#[derive(Args, Debug, Clone, Default)]
pub struct PluginSettingsArgs {
    /// Plugin version recorded in generated configs
    #[arg(long, env = "OSA_PLUGIN_VERSION")]
    pub plugin_version: Option<String>,

    /// Image reference template with ${component} and ${version} placeholders
    #[arg(long, env = "OSA_IMAGE_FORMAT")]
    pub image_format: Option<String>,
}

impl PluginSettingsArgs {
    /// Defaults overridden by whatever was given on the command line
    pub fn settings(&self) -> ConfigSettings {
        let mut settings = ConfigSettings::default();
        if let Some(v) = &self.plugin_version {
            settings.plugin_version = v.clone();
        }
        if let Some(f) = &self.image_format {
            settings.image_format = f.clone();
        }
        settings
    }
}

/// Health check settings shared by `health` and `provision`
#[derive(Args, Debug, Clone)]
pub struct HealthSettingsArgs {
    /// Seconds to wait for every endpoint to become stable
    #[arg(long = "timeout", env = "OSA_HEALTH_TIMEOUT_SECS", default_value_t = 600)]
    pub timeout_secs: u64,

    /// Seconds between probes of one endpoint
    #[arg(long = "interval", default_value_t = 2)]
    pub interval_secs: u64,

    /// Consecutive healthy probes required
    #[arg(long, default_value_t = 3)]
    pub stability_threshold: u32,
}

impl HealthSettingsArgs {
    pub fn settings(&self) -> HealthSettings {
        HealthSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            interval: Duration::from_secs(self.interval_secs),
            stability_threshold: self.stability_threshold.max(1),
        }
    }
}

/// Read a manifest from YAML or JSON
pub fn read_manifest(path: &Path) -> Result<ManagedOpenShiftCluster> {
    let input = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    Ok(ManagedOpenShiftCluster::from_yaml(&input)?)
}

/// Read a persisted config, migrating it to the current version
pub fn read_config(path: &Path) -> Result<OpenShiftAzureConfig> {
    let bytes = std::fs::read(path).map_err(|e| Error::file(path, e))?;
    Ok(osa_common::config::load(&bytes)?)
}

/// Read and validate a manifest, returning its normalized form
pub fn read_validated(path: &Path, old: Option<&Path>) -> Result<ManagedOpenShiftCluster> {
    let manifest = read_manifest(path)?;
    let old = old.map(read_manifest).transpose()?;
    Ok(validator_for(manifest.api_version).validate(&manifest, old.as_ref())?)
}

/// Write to `out`, or to stdout when no path is given
pub fn write_output(out: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, bytes).map_err(|e| Error::file(path, e))?;
            info!(path = %path.display(), bytes = bytes.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Print every error on stderr, one per line
pub(crate) fn report(title: &str, errors: impl IntoIterator<Item = impl std::fmt::Display>) {
    eprintln!("{}:", title);
    for err in errors {
        eprintln!("  - {}", err);
    }
}
