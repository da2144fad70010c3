//! osa provision - run the whole plugin chain
//!
//! Writes the normalized manifest, the config and every values document to
//! the output directory. The config is written even when the cluster does not
//! become healthy so that a retry reuses its certificates and secrets.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{info, warn};

use osa_plugins::{ProvisionOutput, ProvisionRequest, Provisioner};

use super::{read_config, read_manifest, report, HealthSettingsArgs, PluginSettingsArgs};
use crate::{Error, Result};

pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const CONFIG_FILE: &str = "config.json";
pub const HCP_VALUES_FILE: &str = "hcp-values.yaml";
pub const NODE_VALUES_FILE: &str = "node-values.yaml";
pub const ADDON_VALUES_FILE: &str = "addon-values.yaml";

/// Provision (or upgrade) a cluster
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Manifest to provision
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Previously accepted manifest, on upgrades
    #[arg(long)]
    pub old: Option<PathBuf>,

    /// Config persisted by a previous run
    #[arg(long)]
    pub existing: Option<PathBuf>,

    /// Directory to write outputs to (created if missing)
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,

    /// Render everything but do not wait for health
    #[arg(long)]
    pub skip_health: bool,

    #[command(flatten)]
    pub settings: PluginSettingsArgs,

    #[command(flatten)]
    pub health: HealthSettingsArgs,
}

pub async fn run(args: ProvisionArgs) -> Result<()> {
    let manifest = read_manifest(&args.file)?;
    let old = args.old.as_deref().map(read_manifest).transpose()?;
    let existing = args.existing.as_deref().map(read_config).transpose()?;

    let provisioner = Provisioner::with_settings(args.settings.settings(), args.health.settings());
    let request = ProvisionRequest {
        manifest: &manifest,
        old: old.as_ref(),
        existing: existing.as_ref(),
    };

    let output = if args.skip_health {
        provisioner.render(request)?
    } else {
        provisioner.provision(request).await?
    };
    write_outputs(&args.out_dir, &output)?;

    if !output.is_healthy() {
        report("cluster is not healthy", &output.health_errors);
        return Err(Error::Unhealthy {
            count: output.health_errors.len(),
        });
    }
    if args.skip_health {
        warn!(cluster = %output.manifest.name, "health check skipped");
    }
    Ok(())
}

fn write_outputs(dir: &Path, output: &ProvisionOutput) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::file(dir, e))?;

    let files: [(&str, Vec<u8>); 5] = [
        (MANIFEST_FILE, output.manifest.to_yaml()?.into_bytes()),
        (CONFIG_FILE, output.config.to_bytes()?),
        (HCP_VALUES_FILE, output.hcp_values.clone()),
        (NODE_VALUES_FILE, output.node_values.clone()),
        (ADDON_VALUES_FILE, output.addon_values.clone()),
    ];
    for (name, bytes) in files {
        let path = dir.join(name);
        std::fs::write(&path, bytes).map_err(|e| Error::file(&path, e))?;
    }

    info!(dir = %dir.display(), cluster = %output.manifest.name, "outputs written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{fixtures, read_config, read_manifest};

    fn args(dir: &Path) -> ProvisionArgs {
        ProvisionArgs {
            file: fixtures::write_manifest(dir),
            old: None,
            existing: None,
            out_dir: dir.join("out"),
            skip_health: true,
            settings: PluginSettingsArgs::default(),
            health: HealthSettingsArgs {
                timeout_secs: 0,
                interval_secs: 0,
                stability_threshold: 1,
            },
        }
    }

    #[tokio::test]
    async fn test_skip_health_writes_every_output() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        run(args(dir.path())).await.expect("render should succeed");

        let out = dir.path().join("out");
        for name in [
            MANIFEST_FILE,
            CONFIG_FILE,
            HCP_VALUES_FILE,
            NODE_VALUES_FILE,
            ADDON_VALUES_FILE,
        ] {
            assert!(out.join(name).is_file(), "{} should be written", name);
        }

        let manifest = read_manifest(&out.join(MANIFEST_FILE)).expect("manifest should load");
        assert_eq!(manifest.properties.fqdn, "demo.eastus.cloudapp.azure.com");
    }

    // === Story: an upgrade run reuses the persisted config ===
    #[tokio::test]
    async fn test_upgrade_reuses_persisted_config() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        run(args(dir.path())).await.expect("first run should succeed");
        let first = read_config(&dir.path().join("out").join(CONFIG_FILE))
            .expect("config should load");

        let upgrade = ProvisionArgs {
            old: Some(dir.path().join("cluster.yaml")),
            existing: Some(dir.path().join("out").join(CONFIG_FILE)),
            out_dir: dir.path().join("upgrade"),
            ..args(dir.path())
        };
        run(upgrade).await.expect("upgrade should succeed");

        let second = read_config(&dir.path().join("upgrade").join(CONFIG_FILE))
            .expect("config should load");
        assert_eq!(first.certificates, second.certificates);
        assert_eq!(first.secrets, second.secrets);
    }

    #[tokio::test]
    async fn test_invalid_manifest_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let mut args = args(dir.path());
        std::fs::write(
            &args.file,
            fixtures::CLUSTER_YAML.replace("count: 3", "count: 2"),
        )
        .expect("manifest should be written");
        args.out_dir = dir.path().join("never");

        let err = run(args).await.expect_err("two masters must be rejected");
        assert!(matches!(err, Error::Provision(_)), "got {}", err);
        assert!(!dir.path().join("never").exists());
    }
}
