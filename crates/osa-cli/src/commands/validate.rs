//! osa validate - check a manifest and print its normalized form

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{read_validated, report, write_output};
use crate::{Error, Result};

/// Validate a manifest
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Manifest to validate (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Previously accepted manifest; enables upgrade checks
    #[arg(long)]
    pub old: Option<PathBuf>,
}

pub async fn run(args: ValidateArgs) -> Result<()> {
    let manifest = match read_validated(&args.file, args.old.as_deref()) {
        Ok(manifest) => manifest,
        Err(Error::Invalid(errs)) => {
            report("manifest is invalid", errs.iter());
            return Err(Error::Invalid(errs));
        }
        Err(e) => return Err(e),
    };
    info!(
        cluster = %manifest.name,
        upgrade = args.old.is_some(),
        "manifest is valid"
    );
    write_output(None, manifest.to_yaml()?.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[tokio::test]
    async fn test_valid_manifest_passes() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let file = fixtures::write_manifest(dir.path());

        run(ValidateArgs { file, old: None })
            .await
            .expect("fixture should validate");
    }

    #[tokio::test]
    async fn test_immutable_change_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let old = fixtures::write_manifest(dir.path());
        let file = dir.path().join("new.yaml");
        std::fs::write(
            &file,
            fixtures::CLUSTER_YAML.replace("location: eastus", "location: westus"),
        )
        .expect("manifest should be written");

        let err = run(ValidateArgs {
            file,
            old: Some(old),
        })
        .await
        .expect_err("location change must be rejected");

        match err {
            Error::Invalid(errs) => {
                let fields: Vec<_> = errs.iter().filter_map(|e| e.field()).collect();
                assert!(fields.contains(&"location"), "fields: {:?}", fields);
            }
            other => panic!("expected validation failure, got {}", other),
        }
    }
}
