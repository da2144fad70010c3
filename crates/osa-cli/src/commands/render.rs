//! osa render - produce control plane, node or add-on values

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use osa_plugins::{
    AddOnManager, DefaultAddOnManager, DefaultHcpManager, DefaultNodeManager, HcpManager,
    NodeManager,
};

use super::{read_config, read_validated, write_output};
use crate::Result;

/// Values document to render
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Hosted control plane helm values
    Hcp,
    /// Node pool scale sets
    Nodes,
    /// Router, registry, console and sync pod values
    Addons,
}

/// Render values from a manifest and its config
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// What to render
    #[arg(value_enum)]
    pub target: Target,

    /// Manifest (YAML or JSON)
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Config produced by `osa config`
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Write the values here instead of stdout
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,
}

pub async fn run(args: RenderArgs) -> Result<()> {
    let manifest = read_validated(&args.file, None)?;
    let config = read_config(&args.config)?;

    let values = match args.target {
        Target::Hcp => DefaultHcpManager.generate(&manifest, &config)?,
        Target::Nodes => DefaultNodeManager.generate(&manifest, &config)?,
        Target::Addons => DefaultAddOnManager.generate(&manifest, &config)?,
    };
    info!(cluster = %manifest.name, target = ?args.target, "values rendered");

    write_output(args.out.as_ref(), &values)
}
