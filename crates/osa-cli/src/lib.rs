//! osa CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// osa - OpenShift on Azure provisioning plugins
#[derive(Parser, Debug)]
#[command(name = "osa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a manifest, optionally as an upgrade of an older one
    Validate(commands::validate::ValidateArgs),

    /// Generate (or upgrade) the cluster config
    Config(commands::config::ConfigArgs),

    /// Render control plane, node or add-on values
    Render(commands::render::RenderArgs),

    /// Wait until a provisioned cluster is healthy
    Health(commands::health::HealthArgs),

    /// Run the whole chain and write every output to a directory
    Provision(commands::provision::ProvisionArgs),

    /// Print the JSON schema of the manifest
    Schema,
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Validate(args) => commands::validate::run(args).await,
            Commands::Config(args) => commands::config::run(args).await,
            Commands::Render(args) => commands::render::run(args).await,
            Commands::Health(args) => commands::health::run(args).await,
            Commands::Provision(args) => commands::provision::run(args).await,
            Commands::Schema => commands::schema::run().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_target_is_parsed() {
        let cli = Cli::try_parse_from(["osa", "render", "nodes", "-f", "m.yaml", "-c", "c.json"])
            .expect("render should parse");
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.target, commands::render::Target::Nodes);
                assert!(args.out.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_render_target_is_rejected() {
        let result =
            Cli::try_parse_from(["osa", "render", "kubelet", "-f", "m.yaml", "-c", "c.json"]);
        assert!(result.is_err());
    }
}
