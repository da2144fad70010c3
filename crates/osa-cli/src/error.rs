//! Error types for the CLI

use std::path::PathBuf;

use osa_common::ValidationErrors;
use osa_plugins::ProvisionError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Plugin(#[from] osa_common::Error),

    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("cluster is not healthy: {count} problem(s)")]
    Unhealthy { count: usize },
}

impl Error {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}
