//! Common types for the OpenShift-on-Azure plugin chain: manifests, configs, PKI and errors

#![deny(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod pki;

pub use error::{Error, ValidationErrors};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Version of the persisted `OpenShiftAzureConfig` format written by this build
pub const CONFIG_VERSION: u32 = 2;

/// Default Kubernetes service network
pub const DEFAULT_SERVICE_CIDR: &str = "172.30.0.0/16";

/// Default pod (cluster) network
pub const DEFAULT_CLUSTER_NETWORK_CIDR: &str = "10.128.0.0/14";

/// Default in-cluster DNS domain
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";

/// Number of masters every cluster runs
pub const MASTER_COUNT: u32 = 3;
