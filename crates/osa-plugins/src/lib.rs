//! Plugin chain for provisioning managed OpenShift clusters on Azure
//!
//! A resource provider calls the plugins in order:
//!
//! 1. [`Validator`] - versioned validation, then validation against the previous manifest
//! 2. [`ConfigManager`] - generates (or upgrades) the [`OpenShiftAzureConfig`]
//! 3. [`HcpManager`] - helm values for the customer control plane
//! 4. [`NodeManager`] - node pool (scale set) definitions
//! 5. [`AddOnManager`] - helm values for add-ons
//! 6. [`HealthChecker`] - waits until the cluster can be handed over
//!
//! Every plugin has a default implementation here, and [`Provisioner`] runs
//! the chain end to end.
//!
//! [`OpenShiftAzureConfig`]: osa_common::config::OpenShiftAzureConfig

#![deny(missing_docs)]

pub mod addons;
pub mod config;
pub mod hcp;
pub mod health;
pub mod nodes;
pub mod pipeline;
pub mod plugin;
pub mod validate;

mod values;

#[cfg(test)]
pub(crate) mod fixtures;

pub use addons::DefaultAddOnManager;
pub use config::{ConfigSettings, DefaultConfigManager};
pub use hcp::DefaultHcpManager;
pub use health::{DefaultHealthChecker, HealthProbe, HealthSettings, HttpProbe};
pub use nodes::DefaultNodeManager;
pub use pipeline::{ProvisionError, ProvisionOutput, ProvisionRequest, Provisioner};
pub use plugin::{AddOnManager, ConfigManager, HcpManager, HealthChecker, NodeManager, Validator};
pub use validate::{validator_for, ManifestValidator};
