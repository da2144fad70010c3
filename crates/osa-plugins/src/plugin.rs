//! Plugin contracts
//!
//! Each stage of the chain is a trait so that the resource provider can swap
//! implementations per release. All plugins take the manifest by reference and
//! never mutate their inputs; the config is owned and persisted by the caller.

use async_trait::async_trait;

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::OpenShiftAzureConfig;
use osa_common::{Error, Result, ValidationErrors};

/// First plugin in the chain.
///
/// The new manifest is validated against the rules of its api version first.
/// Only if that passes is it normalized and validated against the previous
/// state of the world (`old`). Because versioned rules change with api
/// versions, validators are obtained through an api-version-aware factory
/// ([`crate::validator_for`]).
pub trait Validator: Send + Sync {
    /// Validate `new`, returning the normalized manifest or every error found
    fn validate(
        &self,
        new: &ManagedOpenShiftCluster,
        old: Option<&ManagedOpenShiftCluster>,
    ) -> std::result::Result<ManagedOpenShiftCluster, ValidationErrors>;
}

/// Generates or upgrades the config.
///
/// The config is a superset of the configuration every later plugin needs.
/// When a config already exists for the cluster it is passed in so its values
/// (certificates, secrets) carry over. A new config is always returned.
pub trait ConfigManager: Send + Sync {
    /// Produce the config for `manifest`
    fn generate(
        &self,
        manifest: &ManagedOpenShiftCluster,
        existing: Option<&OpenShiftAzureConfig>,
    ) -> Result<OpenShiftAzureConfig>;
}

/// Generates the helm values for the customer control plane.
pub trait HcpManager: Send + Sync {
    /// Render control-plane values as YAML
    fn generate(
        &self,
        manifest: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Result<Vec<u8>>;
}

/// Generates the node pool definitions.
pub trait NodeManager: Send + Sync {
    /// Render node pool definitions as YAML
    fn generate(
        &self,
        manifest: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Result<Vec<u8>>;
}

/// Generates the helm values for add-ons. Kept apart from [`HcpManager`] for clarity.
pub trait AddOnManager: Send + Sync {
    /// Render add-on values as YAML
    fn generate(
        &self,
        manifest: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Result<Vec<u8>>;
}

/// Decides whether a cluster may be handed over to the customer.
///
/// Implementations check that every created component is running and may wait
/// for some time to confirm it stays that way.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Every problem found; empty means healthy
    async fn check(
        &self,
        manifest: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Vec<Error>;
}
