//! Runs the plugin chain end to end

use thiserror::Error;
use tracing::{info, warn};

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::OpenShiftAzureConfig;
use osa_common::ValidationErrors;

use crate::config::{ConfigSettings, DefaultConfigManager};
use crate::health::{DefaultHealthChecker, HealthSettings};
use crate::plugin::{AddOnManager, ConfigManager, HcpManager, HealthChecker, NodeManager};
use crate::validate::validator_for;
use crate::{DefaultAddOnManager, DefaultHcpManager, DefaultNodeManager};

/// Why a provisioning run stopped
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The manifest did not validate
    #[error("manifest is invalid: {0}")]
    Invalid(#[from] ValidationErrors),

    /// A generation stage failed
    #[error("{stage} failed: {source}")]
    Stage {
        /// Stage that failed (config, hcp, nodes, addons)
        stage: &'static str,
        /// Underlying error
        #[source]
        source: osa_common::Error,
    },
}

impl ProvisionError {
    fn stage(stage: &'static str) -> impl FnOnce(osa_common::Error) -> Self {
        move |source| Self::Stage { stage, source }
    }
}

/// Inputs of one provisioning run
#[derive(Clone, Copy, Debug)]
pub struct ProvisionRequest<'a> {
    /// Manifest to provision
    pub manifest: &'a ManagedOpenShiftCluster,
    /// Previously accepted manifest, on upgrades
    pub old: Option<&'a ManagedOpenShiftCluster>,
    /// Previously persisted config, already loaded through `config::load`
    pub existing: Option<&'a OpenShiftAzureConfig>,
}

/// Everything a run produced
#[derive(Clone, Debug)]
pub struct ProvisionOutput {
    /// Normalized manifest
    pub manifest: ManagedOpenShiftCluster,
    /// Config to persist for the next run
    pub config: OpenShiftAzureConfig,
    /// Control plane values (YAML)
    pub hcp_values: Vec<u8>,
    /// Node pool definitions (YAML)
    pub node_values: Vec<u8>,
    /// Add-on values (YAML)
    pub addon_values: Vec<u8>,
    /// Health problems; empty when healthy or when the check did not run
    pub health_errors: Vec<osa_common::Error>,
}

impl ProvisionOutput {
    /// True if no health problems were reported
    pub fn is_healthy(&self) -> bool {
        self.health_errors.is_empty()
    }
}

/// The plugin chain
///
/// Validators are picked per manifest api version; every other plugin is
/// fixed at construction.
pub struct Provisioner {
    config: Box<dyn ConfigManager>,
    hcp: Box<dyn HcpManager>,
    nodes: Box<dyn NodeManager>,
    addons: Box<dyn AddOnManager>,
    health: Box<dyn HealthChecker>,
}

impl Provisioner {
    /// Assemble a chain from explicit plugins
    pub fn new(
        config: Box<dyn ConfigManager>,
        hcp: Box<dyn HcpManager>,
        nodes: Box<dyn NodeManager>,
        addons: Box<dyn AddOnManager>,
        health: Box<dyn HealthChecker>,
    ) -> Self {
        Self {
            config,
            hcp,
            nodes,
            addons,
            health,
        }
    }

    /// The default plugins, probing health over HTTPS
    pub fn with_settings(config: ConfigSettings, health: HealthSettings) -> Self {
        Self::new(
            Box::new(DefaultConfigManager::new(config)),
            Box::new(DefaultHcpManager),
            Box::new(DefaultNodeManager),
            Box::new(DefaultAddOnManager),
            Box::new(DefaultHealthChecker::http(health)),
        )
    }

    /// Run every stage except the health check
    pub fn render(&self, request: ProvisionRequest<'_>) -> Result<ProvisionOutput, ProvisionError> {
        let manifest = validator_for(request.manifest.api_version)
            .validate(request.manifest, request.old)?;

        let config = self
            .config
            .generate(&manifest, request.existing)
            .map_err(ProvisionError::stage("config"))?;
        let hcp_values = self
            .hcp
            .generate(&manifest, &config)
            .map_err(ProvisionError::stage("hcp"))?;
        let node_values = self
            .nodes
            .generate(&manifest, &config)
            .map_err(ProvisionError::stage("nodes"))?;
        let addon_values = self
            .addons
            .generate(&manifest, &config)
            .map_err(ProvisionError::stage("addons"))?;

        info!(cluster = %manifest.name, "values rendered");
        Ok(ProvisionOutput {
            manifest,
            config,
            hcp_values,
            node_values,
            addon_values,
            health_errors: Vec::new(),
        })
    }

    /// Run the whole chain
    ///
    /// Health problems do not fail the run; they are reported in
    /// [`ProvisionOutput::health_errors`] so the caller can still persist the
    /// config.
    pub async fn provision(
        &self,
        request: ProvisionRequest<'_>,
    ) -> Result<ProvisionOutput, ProvisionError> {
        let mut output = self.render(request)?;
        output.health_errors = self.health.check(&output.manifest, &output.config).await;

        if output.is_healthy() {
            info!(cluster = %output.manifest.name, "cluster provisioned");
        } else {
            warn!(
                cluster = %output.manifest.name,
                errors = output.health_errors.len(),
                "cluster provisioned but not healthy"
            );
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::health::MockHealthProbe;
    use std::sync::Arc;
    use std::time::Duration;

    struct FailingAddOns;

    impl AddOnManager for FailingAddOns {
        fn generate(
            &self,
            _: &ManagedOpenShiftCluster,
            _: &OpenShiftAzureConfig,
        ) -> osa_common::Result<Vec<u8>> {
            Err(osa_common::Error::render("addons", "chart missing"))
        }
    }

    fn provisioner(probe: MockHealthProbe, addons: Box<dyn AddOnManager>) -> Provisioner {
        let settings = HealthSettings {
            timeout: Duration::from_millis(20),
            interval: Duration::from_millis(1),
            stability_threshold: 1,
        };
        Provisioner::new(
            Box::new(DefaultConfigManager::default()),
            Box::new(DefaultHcpManager),
            Box::new(DefaultNodeManager),
            addons,
            Box::new(DefaultHealthChecker::new(Arc::new(probe), settings)),
        )
    }

    fn request(manifest: &ManagedOpenShiftCluster) -> ProvisionRequest<'_> {
        ProvisionRequest {
            manifest,
            old: None,
            existing: None,
        }
    }

    #[tokio::test]
    async fn test_invalid_manifest_stops_the_chain() {
        let mut probe = MockHealthProbe::new();
        probe.expect_probe().never();
        let chain = provisioner(probe, Box::new(DefaultAddOnManager));

        let mut manifest = fixtures::manifest();
        manifest.properties.master_pool_profile.count = 1;

        let err = chain
            .provision(request(&manifest))
            .await
            .expect_err("invalid manifest must fail");
        assert!(matches!(err, ProvisionError::Invalid(ref errs) if errs.len() == 1));
    }

    #[tokio::test]
    async fn test_stage_error_names_the_stage() {
        let mut probe = MockHealthProbe::new();
        probe.expect_probe().never();
        let chain = provisioner(probe, Box::new(FailingAddOns));

        let manifest = fixtures::manifest();
        let err = chain
            .provision(request(&manifest))
            .await
            .expect_err("add-on failure must stop the chain");
        assert!(matches!(err, ProvisionError::Stage { stage: "addons", .. }));
        assert!(err.to_string().contains("chart missing"));
    }

    #[tokio::test]
    async fn test_health_errors_do_not_fail_the_run() {
        let mut probe = MockHealthProbe::new();
        probe
            .expect_probe()
            .returning(|_, _| Err("connection refused".to_string()));
        let chain = provisioner(probe, Box::new(DefaultAddOnManager));

        let manifest = fixtures::manifest();
        let output = chain
            .provision(request(&manifest))
            .await
            .expect("health problems are reported, not returned");
        assert!(!output.is_healthy());
        assert_eq!(output.health_errors.len(), 3);
        assert!(!output.hcp_values.is_empty());
    }

    #[test]
    fn test_render_skips_health() {
        let mut probe = MockHealthProbe::new();
        probe.expect_probe().never();
        let chain = provisioner(probe, Box::new(DefaultAddOnManager));

        let manifest = fixtures::manifest();
        let output = chain.render(request(&manifest)).expect("render should succeed");
        assert!(output.is_healthy());
        assert_eq!(output.manifest.properties.fqdn, "demo.eastus.cloudapp.azure.com");
    }
}
