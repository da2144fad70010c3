//! Add-on values: router, registry, web console and the config sync pod

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::{CertificateName, OpenShiftAzureConfig};
use osa_common::pki::CertKeyPair;
use osa_common::{Error, Result};

use crate::plugin::AddOnManager;
use crate::values::{cert, pair, render};

const COMPONENT: &str = "addons";

/// Default [`AddOnManager`]
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAddOnManager;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddOnValues {
    router: Router,
    registry: Registry,
    web_console: WebConsole,
    sync: SyncPod,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Router {
    image: String,
    replicas: u32,
    subdomain: String,
    hostname: String,
    tls: CertKeyPair,
    node_selector: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Registry {
    image: String,
    replicas: u32,
    http_secret: String,
    tls: CertKeyPair,
    node_selector: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebConsole {
    image: String,
    replicas: u32,
    public_hostname: String,
    tls: CertKeyPair,
    ca_bundle: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncPod {
    image: String,
    plugin_version: String,
}

fn infra_selector() -> BTreeMap<String, String> {
    BTreeMap::from([("region".to_string(), "infra".to_string())])
}

impl AddOnManager for DefaultAddOnManager {
    fn generate(
        &self,
        cluster: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Result<Vec<u8>> {
        let props = &cluster.properties;
        let infra = props
            .infra_pool()
            .ok_or_else(|| Error::render(COMPONENT, "manifest has no infra pool"))?;
        let router = props
            .default_router()
            .ok_or_else(|| Error::render(COMPONENT, "manifest has no default router profile"))?;

        let values = AddOnValues {
            router: Router {
                image: config.images.router.clone(),
                replicas: infra.count,
                subdomain: router.public_subdomain.clone(),
                hostname: config.router_hostname.clone(),
                tls: pair(COMPONENT, config, CertificateName::Router)?,
                node_selector: infra_selector(),
            },
            registry: Registry {
                image: config.images.registry.clone(),
                replicas: infra.count,
                http_secret: config.secrets.registry_http_secret.clone(),
                tls: pair(COMPONENT, config, CertificateName::Registry)?,
                node_selector: infra_selector(),
            },
            web_console: WebConsole {
                image: config.images.web_console.clone(),
                replicas: props.master_pool_profile.count,
                public_hostname: props.public_hostname().to_string(),
                tls: pair(COMPONENT, config, CertificateName::OpenShiftConsole)?,
                ca_bundle: cert(COMPONENT, config, CertificateName::Ca)?,
            },
            sync: SyncPod {
                image: config.images.sync.clone(),
                plugin_version: config.plugin_version.clone(),
            },
        };

        let out = render(COMPONENT, &values)?;
        info!(cluster = %cluster.name, bytes = out.len(), "add-on values rendered");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfigManager;
    use crate::fixtures;
    use crate::plugin::ConfigManager;
    use serde_yaml::Value;

    fn render_for(cluster: &ManagedOpenShiftCluster) -> (OpenShiftAzureConfig, Value) {
        let config = DefaultConfigManager::default()
            .generate(cluster, None)
            .expect("config should generate");
        let bytes = DefaultAddOnManager
            .generate(cluster, &config)
            .expect("add-on values should render");
        (
            config,
            serde_yaml::from_slice(&bytes).expect("output should be YAML"),
        )
    }

    #[test]
    fn test_router_and_registry_follow_infra_pool() {
        let mut cluster = fixtures::validated();
        cluster.properties.agent_pool_profiles[0].count = 3;
        let (_, values) = render_for(&cluster);

        assert_eq!(values["router"]["replicas"], Value::from(3u32));
        assert_eq!(values["registry"]["replicas"], Value::from(3u32));
        assert_eq!(values["router"]["nodeSelector"]["region"], Value::from("infra"));
    }

    #[test]
    fn test_router_hostnames() {
        let (_, values) = render_for(&fixtures::validated());
        assert_eq!(values["router"]["subdomain"], Value::from("apps.demo.example.com"));
        assert_eq!(values["router"]["hostname"], Value::from("apps.demo.example.com"));
    }

    #[test]
    fn test_console_and_secrets() {
        let (config, values) = render_for(&fixtures::validated());
        let console = &values["webConsole"];
        assert_eq!(console["replicas"], Value::from(3u32));
        assert_eq!(
            console["publicHostname"],
            Value::from("demo.eastus.cloudapp.azure.com")
        );
        assert_eq!(
            console["tls"]["cert"],
            Value::from(
                config
                    .require_certificate(CertificateName::OpenShiftConsole)
                    .expect("console cert")
                    .cert
                    .as_str()
            )
        );
        assert_eq!(
            values["registry"]["httpSecret"],
            Value::from(config.secrets.registry_http_secret.as_str())
        );
        assert_eq!(
            values["sync"]["image"],
            Value::from("registry.access.redhat.com/openshift3/ose-sync:v3.11")
        );
    }

    #[test]
    fn test_manifest_without_infra_pool_fails() {
        let mut cluster = fixtures::validated();
        let (config, _) = render_for(&cluster);
        cluster.properties.agent_pool_profiles.remove(0);

        let err = DefaultAddOnManager
            .generate(&cluster, &config)
            .expect_err("no infra pool must fail");
        assert!(matches!(err, Error::Render { .. }));
    }
}
