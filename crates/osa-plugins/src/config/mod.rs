//! Config generation
//!
//! Turns a validated manifest into an [`OpenShiftAzureConfig`]. On upgrades
//! the previous config is passed in and everything that is still valid
//! (certificate authorities, leaves, secrets) is carried over unchanged.

mod certs;

pub(crate) use certs::master_hostname;

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::{ImageConfig, OpenShiftAzureConfig, Secrets};
use osa_common::{
    Error, Result, CONFIG_VERSION, DEFAULT_CLUSTER_DOMAIN, DEFAULT_CLUSTER_NETWORK_CIDR,
    DEFAULT_SERVICE_CIDR,
};

use crate::plugin::ConfigManager;

/// Default image reference template
pub const DEFAULT_IMAGE_FORMAT: &str =
    "registry.access.redhat.com/openshift3/ose-${component}:${version}";

/// Length of generated secrets before encoding
const SECRET_BYTES: usize = 32;

/// Settings of the default config manager
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSettings {
    /// Recorded in every config this manager writes
    pub plugin_version: String,
    /// Image reference template with `${component}` and `${version}`
    pub image_format: String,
    /// Marketplace offer of the node image
    pub image_offer: String,
    /// Marketplace publisher of the node image
    pub image_publisher: String,
    /// Marketplace SKU of the node image
    pub image_sku: String,
    /// Marketplace version of the node image
    pub image_version: String,
}

impl Default for ConfigSettings {
    fn default() -> Self {
        Self {
            plugin_version: format!("v{}", env!("CARGO_PKG_VERSION")),
            image_format: DEFAULT_IMAGE_FORMAT.to_string(),
            image_offer: "osa".to_string(),
            image_publisher: "redhat".to_string(),
            image_sku: "osa_311".to_string(),
            image_version: "latest".to_string(),
        }
    }
}

/// Default [`ConfigManager`]
#[derive(Clone, Debug, Default)]
pub struct DefaultConfigManager {
    settings: ConfigSettings,
}

impl DefaultConfigManager {
    /// Create a config manager with the given settings
    pub fn new(settings: ConfigSettings) -> Self {
        Self { settings }
    }

    /// Settings in use
    pub fn settings(&self) -> &ConfigSettings {
        &self.settings
    }
}

impl ConfigManager for DefaultConfigManager {
    fn generate(
        &self,
        cluster: &ManagedOpenShiftCluster,
        existing: Option<&OpenShiftAzureConfig>,
    ) -> Result<OpenShiftAzureConfig> {
        let settings = &self.settings;
        let props = &cluster.properties;

        if let Some(existing) = existing {
            if existing.version != CONFIG_VERSION {
                return Err(Error::config(format!(
                    "existing config is version {}, expected {}; load it through config::load",
                    existing.version, CONFIG_VERSION
                )));
            }
        }

        let router_hostname = props
            .default_router()
            .map(|r| {
                r.fqdn
                    .clone()
                    .unwrap_or_else(|| r.public_subdomain.clone())
            })
            .ok_or_else(|| Error::config("manifest has no default router profile"))?;

        let mut config = OpenShiftAzureConfig {
            version: CONFIG_VERSION,
            plugin_version: settings.plugin_version.clone(),
            image_offer: settings.image_offer.clone(),
            image_publisher: settings.image_publisher.clone(),
            image_sku: settings.image_sku.clone(),
            image_version: settings.image_version.clone(),
            images: resolve_images(&settings.image_format, &props.openshift_version)?,
            certificates: Default::default(),
            secrets: Secrets::default(),
            service_cidr: DEFAULT_SERVICE_CIDR.to_string(),
            cluster_network_cidr: DEFAULT_CLUSTER_NETWORK_CIDR.to_string(),
            cluster_domain: DEFAULT_CLUSTER_DOMAIN.to_string(),
            master_internal_hostname: String::new(),
            router_hostname,
        };
        config.master_internal_hostname =
            format!("{}-master.{}", cluster.name, config.cluster_domain);

        config.secrets = reconcile_secrets(existing.map(|c| &c.secrets))?;

        let specs = certs::leaf_specs(cluster, &config)?;
        config.certificates = certs::reconcile(&specs, existing.map(|c| &c.certificates))?;

        info!(
            cluster = %cluster.name,
            plugin_version = %config.plugin_version,
            upgrade = existing.is_some(),
            certificates = config.certificates.len(),
            "config generated"
        );
        Ok(config)
    }
}

/// Expand the image template for every component
fn resolve_images(format: &str, openshift_version: &str) -> Result<ImageConfig> {
    if !format.contains("${component}") {
        return Err(Error::config(format!(
            "image format {:?} has no ${{component}} placeholder",
            format
        )));
    }
    let image = |component: &str| {
        format
            .replace("${component}", component)
            .replace("${version}", openshift_version)
    };

    Ok(ImageConfig {
        format: format.to_string(),
        etcd: image("etcd"),
        control_plane: image("control-plane"),
        node: image("node"),
        router: image("haproxy-router"),
        registry: image("docker-registry"),
        web_console: image("web-console"),
        sync: image("sync"),
    })
}

fn reconcile_secrets(existing: Option<&Secrets>) -> Result<Secrets> {
    Ok(Secrets {
        session_auth_secret: keep_or_generate(
            existing.map(|s| s.session_auth_secret.as_str()),
            "sessionAuthSecret",
        )?,
        session_encryption_secret: keep_or_generate(
            existing.map(|s| s.session_encryption_secret.as_str()),
            "sessionEncryptionSecret",
        )?,
        registry_http_secret: keep_or_generate(
            existing.map(|s| s.registry_http_secret.as_str()),
            "registryHttpSecret",
        )?,
        admin_password: keep_or_generate(
            existing.map(|s| s.admin_password.as_str()),
            "adminPassword",
        )?,
    })
}

fn keep_or_generate(existing: Option<&str>, name: &str) -> Result<String> {
    match existing.filter(|v| !v.is_empty()) {
        Some(value) => Ok(value.to_string()),
        None => {
            debug!(secret = name, "generating secret");
            random_secret()
        }
    }
}

fn random_secret() -> Result<String> {
    let mut raw = [0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut raw)
        .map_err(|e| Error::internal("secrets", format!("random generation failed: {}", e)))?;
    Ok(STANDARD.encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use osa_common::config::CertificateName;
    use osa_common::pki::{CertificateAuthority, CertificateInfo};

    fn generate(existing: Option<&OpenShiftAzureConfig>) -> OpenShiftAzureConfig {
        DefaultConfigManager::default()
            .generate(&fixtures::validated(), existing)
            .expect("config should generate")
    }

    #[test]
    fn test_new_config_has_every_certificate_and_secret() {
        let config = generate(None);

        assert_eq!(config.version, CONFIG_VERSION);
        for name in CertificateName::CAS
            .into_iter()
            .chain(CertificateName::LEAVES)
        {
            assert!(config.certificate(name).is_some(), "missing {}", name);
        }
        for secret in [
            &config.secrets.session_auth_secret,
            &config.secrets.session_encryption_secret,
            &config.secrets.registry_http_secret,
            &config.secrets.admin_password,
        ] {
            let raw = STANDARD.decode(secret).expect("secret should be base64");
            assert_eq!(raw.len(), SECRET_BYTES);
        }
        assert_ne!(
            config.secrets.session_auth_secret,
            config.secrets.session_encryption_secret
        );
    }

    #[test]
    fn test_static_values() {
        let config = generate(None);
        assert_eq!(config.service_cidr, "172.30.0.0/16");
        assert_eq!(config.cluster_network_cidr, "10.128.0.0/14");
        assert_eq!(config.master_internal_hostname, "demo-master.cluster.local");
        assert_eq!(config.router_hostname, "apps.demo.example.com");
        assert_eq!(config.image_sku, "osa_311");
    }

    #[test]
    fn test_images_follow_openshift_version() {
        let config = generate(None);
        assert_eq!(
            config.images.control_plane,
            "registry.access.redhat.com/openshift3/ose-control-plane:v3.11"
        );
        assert_eq!(
            config.images.router,
            "registry.access.redhat.com/openshift3/ose-haproxy-router:v3.11"
        );
    }

    #[test]
    fn test_image_format_without_component_is_rejected() {
        assert!(resolve_images("registry.example.com/static:latest", "v3.11").is_err());
        let images = resolve_images("quay.io/osa/${component}:${version}", "v3.10")
            .expect("format should resolve");
        assert_eq!(images.etcd, "quay.io/osa/etcd:v3.10");
    }

    // === Story: regenerating with the previous config keeps all secret material ===
    #[test]
    fn test_regeneration_is_stable() {
        let first = generate(None);
        let second = generate(Some(&first));
        assert_eq!(first.certificates, second.certificates);
        assert_eq!(first.secrets, second.secrets);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fqdn_change_reissues_api_cert_only() {
        let first = generate(None);

        let mut cluster = fixtures::validated();
        cluster.properties.fqdn = "renamed.eastus.cloudapp.azure.com".to_string();
        let second = DefaultConfigManager::default()
            .generate(&cluster, Some(&first))
            .expect("config should regenerate");

        for ca in CertificateName::CAS {
            assert_eq!(first.certificate(ca), second.certificate(ca), "{} changed", ca);
        }
        let api = second
            .require_certificate(CertificateName::MasterServer)
            .expect("api cert present");
        assert_ne!(
            first.certificate(CertificateName::MasterServer),
            Some(api)
        );
        let info = CertificateInfo::from_pem(&api.cert).expect("api cert should parse");
        assert!(info.san_set().contains("renamed.eastus.cloudapp.azure.com"));

        assert_eq!(
            first.certificate(CertificateName::Router),
            second.certificate(CertificateName::Router)
        );
    }

    #[test]
    fn test_missing_secrets_are_filled_in() {
        let mut existing = generate(None);
        let kept = existing.secrets.session_auth_secret.clone();
        existing.secrets.session_encryption_secret.clear();

        let config = generate(Some(&existing));
        assert_eq!(config.secrets.session_auth_secret, kept);
        assert!(!config.secrets.session_encryption_secret.is_empty());
    }

    #[test]
    fn test_lost_leaf_is_reissued_by_existing_ca() {
        let mut existing = generate(None);
        existing.certificates.remove(&CertificateName::Registry);

        let config = generate(Some(&existing));
        let ca = CertificateAuthority::from_pair(
            config
                .certificate(CertificateName::Ca)
                .expect("CA present"),
        )
        .expect("CA should load");
        let registry = config
            .require_certificate(CertificateName::Registry)
            .expect("registry cert present");
        assert!(ca.signed(&registry.cert).expect("verification should run"));
    }

    #[test]
    fn test_outdated_existing_config_is_rejected() {
        let mut existing = generate(None);
        existing.version = 1;
        let err = DefaultConfigManager::default()
            .generate(&fixtures::validated(), Some(&existing))
            .expect_err("v1 config must be migrated first");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_plugin_version_comes_from_settings() {
        let manager = DefaultConfigManager::new(ConfigSettings {
            plugin_version: "v9.9".to_string(),
            ..Default::default()
        });
        let config = manager
            .generate(&fixtures::validated(), None)
            .expect("config should generate");
        assert_eq!(config.plugin_version, "v9.9");
        assert_eq!(manager.settings().plugin_version, "v9.9");
    }
}
