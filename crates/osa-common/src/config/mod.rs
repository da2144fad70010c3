//! OpenShiftAzureConfig: the internal, versioned superset configuration
//!
//! The config is derived from a validated manifest by the config manager and
//! consumed by every later plugin. Callers persist it as opaque bytes
//! ([`OpenShiftAzureConfig::to_bytes`]) and hand it back on the next run, where
//! [`load`] migrates it to the current format.

mod migrate;

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pki::CertKeyPair;
use crate::{Error, Result};

pub use migrate::load;

/// Internal cluster configuration shared by all plugins
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenShiftAzureConfig {
    /// Persisted format version
    pub version: u32,

    /// Version of the plugin that wrote this config
    pub plugin_version: String,

    /// Marketplace offer of the node VM image
    pub image_offer: String,

    /// Marketplace publisher of the node VM image
    pub image_publisher: String,

    /// Marketplace SKU of the node VM image
    pub image_sku: String,

    /// Marketplace version of the node VM image
    pub image_version: String,

    /// Container images
    pub images: ImageConfig,

    /// Certificate authorities and leaf certificates
    pub certificates: BTreeMap<CertificateName, CertKeyPair>,

    /// Generated secrets
    pub secrets: Secrets,

    /// Kubernetes service network
    pub service_cidr: String,

    /// Pod network
    pub cluster_network_cidr: String,

    /// In-cluster DNS domain
    pub cluster_domain: String,

    /// Name masters use to reach the API internally
    pub master_internal_hostname: String,

    /// Router load balancer hostname
    pub router_hostname: String,
}

impl OpenShiftAzureConfig {
    /// Look up a certificate by name
    pub fn certificate(&self, name: CertificateName) -> Option<&CertKeyPair> {
        self.certificates.get(&name)
    }

    /// Look up a certificate that later plugins cannot work without
    pub fn require_certificate(&self, name: CertificateName) -> Result<&CertKeyPair> {
        self.certificate(name)
            .ok_or_else(|| Error::config(format!("certificate {} is missing from config", name)))
    }

    /// Serialize for opaque persistence by the caller
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Container images, all resolved from the image format and OpenShift version
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageConfig {
    /// Image reference template with `${component}` and `${version}` placeholders
    pub format: String,
    /// etcd
    pub etcd: String,
    /// API server, controller manager
    pub control_plane: String,
    /// Node (kubelet, sdn)
    pub node: String,
    /// HAProxy router
    pub router: String,
    /// Docker registry
    pub registry: String,
    /// Web console
    pub web_console: String,
    /// Config sync pod
    pub sync: String,
}

/// Generated secret values (base64)
#[derive(Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Secrets {
    /// Signs OAuth session cookies
    pub session_auth_secret: String,
    /// Encrypts OAuth session cookies
    pub session_encryption_secret: String,
    /// Secures registry upload state
    pub registry_http_secret: String,
    /// Break-glass admin password
    pub admin_password: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

/// Every certificate the config carries
#[derive(
    Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum CertificateName {
    /// Signs etcd server, peer and client certs
    EtcdCa,
    /// Cluster root CA
    Ca,
    /// Signs the aggregator front proxy client cert
    FrontProxyCa,
    /// Signs service serving certs in-cluster
    ServiceSigningCa,
    /// etcd serving cert
    EtcdServer,
    /// etcd peer cert
    EtcdPeer,
    /// etcd client cert used by the API server
    EtcdClient,
    /// API server serving cert
    MasterServer,
    /// Web console serving cert
    OpenShiftConsole,
    /// Cluster admin client cert
    Admin,
    /// API aggregator client cert
    AggregatorFrontProxy,
    /// API server to kubelet client cert
    MasterKubeletClient,
    /// Node bootstrap client cert
    NodeBootstrap,
    /// Router wildcard serving cert
    Router,
    /// Registry serving cert
    Registry,
}

impl CertificateName {
    /// Certificate authorities, in generation order
    pub const CAS: [CertificateName; 4] = [
        Self::EtcdCa,
        Self::Ca,
        Self::FrontProxyCa,
        Self::ServiceSigningCa,
    ];

    /// Leaf certificates, in generation order
    pub const LEAVES: [CertificateName; 11] = [
        Self::EtcdServer,
        Self::EtcdPeer,
        Self::EtcdClient,
        Self::MasterServer,
        Self::OpenShiftConsole,
        Self::Admin,
        Self::AggregatorFrontProxy,
        Self::MasterKubeletClient,
        Self::NodeBootstrap,
        Self::Router,
        Self::Registry,
    ];

    /// True for certificate authorities
    pub fn is_ca(&self) -> bool {
        Self::CAS.contains(self)
    }

    /// The CA that signs this leaf, or `None` for CAs
    pub fn issuer(&self) -> Option<CertificateName> {
        match self {
            Self::EtcdCa | Self::Ca | Self::FrontProxyCa | Self::ServiceSigningCa => None,
            Self::EtcdServer | Self::EtcdPeer | Self::EtcdClient => Some(Self::EtcdCa),
            Self::AggregatorFrontProxy => Some(Self::FrontProxyCa),
            _ => Some(Self::Ca),
        }
    }
}

impl fmt::Display for CertificateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_leaf_has_a_ca_issuer() {
        for leaf in CertificateName::LEAVES {
            let issuer = leaf.issuer().expect("leaf must have an issuer");
            assert!(issuer.is_ca(), "{} issued by non-CA {}", leaf, issuer);
        }
        for ca in CertificateName::CAS {
            assert!(ca.issuer().is_none());
        }
    }

    #[test]
    fn test_etcd_certs_use_etcd_ca() {
        assert_eq!(
            CertificateName::EtcdPeer.issuer(),
            Some(CertificateName::EtcdCa)
        );
        assert_eq!(
            CertificateName::MasterServer.issuer(),
            Some(CertificateName::Ca)
        );
    }

    #[test]
    fn test_require_certificate_names_missing_cert() {
        let config = OpenShiftAzureConfig::default();
        let err = config
            .require_certificate(CertificateName::Router)
            .expect_err("empty config has no certs");
        assert!(err.to_string().contains("Router"));
    }

    #[test]
    fn test_certificates_serialize_as_named_map() {
        let mut config = OpenShiftAzureConfig::default();
        config.certificates.insert(
            CertificateName::Ca,
            CertKeyPair {
                cert: "c".to_string(),
                key: "k".to_string(),
            },
        );
        let value = serde_json::to_value(&config).expect("config should serialize");
        assert_eq!(value["certificates"]["Ca"]["cert"], "c");
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let secrets = Secrets {
            admin_password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", secrets).contains("hunter2"));
    }
}
