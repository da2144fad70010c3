//! Helpers shared by the values generators

use serde::Serialize;

use osa_common::config::{CertificateName, OpenShiftAzureConfig};
use osa_common::pki::CertKeyPair;
use osa_common::{Error, Result};

/// Serialize a values document to YAML bytes
pub(crate) fn render<T: Serialize>(component: &str, values: &T) -> Result<Vec<u8>> {
    serde_yaml::to_string(values)
        .map(String::into_bytes)
        .map_err(|e| Error::render(component, e.to_string()))
}

/// A certificate and key the document cannot be rendered without
pub(crate) fn pair(
    component: &str,
    config: &OpenShiftAzureConfig,
    name: CertificateName,
) -> Result<CertKeyPair> {
    config
        .require_certificate(name)
        .cloned()
        .map_err(|e| Error::render(component, e.to_string()))
}

/// Only the certificate half, for trust bundles
pub(crate) fn cert(
    component: &str,
    config: &OpenShiftAzureConfig,
    name: CertificateName,
) -> Result<String> {
    pair(component, config, name).map(|p| p.cert)
}
