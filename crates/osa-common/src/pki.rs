//! PKI operations for cluster certificates
//!
//! The config manager owns one set of certificate authorities per cluster and
//! issues every serving and client certificate the control plane, nodes and
//! add-ons need from them.
//!
//! # Rotation
//!
//! Certificates are re-issued once 80% of their TTL has passed:
//! - Leaf certs (2 years): re-issued after ~19 months
//! - CA certs (10 years): flagged after 8 years
//!
//! CA rotation is not automatic. Re-issuing a CA invalidates every leaf it
//! signed, so it only happens when the CA is missing from the config.

use std::collections::BTreeSet;
use std::net::IpAddr;

use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x509_parser::prelude::*;

/// Default validity period for CA certificates (10 years)
pub const CA_VALIDITY_YEARS: i64 = 10;

/// Default validity period for leaf certificates (2 years)
pub const CERT_VALIDITY_YEARS: i64 = 2;

/// Rotation threshold as a fraction of TTL (80%)
pub const ROTATION_THRESHOLD: f64 = 0.80;

/// Organization stamped on every CA
const CA_ORGANIZATION: &str = "OpenShift on Azure";

fn compute_validity(years: i64) -> (::time::OffsetDateTime, ::time::OffsetDateTime) {
    let now = ::time::OffsetDateTime::now_utc();
    let not_after = now + ::time::Duration::days(years * 365);
    (now, not_after)
}

fn unix_now() -> i64 {
    ::time::OffsetDateTime::now_utc().unix_timestamp()
}

/// PKI errors
#[derive(Debug, Error)]
pub enum PkiError {
    /// Certificate generation failed
    #[error("certificate generation failed: {0}")]
    CertificateGenerationFailed(String),

    /// Key generation failed
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Certificate or key parsing error
    #[error("certificate parsing error: {0}")]
    ParseError(String),
}

impl From<PkiError> for crate::Error {
    fn from(err: PkiError) -> Self {
        crate::Error::pki(err.to_string())
    }
}

/// Result type for PKI operations
pub type Result<T> = std::result::Result<T, PkiError>;

/// Parse PEM-encoded data and return the DER bytes
pub fn parse_pem(pem_data: &str) -> Result<Vec<u8>> {
    let pem_obj = ::pem::parse(pem_data.as_bytes())
        .map_err(|e| PkiError::ParseError(format!("failed to parse PEM: {}", e)))?;
    Ok(pem_obj.contents().to_vec())
}

/// A PEM certificate and its PEM private key, as stored in the config
#[derive(Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct CertKeyPair {
    /// PEM-encoded certificate
    pub cert: String,
    /// PEM-encoded private key
    pub key: String,
}

impl std::fmt::Debug for CertKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Private keys never reach logs
        f.debug_struct("CertKeyPair")
            .field("cert", &self.cert)
            .finish_non_exhaustive()
    }
}

/// What a leaf certificate may be used for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUsage {
    /// TLS server authentication
    Server,
    /// TLS client authentication
    Client,
    /// Both server and client authentication
    ServerAndClient,
}

impl KeyUsage {
    fn extended(&self) -> Vec<ExtendedKeyUsagePurpose> {
        match self {
            Self::Server => vec![ExtendedKeyUsagePurpose::ServerAuth],
            Self::Client => vec![ExtendedKeyUsagePurpose::ClientAuth],
            Self::ServerAndClient => vec![
                ExtendedKeyUsagePurpose::ServerAuth,
                ExtendedKeyUsagePurpose::ClientAuth,
            ],
        }
    }
}

/// Parameters of a leaf certificate to issue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafSpec {
    /// Subject common name
    pub common_name: String,
    /// Subject organization (used as the group by Kubernetes authenticators)
    pub organization: Option<String>,
    /// DNS names and IP addresses
    pub sans: Vec<String>,
    /// Allowed usage
    pub usage: KeyUsage,
}

impl LeafSpec {
    /// SANs as a normalized set for comparison with an issued certificate
    pub fn san_set(&self) -> BTreeSet<String> {
        self.sans.iter().map(|s| s.to_ascii_lowercase()).collect()
    }
}

/// Information about a certificate's identity and validity
#[derive(Debug, Clone)]
pub struct CertificateInfo {
    /// When the certificate becomes valid (Unix timestamp)
    pub not_before: i64,
    /// When the certificate expires (Unix timestamp)
    pub not_after: i64,
    /// Subject common name
    pub common_name: String,
    /// DNS subject alternative names
    pub dns_names: Vec<String>,
    /// IP subject alternative names
    pub ip_addresses: Vec<IpAddr>,
}

impl CertificateInfo {
    /// Parse certificate info from PEM-encoded certificate
    pub fn from_pem(pem_data: &str) -> Result<Self> {
        let der = parse_pem(pem_data)?;
        Self::from_der(&der)
    }

    /// Parse certificate info from DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| PkiError::ParseError(format!("failed to parse certificate: {}", e)))?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or("")
            .to_string();

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(bytes) => {
                        if let Ok(v4) = <[u8; 4]>::try_from(*bytes) {
                            ip_addresses.push(IpAddr::from(v4));
                        } else if let Ok(v6) = <[u8; 16]>::try_from(*bytes) {
                            ip_addresses.push(IpAddr::from(v6));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            common_name,
            dns_names,
            ip_addresses,
        })
    }

    /// All SANs as a normalized set
    pub fn san_set(&self) -> BTreeSet<String> {
        self.dns_names
            .iter()
            .map(|d| d.to_ascii_lowercase())
            .chain(self.ip_addresses.iter().map(|ip| ip.to_string()))
            .collect()
    }

    /// Total lifetime of the certificate in seconds
    pub fn lifetime_secs(&self) -> i64 {
        self.not_after - self.not_before
    }

    /// Seconds elapsed since certificate was issued
    pub fn age_secs(&self) -> i64 {
        unix_now() - self.not_before
    }

    /// Seconds remaining until certificate expires
    pub fn remaining_secs(&self) -> i64 {
        self.not_after - unix_now()
    }

    /// Check if certificate has expired
    pub fn is_expired(&self) -> bool {
        self.remaining_secs() <= 0
    }

    /// Check if certificate needs rotation (past 80% of TTL)
    pub fn needs_rotation(&self) -> bool {
        let lifetime = self.lifetime_secs() as f64;
        if lifetime <= 0.0 {
            return true;
        }
        self.age_secs() as f64 / lifetime >= ROTATION_THRESHOLD
    }
}

/// Certificate authority holding its key as PEM
#[derive(Clone)]
pub struct CertificateAuthority {
    /// CA key pair serialized as PEM (KeyPair isn't Clone)
    ca_key_pem: String,
    ca_cert_pem: String,
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("ca_cert_pem", &self.ca_cert_pem)
            .finish_non_exhaustive()
    }
}

impl CertificateAuthority {
    /// Create a new self-signed CA
    pub fn new(common_name: &str) -> Result<Self> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(
            DnType::CommonName,
            DnValue::Utf8String(common_name.to_string()),
        );
        dn.push(
            DnType::OrganizationName,
            DnValue::Utf8String(CA_ORGANIZATION.to_string()),
        );
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let (not_before, not_after) = compute_validity(CA_VALIDITY_YEARS);
        params.not_before = not_before;
        params.not_after = not_after;

        let key_pair = KeyPair::generate().map_err(|e| {
            PkiError::KeyGenerationFailed(format!("failed to generate CA key: {}", e))
        })?;
        let ca_key_pem = key_pair.serialize_pem();

        let cert = params.self_signed(&key_pair).map_err(|e| {
            PkiError::CertificateGenerationFailed(format!("failed to create CA cert: {}", e))
        })?;

        Ok(Self {
            ca_key_pem,
            ca_cert_pem: cert.pem(),
        })
    }

    /// Load a CA from a stored cert/key pair
    pub fn from_pair(pair: &CertKeyPair) -> Result<Self> {
        KeyPair::from_pem(&pair.key)
            .map_err(|e| PkiError::ParseError(format!("failed to parse CA key: {}", e)))?;
        parse_pem(&pair.cert)?;

        Ok(Self {
            ca_key_pem: pair.key.clone(),
            ca_cert_pem: pair.cert.clone(),
        })
    }

    /// The CA as a stored cert/key pair
    pub fn to_pair(&self) -> CertKeyPair {
        CertKeyPair {
            cert: self.ca_cert_pem.clone(),
            key: self.ca_key_pem.clone(),
        }
    }

    /// The CA certificate in PEM format
    pub fn ca_cert_pem(&self) -> &str {
        &self.ca_cert_pem
    }

    /// Certificate info (validity period, CN)
    pub fn cert_info(&self) -> Result<CertificateInfo> {
        CertificateInfo::from_pem(&self.ca_cert_pem)
    }

    fn load_key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_pem(&self.ca_key_pem)
            .map_err(|e| PkiError::ParseError(format!("failed to load CA key: {}", e)))
    }

    /// Issue a leaf certificate signed by this CA
    pub fn issue(&self, spec: &LeafSpec) -> Result<CertKeyPair> {
        let (not_before, not_after) = compute_validity(CERT_VALIDITY_YEARS);
        self.issue_with_validity(spec, not_before, not_after)
    }

    /// Issue a leaf certificate valid from `not_before` until `not_after`
    pub fn issue_with_validity(
        &self,
        spec: &LeafSpec,
        not_before: ::time::OffsetDateTime,
        not_after: ::time::OffsetDateTime,
    ) -> Result<CertKeyPair> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(
            DnType::CommonName,
            DnValue::Utf8String(spec.common_name.clone()),
        );
        if let Some(org) = &spec.organization {
            dn.push(DnType::OrganizationName, DnValue::Utf8String(org.clone()));
        }
        params.distinguished_name = dn;

        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = spec.usage.extended();

        params.not_before = not_before;
        params.not_after = not_after;

        params.subject_alt_names = spec
            .sans
            .iter()
            .map(|san| {
                if let Ok(ip) = san.parse::<IpAddr>() {
                    Ok(SanType::IpAddress(ip))
                } else {
                    Ia5String::try_from(san.to_ascii_lowercase())
                        .map(SanType::DnsName)
                        .map_err(|e| {
                            PkiError::CertificateGenerationFailed(format!(
                                "invalid DNS name '{}': {}",
                                san, e
                            ))
                        })
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let leaf_key = KeyPair::generate().map_err(|e| {
            PkiError::KeyGenerationFailed(format!(
                "failed to generate key for {}: {}",
                spec.common_name, e
            ))
        })?;

        let ca_key = self.load_key_pair()?;
        let issuer = Issuer::from_ca_cert_pem(&self.ca_cert_pem, &ca_key)
            .map_err(|e| PkiError::ParseError(format!("failed to create issuer: {}", e)))?;

        let cert = params.signed_by(&leaf_key, &issuer).map_err(|e| {
            PkiError::CertificateGenerationFailed(format!(
                "failed to sign {}: {}",
                spec.common_name, e
            ))
        })?;

        Ok(CertKeyPair {
            cert: cert.pem(),
            key: leaf_key.serialize_pem(),
        })
    }

    /// True if `cert_pem` carries a valid signature from this CA
    pub fn signed(&self, cert_pem: &str) -> Result<bool> {
        let cert_der = parse_pem(cert_pem)?;
        let (_, cert) = X509Certificate::from_der(&cert_der)
            .map_err(|e| PkiError::ParseError(format!("failed to parse certificate: {}", e)))?;

        let ca_der = parse_pem(&self.ca_cert_pem)?;
        let (_, ca_cert) = X509Certificate::from_der(&ca_der)
            .map_err(|e| PkiError::ParseError(format!("failed to parse CA cert: {}", e)))?;

        Ok(cert.verify_signature(Some(ca_cert.public_key())).is_ok())
    }
}
