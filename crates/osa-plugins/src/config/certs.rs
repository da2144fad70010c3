//! Certificate set for a cluster
//!
//! CAs survive for the lifetime of the cluster. Leaves are re-issued whenever
//! the manifest changes the names they must cover, their CA changed, or they
//! are due for rotation.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::debug;

use osa_common::api::{Ipv4Cidr, ManagedOpenShiftCluster};
use osa_common::config::{CertificateName, OpenShiftAzureConfig};
use osa_common::pki::{CertKeyPair, CertificateAuthority, CertificateInfo, KeyUsage, LeafSpec};
use osa_common::{Error, Result, MASTER_COUNT};

/// Host name of the n-th master scale set instance
pub(crate) fn master_hostname(index: u32) -> String {
    format!("master-{:06}", index)
}

/// Subject common name of each CA
fn ca_common_name(name: CertificateName) -> &'static str {
    match name {
        CertificateName::EtcdCa => "etcd-signer",
        CertificateName::FrontProxyCa => "openshift-frontproxy-signer",
        CertificateName::ServiceSigningCa => "openshift-service-serving-signer",
        _ => "openshift-signer",
    }
}

/// First usable address of the service network, the `kubernetes` service IP
fn kubernetes_service_ip(service_cidr: &str) -> Result<Ipv4Addr> {
    let cidr = Ipv4Cidr::parse(service_cidr).map_err(Error::config)?;
    Ok(Ipv4Addr::from(u32::from(cidr.network()) + 1))
}

/// What each leaf must look like for this manifest and config
pub(super) fn leaf_specs(
    cluster: &ManagedOpenShiftCluster,
    config: &OpenShiftAzureConfig,
) -> Result<Vec<(CertificateName, LeafSpec)>> {
    let props = &cluster.properties;
    let subdomain = props
        .default_router()
        .map(|r| r.public_subdomain.as_str())
        .ok_or_else(|| Error::config("manifest has no default router profile"))?;
    let domain = &config.cluster_domain;
    let masters: Vec<String> = (0..MASTER_COUNT).map(master_hostname).collect();

    let spec = |cn: &str, org: Option<&str>, sans: Vec<String>, usage| LeafSpec {
        common_name: cn.to_string(),
        organization: org.map(str::to_string),
        sans,
        usage,
    };

    let mut api_sans = vec![
        props.fqdn.clone(),
        props.public_hostname().to_string(),
        config.master_internal_hostname.clone(),
        "kubernetes".to_string(),
        "kubernetes.default".to_string(),
        "kubernetes.default.svc".to_string(),
        format!("kubernetes.default.svc.{}", domain),
        "openshift".to_string(),
        "openshift.default".to_string(),
        "openshift.default.svc".to_string(),
        format!("openshift.default.svc.{}", domain),
        kubernetes_service_ip(&config.service_cidr)?.to_string(),
    ];
    api_sans.extend(masters.iter().cloned());
    api_sans.sort();
    api_sans.dedup();

    let registry = format!("docker-registry-default.{}", subdomain);

    Ok(vec![
        (
            CertificateName::EtcdServer,
            spec("etcd-server", None, masters.clone(), KeyUsage::ServerAndClient),
        ),
        (
            CertificateName::EtcdPeer,
            spec("etcd-peer", None, masters.clone(), KeyUsage::ServerAndClient),
        ),
        (
            CertificateName::EtcdClient,
            spec("etcd-client", None, vec![], KeyUsage::Client),
        ),
        (
            CertificateName::MasterServer,
            spec(&props.fqdn, None, api_sans, KeyUsage::Server),
        ),
        (
            CertificateName::OpenShiftConsole,
            spec(
                props.public_hostname(),
                None,
                vec![props.public_hostname().to_string()],
                KeyUsage::Server,
            ),
        ),
        (
            CertificateName::Admin,
            spec(
                "system:admin",
                Some("system:cluster-admins"),
                vec![],
                KeyUsage::Client,
            ),
        ),
        (
            CertificateName::AggregatorFrontProxy,
            spec("aggregator-front-proxy", None, vec![], KeyUsage::Client),
        ),
        (
            CertificateName::MasterKubeletClient,
            spec(
                "system:openshift-node-admin",
                Some("system:node-admins"),
                vec![],
                KeyUsage::Client,
            ),
        ),
        (
            CertificateName::NodeBootstrap,
            spec(
                "system:serviceaccount:openshift-infra:node-bootstrapper",
                None,
                vec![],
                KeyUsage::Client,
            ),
        ),
        (
            CertificateName::Router,
            spec(
                &format!("*.{}", subdomain),
                None,
                vec![format!("*.{}", subdomain), subdomain.to_string()],
                KeyUsage::Server,
            ),
        ),
        (
            CertificateName::Registry,
            spec(
                &registry,
                None,
                vec![
                    registry.clone(),
                    "docker-registry.default.svc".to_string(),
                    format!("docker-registry.default.svc.{}", domain),
                ],
                KeyUsage::Server,
            ),
        ),
    ])
}

/// Build the full certificate map, carrying over what is still good
pub(super) fn reconcile(
    specs: &[(CertificateName, LeafSpec)],
    existing: Option<&BTreeMap<CertificateName, CertKeyPair>>,
) -> Result<BTreeMap<CertificateName, CertKeyPair>> {
    let previous = |name: CertificateName| existing.and_then(|certs| certs.get(&name));
    let mut out = BTreeMap::new();
    let mut cas = BTreeMap::new();

    for name in CertificateName::CAS {
        let ca = match previous(name) {
            Some(pair) => {
                debug!(cert = %name, "reusing certificate authority");
                CertificateAuthority::from_pair(pair)?
            }
            None => {
                debug!(cert = %name, "generating certificate authority");
                CertificateAuthority::new(ca_common_name(name))?
            }
        };
        out.insert(name, ca.to_pair());
        cas.insert(name, ca);
    }

    for (name, spec) in specs {
        let issuer = name
            .issuer()
            .ok_or_else(|| Error::internal("certs", format!("{} has no issuing CA", name)))?;
        let ca = cas
            .get(&issuer)
            .ok_or_else(|| Error::internal("certs", format!("CA {} was not loaded", issuer)))?;

        let pair = match previous(*name) {
            Some(pair) if reusable(*name, pair, spec, ca) => {
                debug!(cert = %name, "reusing certificate");
                pair.clone()
            }
            _ => {
                debug!(cert = %name, issuer = %issuer, "issuing certificate");
                ca.issue(spec)?
            }
        };
        out.insert(*name, pair);
    }

    Ok(out)
}

/// A leaf is kept only if the current CA signed it, it covers exactly the
/// wanted names and it is not due for rotation
fn reusable(
    name: CertificateName,
    pair: &CertKeyPair,
    spec: &LeafSpec,
    ca: &CertificateAuthority,
) -> bool {
    if pair.key.is_empty() {
        return false;
    }
    match ca.signed(&pair.cert) {
        Ok(true) => {}
        Ok(false) => {
            debug!(cert = %name, "certificate not signed by current CA");
            return false;
        }
        Err(e) => {
            debug!(cert = %name, error = %e, "stored certificate is unreadable");
            return false;
        }
    }
    let info = match CertificateInfo::from_pem(&pair.cert) {
        Ok(info) => info,
        Err(e) => {
            debug!(cert = %name, error = %e, "stored certificate is unreadable");
            return false;
        }
    };
    if info.san_set() != spec.san_set() {
        debug!(cert = %name, "certificate names changed");
        return false;
    }
    if info.needs_rotation() {
        debug!(cert = %name, not_after = info.not_after, "certificate due for rotation");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_hostnames_are_zero_padded() {
        assert_eq!(master_hostname(0), "master-000000");
        assert_eq!(master_hostname(2), "master-000002");
    }

    #[test]
    fn test_kubernetes_service_ip() {
        assert_eq!(
            kubernetes_service_ip("172.30.0.0/16").expect("valid cidr"),
            Ipv4Addr::new(172, 30, 0, 1)
        );
        assert!(kubernetes_service_ip("nope").is_err());
    }

    #[test]
    fn test_every_leaf_has_a_spec() {
        let cluster = crate::fixtures::validated();
        let config = OpenShiftAzureConfig {
            cluster_domain: "cluster.local".to_string(),
            service_cidr: "172.30.0.0/16".to_string(),
            master_internal_hostname: "demo-master.cluster.local".to_string(),
            ..Default::default()
        };
        let specs = leaf_specs(&cluster, &config).expect("specs should build");

        let names: Vec<CertificateName> = specs.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, CertificateName::LEAVES.to_vec());

        let (_, api) = specs
            .iter()
            .find(|(n, _)| *n == CertificateName::MasterServer)
            .expect("master server spec");
        assert!(api.sans.contains(&"demo.eastus.cloudapp.azure.com".to_string()));
        assert!(api.sans.contains(&"172.30.0.1".to_string()));
        assert!(api.sans.contains(&"demo-master.cluster.local".to_string()));
    }

    #[test]
    fn test_unreadable_ca_is_an_error() {
        let mut existing = BTreeMap::new();
        existing.insert(
            CertificateName::Ca,
            CertKeyPair {
                cert: "garbage".to_string(),
                key: "garbage".to_string(),
            },
        );
        assert!(reconcile(&[], Some(&existing)).is_err());
    }

    #[test]
    fn test_leaf_from_foreign_ca_is_reissued() {
        let foreign = CertificateAuthority::new("foreign").expect("CA should build");
        let spec = LeafSpec {
            common_name: "etcd-client".to_string(),
            organization: None,
            sans: vec![],
            usage: KeyUsage::Client,
        };
        let stale = foreign.issue(&spec).expect("leaf should issue");

        let mut existing = BTreeMap::new();
        existing.insert(CertificateName::EtcdClient, stale.clone());

        let certs = reconcile(&[(CertificateName::EtcdClient, spec)], Some(&existing))
            .expect("reconcile should succeed");
        let fresh = &certs[&CertificateName::EtcdClient];
        assert_ne!(fresh.cert, stale.cert);

        let etcd_ca = CertificateAuthority::from_pair(&certs[&CertificateName::EtcdCa])
            .expect("etcd CA should load");
        assert!(etcd_ca.signed(&fresh.cert).expect("verification should run"));
    }

    // === Story: a leaf near the end of its lifetime is replaced, its CA is not ===
    #[test]
    fn test_leaf_due_for_rotation_is_reissued() {
        let spec = LeafSpec {
            common_name: "etcd-client".to_string(),
            organization: None,
            sans: vec![],
            usage: KeyUsage::Client,
        };
        let first = reconcile(&[(CertificateName::EtcdClient, spec.clone())], None)
            .expect("first reconcile should succeed");
        let etcd_ca = CertificateAuthority::from_pair(&first[&CertificateName::EtcdCa])
            .expect("etcd CA should load");

        let now = time::OffsetDateTime::now_utc();
        let ageing = etcd_ca
            .issue_with_validity(
                &spec,
                now - time::Duration::days(90),
                now + time::Duration::days(10),
            )
            .expect("leaf should issue");

        let mut existing = first.clone();
        existing.insert(CertificateName::EtcdClient, ageing.clone());

        let certs = reconcile(&[(CertificateName::EtcdClient, spec)], Some(&existing))
            .expect("reconcile should succeed");
        let fresh = &certs[&CertificateName::EtcdClient];

        assert_ne!(fresh.cert, ageing.cert);
        assert!(etcd_ca.signed(&fresh.cert).expect("verification should run"));
        assert!(!CertificateInfo::from_pem(&fresh.cert)
            .expect("leaf info should parse")
            .needs_rotation());
        assert_eq!(certs[&CertificateName::EtcdCa], first[&CertificateName::EtcdCa]);
        assert_eq!(certs[&CertificateName::Ca], first[&CertificateName::Ca]);
    }

    #[test]
    fn test_healthy_leaf_is_kept() {
        let spec = LeafSpec {
            common_name: "etcd-client".to_string(),
            organization: None,
            sans: vec![],
            usage: KeyUsage::Client,
        };
        let first = reconcile(&[(CertificateName::EtcdClient, spec.clone())], None)
            .expect("first reconcile should succeed");
        let second = reconcile(&[(CertificateName::EtcdClient, spec)], Some(&first))
            .expect("second reconcile should succeed");
        assert_eq!(first, second);
    }
}
