//! Control plane values
//!
//! Renders the values document for the customer control plane chart: etcd,
//! API server, controller manager, OAuth and the aggregator front proxy.

use serde::Serialize;
use tracing::info;

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::{CertificateName, OpenShiftAzureConfig};
use osa_common::pki::CertKeyPair;
use osa_common::Result;

use crate::plugin::HcpManager;
use crate::values::{cert, pair, render};

const COMPONENT: &str = "hcp";

/// Default [`HcpManager`]
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultHcpManager;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HcpValues {
    etcd: Etcd,
    api_server: ApiServer,
    controller_manager: ControllerManager,
    oauth: OAuth,
    front_proxy: FrontProxy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Etcd {
    image: String,
    replicas: u32,
    ca: String,
    server: CertKeyPair,
    peer: CertKeyPair,
    client: CertKeyPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiServer {
    image: String,
    replicas: u32,
    public_hostname: String,
    fqdn: String,
    internal_hostname: String,
    service_cidr: String,
    cluster_network_cidr: String,
    cluster_domain: String,
    serving: CertKeyPair,
    ca_bundle: String,
    kubelet_client: CertKeyPair,
    admin: CertKeyPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ControllerManager {
    image: String,
    replicas: u32,
    service_signing_ca: CertKeyPair,
    cluster_signing_ca: CertKeyPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OAuth {
    public_hostname: String,
    session_auth_secret: String,
    session_encryption_secret: String,
    identity_providers: Vec<IdentityProvider>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityProvider {
    name: String,
    kind: String,
    client_id: String,
    client_secret: String,
    tenant_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FrontProxy {
    ca: String,
    client: CertKeyPair,
}

impl HcpManager for DefaultHcpManager {
    fn generate(
        &self,
        cluster: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Result<Vec<u8>> {
        let props = &cluster.properties;
        let replicas = props.master_pool_profile.count;
        let ca = cert(COMPONENT, config, CertificateName::Ca)?;

        let values = HcpValues {
            etcd: Etcd {
                image: config.images.etcd.clone(),
                replicas,
                ca: cert(COMPONENT, config, CertificateName::EtcdCa)?,
                server: pair(COMPONENT, config, CertificateName::EtcdServer)?,
                peer: pair(COMPONENT, config, CertificateName::EtcdPeer)?,
                client: pair(COMPONENT, config, CertificateName::EtcdClient)?,
            },
            api_server: ApiServer {
                image: config.images.control_plane.clone(),
                replicas,
                public_hostname: props.public_hostname().to_string(),
                fqdn: props.fqdn.clone(),
                internal_hostname: config.master_internal_hostname.clone(),
                service_cidr: config.service_cidr.clone(),
                cluster_network_cidr: config.cluster_network_cidr.clone(),
                cluster_domain: config.cluster_domain.clone(),
                serving: pair(COMPONENT, config, CertificateName::MasterServer)?,
                ca_bundle: ca,
                kubelet_client: pair(COMPONENT, config, CertificateName::MasterKubeletClient)?,
                admin: pair(COMPONENT, config, CertificateName::Admin)?,
            },
            controller_manager: ControllerManager {
                image: config.images.control_plane.clone(),
                replicas,
                service_signing_ca: pair(COMPONENT, config, CertificateName::ServiceSigningCa)?,
                cluster_signing_ca: pair(COMPONENT, config, CertificateName::Ca)?,
            },
            oauth: OAuth {
                public_hostname: props.public_hostname().to_string(),
                session_auth_secret: config.secrets.session_auth_secret.clone(),
                session_encryption_secret: config.secrets.session_encryption_secret.clone(),
                identity_providers: props
                    .auth_profile
                    .identity_providers
                    .iter()
                    .map(|idp| IdentityProvider {
                        name: idp.name.clone(),
                        kind: idp.provider.kind.clone(),
                        client_id: idp.provider.client_id.clone(),
                        client_secret: idp.provider.secret.clone(),
                        tenant_id: idp.provider.tenant_id.clone(),
                    })
                    .collect(),
            },
            front_proxy: FrontProxy {
                ca: cert(COMPONENT, config, CertificateName::FrontProxyCa)?,
                client: pair(COMPONENT, config, CertificateName::AggregatorFrontProxy)?,
            },
        };

        let out = render(COMPONENT, &values)?;
        info!(cluster = %cluster.name, bytes = out.len(), "control plane values rendered");
        Ok(out)
    }
}
