//! Node pool definitions
//!
//! One scale set per pool: `ss-master` for the masters and `ss-<name>` for
//! every agent pool, ordered master, infra, then compute pools by name. Each
//! scale set carries what a node needs to join the cluster.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use osa_common::api::{AgentPoolProfile, AgentPoolRole, ManagedOpenShiftCluster};
use osa_common::config::{CertificateName, OpenShiftAzureConfig};
use osa_common::Result;

use crate::config::master_hostname;
use crate::plugin::NodeManager;
use crate::values::{cert, pair, render};

const COMPONENT: &str = "nodes";

/// Label selecting nodes by role
const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

/// Default [`NodeManager`]
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultNodeManager;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeValues {
    scale_sets: Vec<ScaleSet>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScaleSet {
    name: String,
    role: NodeRole,
    count: u32,
    vm_size: String,
    subnet_cidr: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hostnames: Vec<String>,
    vm_image: VmImage,
    labels: BTreeMap<String, String>,
    node_image: String,
    bootstrap: Bootstrap,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VmImage {
    publisher: String,
    offer: String,
    sku: String,
    version: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Bootstrap {
    api_server: String,
    ca_bundle: String,
    client_cert: String,
    client_key: String,
}

/// Role a scale set's nodes run in the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum NodeRole {
    Master,
    Infra,
    Compute,
}

impl From<AgentPoolRole> for NodeRole {
    fn from(role: AgentPoolRole) -> Self {
        match role {
            AgentPoolRole::Infra => Self::Infra,
            AgentPoolRole::Compute => Self::Compute,
        }
    }
}

impl NodeRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Infra => "infra",
            Self::Compute => "compute",
        }
    }

    /// Scheduling region the role's nodes are labelled with
    fn region(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Infra => "infra",
            Self::Compute => "primary",
        }
    }

    fn labels(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (format!("{}{}", ROLE_LABEL_PREFIX, self.as_str()), "true".to_string()),
            ("region".to_string(), self.region().to_string()),
        ])
    }
}

impl NodeManager for DefaultNodeManager {
    fn generate(
        &self,
        cluster: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Result<Vec<u8>> {
        let props = &cluster.properties;
        let node_cert = pair(COMPONENT, config, CertificateName::NodeBootstrap)?;
        let bootstrap = Bootstrap {
            api_server: format!("https://{}", config.master_internal_hostname),
            ca_bundle: cert(COMPONENT, config, CertificateName::Ca)?,
            client_cert: node_cert.cert,
            client_key: node_cert.key,
        };
        let vm_image = VmImage {
            publisher: config.image_publisher.clone(),
            offer: config.image_offer.clone(),
            sku: config.image_sku.clone(),
            version: config.image_version.clone(),
        };

        let master = &props.master_pool_profile;
        let mut scale_sets = vec![ScaleSet {
            name: "ss-master".to_string(),
            role: NodeRole::Master,
            count: master.count,
            vm_size: master.vm_size.clone(),
            subnet_cidr: master.subnet_cidr.clone(),
            hostnames: (0..master.count).map(master_hostname).collect(),
            vm_image: vm_image.clone(),
            labels: NodeRole::Master.labels(),
            node_image: config.images.node.clone(),
            bootstrap: bootstrap.clone(),
        }];

        let mut pools: Vec<&AgentPoolProfile> = props.agent_pool_profiles.iter().collect();
        pools.sort_by_key(|p| (p.role != AgentPoolRole::Infra, p.name.clone()));

        for pool in pools {
            let role = NodeRole::from(pool.role);
            scale_sets.push(ScaleSet {
                name: format!("ss-{}", pool.name),
                role,
                count: pool.count,
                vm_size: pool.vm_size.clone(),
                subnet_cidr: pool.subnet_cidr.clone(),
                hostnames: Vec::new(),
                vm_image: vm_image.clone(),
                labels: role.labels(),
                node_image: config.images.node.clone(),
                bootstrap: bootstrap.clone(),
            });
        }

        let out = render(COMPONENT, &NodeValues { scale_sets })?;
        info!(
            cluster = %cluster.name,
            pools = props.agent_pool_profiles.len() + 1,
            "node pool values rendered"
        );
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

    fn render_for(cluster: &ManagedOpenShiftCluster) -> Value {
        let config = DefaultConfigManager::default()
            .generate(cluster, None)
            .expect("config should generate");
        let bytes = DefaultNodeManager
            .generate(cluster, &config)
            .expect("node values should render");
        serde_yaml::from_slice(&bytes).expect("output should be YAML")
    }

    fn names(values: &Value) -> Vec<String> {
        values["scaleSets"]
            .as_sequence()
            .expect("scaleSets should be a list")
            .iter()
            .filter_map(|s| s["name"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_scale_sets_are_ordered_master_infra_compute() {
        let mut cluster = fixtures::validated();
        let mut extra = cluster.properties.agent_pool_profiles[1].clone();
        extra.name = "batch".to_string();
        cluster.properties.agent_pool_profiles.push(extra);

        let values = render_for(&cluster);
        assert_eq!(
            names(&values),
            vec!["ss-master", "ss-infra", "ss-batch", "ss-compute"]
        );
    }

    #[test]
    fn test_counts_roles_and_labels() {
        let values = render_for(&fixtures::validated());
        let sets = &values["scaleSets"];

        assert_eq!(sets[0]["count"], Value::from(3u32));
        assert_eq!(sets[1]["role"], Value::from("infra"));
        assert_eq!(sets[1]["count"], Value::from(2u32));
        assert_eq!(sets[2]["role"], Value::from("compute"));
        assert_eq!(
            sets[2]["labels"]["node-role.kubernetes.io/compute"],
            Value::from("true")
        );
        assert_eq!(sets[2]["labels"]["region"], Value::from("primary"));
        assert_eq!(sets[1]["labels"]["region"], Value::from("infra"));
    }

    #[test]
    fn test_master_hostnames_match_etcd_names() {
        let values = render_for(&fixtures::validated());
        let hostnames = values["scaleSets"][0]["hostnames"]
            .as_sequence()
            .expect("masters list hostnames");
        assert_eq!(hostnames.len(), 3);
        assert_eq!(hostnames[0], Value::from("master-000000"));
        assert!(values["scaleSets"][1].get("hostnames").is_none());
    }

    #[test]
    fn test_every_set_gets_image_and_bootstrap() {
        let values = render_for(&fixtures::validated());
        for set in values["scaleSets"].as_sequence().expect("list") {
            assert_eq!(set["vmImage"]["sku"], Value::from("osa_311"));
            assert_eq!(
                set["nodeImage"],
                Value::from("registry.access.redhat.com/openshift3/ose-node:v3.11")
            );
            assert!(set["bootstrap"]["clientCert"]
                .as_str()
                .is_some_and(|c| c.contains("BEGIN CERTIFICATE")));
            assert_eq!(
                set["bootstrap"]["apiServer"],
                Value::from("https://demo-master.cluster.local")
            );
        }
    }

    #[test]
    fn test_role_labels_and_regions() {
        assert_eq!(NodeRole::from(AgentPoolRole::Infra), NodeRole::Infra);
        assert_eq!(NodeRole::from(AgentPoolRole::Compute), NodeRole::Compute);

        let master = NodeRole::Master.labels();
        assert_eq!(master["node-role.kubernetes.io/master"], "true");
        assert_eq!(master["region"], "master");
        assert_eq!(NodeRole::Compute.region(), "primary");
        assert_eq!(NodeRole::Infra.region(), "infra");
    }
}
