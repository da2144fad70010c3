//! ManagedOpenShiftCluster manifest
//!
//! The external schema handed to the resource provider. It reuses the shape of
//! the managed Kubernetes cluster schema (pool profiles, network profile, auth
//! profile) but is a separate type so that the two can evolve independently.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::version::ApiVersion;
use crate::Result;

/// External cluster manifest supplied by the caller
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedOpenShiftCluster {
    /// Schema version this manifest was written against
    pub api_version: ApiVersion,

    /// Cluster resource name
    pub name: String,

    /// Azure region
    pub location: String,

    /// Free-form resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Cluster properties
    pub properties: Properties,
}

impl ManagedOpenShiftCluster {
    /// Parse a manifest from YAML (or JSON, which YAML accepts)
    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Serialize the manifest to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Lifecycle state reported back to the caller
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ProvisioningState {
    /// First provisioning in progress
    Creating,
    /// Upgrade or scale in progress
    Updating,
    /// Last operation completed
    Succeeded,
    /// Last operation failed
    Failed,
    /// Deletion in progress
    Deleting,
}

/// Cluster properties
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    /// Set by the validator, ignored on input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,

    /// OpenShift release, e.g. "v3.11"
    #[serde(rename = "openShiftVersion")]
    pub openshift_version: String,

    /// Hostname users reach the web console and API on; defaults to `fqdn`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_hostname: Option<String>,

    /// Fully qualified name of the API server load balancer
    pub fqdn: String,

    /// Virtual network settings
    pub network_profile: NetworkProfile,

    /// Router (ingress) profiles
    #[serde(default)]
    pub router_profiles: Vec<RouterProfile>,

    /// Master pool
    pub master_pool_profile: MasterPoolProfile,

    /// Infra and compute pools
    #[serde(default)]
    pub agent_pool_profiles: Vec<AgentPoolProfile>,

    /// Identity providers for cluster login
    #[serde(default)]
    pub auth_profile: AuthProfile,
}

impl Properties {
    /// Hostname for the console and public API, falling back to the fqdn
    pub fn public_hostname(&self) -> &str {
        self.public_hostname.as_deref().unwrap_or(&self.fqdn)
    }

    /// The pool running routers and the registry
    pub fn infra_pool(&self) -> Option<&AgentPoolProfile> {
        self.agent_pool_profiles
            .iter()
            .find(|p| p.role == AgentPoolRole::Infra)
    }

    /// Pools running user workloads, in manifest order
    pub fn compute_pools(&self) -> impl Iterator<Item = &AgentPoolProfile> {
        self.agent_pool_profiles
            .iter()
            .filter(|p| p.role == AgentPoolRole::Compute)
    }

    /// The router profile named `default`
    pub fn default_router(&self) -> Option<&RouterProfile> {
        self.router_profiles
            .iter()
            .find(|r| r.name == DEFAULT_ROUTER_NAME)
    }

    /// Look up an agent pool by name
    pub fn agent_pool(&self, name: &str) -> Option<&AgentPoolProfile> {
        self.agent_pool_profiles.iter().find(|p| p.name == name)
    }
}

/// Name of the only router profile a cluster may carry
pub const DEFAULT_ROUTER_NAME: &str = "default";

/// Name the infra pool must use
pub const INFRA_POOL_NAME: &str = "infra";

/// Virtual network settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    /// Address space of the cluster vnet
    pub vnet_cidr: String,

    /// Resource ID of a vnet to peer with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_vnet_id: Option<String>,
}

/// Router (ingress) profile
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouterProfile {
    /// Profile name; only `default` is supported
    pub name: String,

    /// DNS subdomain application routes are published under
    pub public_subdomain: String,

    /// Router load balancer name; defaults to the public subdomain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
}

/// Master pool profile
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterPoolProfile {
    /// Number of masters
    pub count: u32,

    /// Azure VM size
    pub vm_size: String,

    /// Subnet the masters live in
    pub subnet_cidr: String,
}

/// Role of an agent pool
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AgentPoolRole {
    /// Runs user workloads
    Compute,
    /// Runs routers and the registry
    Infra,
}

impl AgentPoolRole {
    /// Lowercase role name used in labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::Infra => "infra",
        }
    }
}

impl std::fmt::Display for AgentPoolRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system of a pool
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum OsType {
    /// Linux nodes
    #[default]
    Linux,
    /// Windows nodes (not supported by OpenShift 3.x)
    Windows,
}

/// Agent pool profile
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProfile {
    /// Pool name, used in scale set names
    pub name: String,

    /// Pool role
    pub role: AgentPoolRole,

    /// Number of nodes
    pub count: u32,

    /// Azure VM size
    pub vm_size: String,

    /// Subnet the pool lives in
    pub subnet_cidr: String,

    /// Node operating system
    #[serde(default)]
    pub os_type: OsType,
}

/// Authentication settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfile {
    /// Identity providers offered on the login page
    #[serde(default)]
    pub identity_providers: Vec<IdentityProvider>,
}

/// Named identity provider
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProvider {
    /// Name shown on the login page
    pub name: String,

    /// Provider settings
    pub provider: AadIdentityProvider,
}

/// Kind string of the Azure Active Directory provider
pub const AAD_PROVIDER_KIND: &str = "AADIdentityProvider";

/// Azure Active Directory identity provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AadIdentityProvider {
    /// Provider kind, must be `AADIdentityProvider`
    pub kind: String,

    /// AAD application ID
    pub client_id: String,

    /// AAD application secret
    pub secret: String,

    /// AAD tenant ID
    pub tenant_id: String,
}
