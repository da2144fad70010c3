//! External manifest schema
//!
//! - [`cluster`] - `ManagedOpenShiftCluster` and its profiles
//! - [`version`] - API versions and their validation rules
//! - [`net`] - CIDR and DNS helpers

mod cluster;
mod net;
mod version;

pub use cluster::{
    AadIdentityProvider, AgentPoolProfile, AgentPoolRole, AuthProfile, IdentityProvider,
    ManagedOpenShiftCluster, MasterPoolProfile, NetworkProfile, OsType, Properties,
    ProvisioningState, RouterProfile, AAD_PROVIDER_KIND, DEFAULT_ROUTER_NAME, INFRA_POOL_NAME,
};
pub use net::{validate_dns_label, validate_dns_name, Ipv4Cidr};
pub use version::{parse_openshift_version, ApiVersion, VersionRules};

/// JSON schema of the manifest, for editors and API docs
pub fn manifest_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(ManagedOpenShiftCluster)
}
