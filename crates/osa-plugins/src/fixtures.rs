//! Shared manifests for unit tests

use osa_common::api::ManagedOpenShiftCluster;

pub(crate) const CLUSTER_YAML: &str = include_str!("../tests/fixtures/cluster.yaml");

/// The fixture manifest exactly as a caller would submit it
pub(crate) fn manifest() -> ManagedOpenShiftCluster {
    ManagedOpenShiftCluster::from_yaml(CLUSTER_YAML).expect("fixture manifest should parse")
}

/// The fixture manifest after a successful validation
pub(crate) fn validated() -> ManagedOpenShiftCluster {
    crate::validate::validator_for(osa_common::api::ApiVersion::V20190430)
        .validate(&manifest(), None)
        .expect("fixture manifest should validate")
}
