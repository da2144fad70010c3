//! Checks of a normalized manifest against the previously accepted one

use std::collections::BTreeSet;

use osa_common::api::{parse_openshift_version, AgentPoolRole, ManagedOpenShiftCluster};
use osa_common::ValidationErrors;

const IMMUTABLE: &str = "cannot be changed after creation";

/// Validate the transition from `old` to `new`; both must be normalized
pub(super) fn validate(
    new: &ManagedOpenShiftCluster,
    old: &ManagedOpenShiftCluster,
) -> ValidationErrors {
    let mut errs = ValidationErrors::new();
    let (np, op) = (&new.properties, &old.properties);

    if new.name != old.name {
        errs.push("name", IMMUTABLE);
    }
    if new.location != old.location {
        errs.push("location", IMMUTABLE);
    }
    if np.fqdn != op.fqdn {
        errs.push("properties.fqdn", IMMUTABLE);
    }
    if np.public_hostname() != op.public_hostname() {
        errs.push("properties.publicHostname", IMMUTABLE);
    }
    if np.network_profile != op.network_profile {
        errs.push("properties.networkProfile", IMMUTABLE);
    }
    if np.master_pool_profile != op.master_pool_profile {
        errs.push("properties.masterPoolProfile", IMMUTABLE);
    }
    if np.router_profiles != op.router_profiles {
        errs.push("properties.routerProfiles", IMMUTABLE);
    }

    match (
        parse_openshift_version(&op.openshift_version),
        parse_openshift_version(&np.openshift_version),
    ) {
        (Some(from), Some(to)) if to < from => errs.push(
            "properties.openShiftVersion",
            format!(
                "cannot downgrade from {} to {}",
                op.openshift_version, np.openshift_version
            ),
        ),
        (Some(_), Some(_)) => {}
        _ if np.openshift_version != op.openshift_version => errs.push(
            "properties.openShiftVersion",
            format!(
                "cannot move from {:?} to {:?}",
                op.openshift_version, np.openshift_version
            ),
        ),
        _ => {}
    }

    let old_names: BTreeSet<&str> = op
        .agent_pool_profiles
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    let new_names: BTreeSet<&str> = np
        .agent_pool_profiles
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    if old_names != new_names {
        errs.push(
            "properties.agentPoolProfiles",
            format!(
                "agent pools cannot be added or removed (had {:?}, got {:?})",
                old_names, new_names
            ),
        );
    }

    for (i, pool) in np.agent_pool_profiles.iter().enumerate() {
        let Some(prev) = op.agent_pool(&pool.name) else {
            continue;
        };
        let path = format!("properties.agentPoolProfiles[{}]", i);

        if pool.role != prev.role {
            errs.push(format!("{}.role", path), IMMUTABLE);
        }
        if pool.vm_size != prev.vm_size {
            errs.push(format!("{}.vmSize", path), IMMUTABLE);
        }
        if pool.subnet_cidr != prev.subnet_cidr {
            errs.push(format!("{}.subnetCidr", path), IMMUTABLE);
        }
        if pool.os_type != prev.os_type {
            errs.push(format!("{}.osType", path), IMMUTABLE);
        }
        if prev.role == AgentPoolRole::Infra && pool.count != prev.count {
            errs.push(format!("{}.count", path), "infra pool cannot be scaled");
        }
    }

    errs
}
