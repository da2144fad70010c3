//! Checks bound to the rules of a single api version
//!
//! Every check runs regardless of earlier failures so the caller gets the
//! full list in one pass.

use std::collections::BTreeSet;

use osa_common::api::{
    validate_dns_label, validate_dns_name, AgentPoolRole, Ipv4Cidr, ManagedOpenShiftCluster,
    OsType, VersionRules, AAD_PROVIDER_KIND, DEFAULT_ROUTER_NAME, INFRA_POOL_NAME,
};
use osa_common::{ValidationErrors, MASTER_COUNT};

/// Longest agent pool name; scale set and host names are derived from it
const MAX_POOL_NAME_LEN: usize = 12;

/// Validate `cluster` against `rules`, collecting every violation
pub(super) fn validate(
    cluster: &ManagedOpenShiftCluster,
    rules: &VersionRules,
) -> ValidationErrors {
    let mut errs = ValidationErrors::new();
    let props = &cluster.properties;

    if let Err(msg) = validate_dns_label(&cluster.name) {
        errs.push("name", msg);
    }
    if cluster.location.trim().is_empty() {
        errs.push("location", "must not be empty");
    }

    if !rules.openshift_versions.contains(&props.openshift_version.as_str()) {
        errs.push(
            "properties.openShiftVersion",
            format!(
                "unsupported OpenShift version {:?}, expected one of: {}",
                props.openshift_version,
                rules.openshift_versions.join(", ")
            ),
        );
    }

    if let Err(msg) = validate_dns_name(&props.fqdn) {
        errs.push("properties.fqdn", msg);
    }
    if let Some(hostname) = &props.public_hostname {
        if let Err(msg) = validate_dns_name(hostname) {
            errs.push("properties.publicHostname", msg);
        }
    }

    let vnet = match Ipv4Cidr::parse(&props.network_profile.vnet_cidr) {
        Ok(cidr) => Some(cidr),
        Err(msg) => {
            errs.push("properties.networkProfile.vnetCidr", msg);
            None
        }
    };
    if let Some(peer) = &props.network_profile.peer_vnet_id {
        if peer.trim().is_empty() {
            errs.push(
                "properties.networkProfile.peerVnetId",
                "must not be empty when set",
            );
        }
    }

    validate_routers(cluster, &mut errs);

    let mut subnets = Vec::new();

    let master = &props.master_pool_profile;
    if master.count != MASTER_COUNT {
        errs.push(
            "properties.masterPoolProfile.count",
            format!("must be {}, got {}", MASTER_COUNT, master.count),
        );
    }
    if !rules.master_vm_sizes.contains(&master.vm_size.as_str()) {
        errs.push(
            "properties.masterPoolProfile.vmSize",
            format!("unsupported master VM size {:?}", master.vm_size),
        );
    }
    let field = "properties.masterPoolProfile.subnetCidr".to_string();
    if let Some(subnet) = check_subnet(&mut errs, &field, &master.subnet_cidr, vnet.as_ref()) {
        subnets.push((field, subnet));
    }

    validate_agent_pools(cluster, rules, vnet.as_ref(), &mut subnets, &mut errs);
    validate_subnet_overlap(&subnets, &mut errs);
    validate_auth(cluster, &mut errs);

    errs
}

fn validate_routers(cluster: &ManagedOpenShiftCluster, errs: &mut ValidationErrors) {
    let routers = &cluster.properties.router_profiles;
    if routers.len() != 1 {
        errs.push(
            "properties.routerProfiles",
            format!("exactly one router profile is required, got {}", routers.len()),
        );
    }

    for (i, router) in routers.iter().enumerate() {
        let path = format!("properties.routerProfiles[{}]", i);
        if router.name != DEFAULT_ROUTER_NAME {
            errs.push(
                format!("{}.name", path),
                format!("must be {:?}, got {:?}", DEFAULT_ROUTER_NAME, router.name),
            );
        }
        if let Err(msg) = validate_dns_name(&router.public_subdomain) {
            errs.push(format!("{}.publicSubdomain", path), msg);
        }
        if let Some(fqdn) = &router.fqdn {
            if let Err(msg) = validate_dns_name(fqdn) {
                errs.push(format!("{}.fqdn", path), msg);
            }
        }
    }
}

fn validate_agent_pools(
    cluster: &ManagedOpenShiftCluster,
    rules: &VersionRules,
    vnet: Option<&Ipv4Cidr>,
    subnets: &mut Vec<(String, Ipv4Cidr)>,
    errs: &mut ValidationErrors,
) {
    let pools = &cluster.properties.agent_pool_profiles;

    let infra = pools
        .iter()
        .filter(|p| p.role == AgentPoolRole::Infra)
        .count();
    if infra != 1 {
        errs.push(
            "properties.agentPoolProfiles",
            format!("exactly one infra pool is required, got {}", infra),
        );
    }
    if !pools.iter().any(|p| p.role == AgentPoolRole::Compute) {
        errs.push(
            "properties.agentPoolProfiles",
            "at least one compute pool is required",
        );
    }

    let mut seen = BTreeSet::new();
    for (i, pool) in pools.iter().enumerate() {
        let path = format!("properties.agentPoolProfiles[{}]", i);

        if let Err(msg) = validate_pool_name(&pool.name) {
            errs.push(format!("{}.name", path), msg);
        }
        if !seen.insert(pool.name.as_str()) {
            errs.push(
                format!("{}.name", path),
                format!("duplicate pool name {:?}", pool.name),
            );
        }
        if pool.role == AgentPoolRole::Infra && pool.name != INFRA_POOL_NAME {
            errs.push(
                format!("{}.name", path),
                format!("infra pool must be named {:?}", INFRA_POOL_NAME),
            );
        }

        match pool.role {
            AgentPoolRole::Infra if !rules.infra_counts.contains(&pool.count) => errs.push(
                format!("{}.count", path),
                format!(
                    "infra count must be between {} and {}, got {}",
                    rules.infra_counts.start(),
                    rules.infra_counts.end(),
                    pool.count
                ),
            ),
            AgentPoolRole::Compute if pool.count < 1 || pool.count > rules.max_compute_count => {
                errs.push(
                    format!("{}.count", path),
                    format!(
                        "compute count must be between 1 and {}, got {}",
                        rules.max_compute_count, pool.count
                    ),
                )
            }
            _ => {}
        }

        if !rules.agent_vm_sizes.contains(&pool.vm_size.as_str()) {
            errs.push(
                format!("{}.vmSize", path),
                format!("unsupported {} VM size {:?}", pool.role, pool.vm_size),
            );
        }
        if pool.os_type != OsType::Linux {
            errs.push(format!("{}.osType", path), "only Linux is supported");
        }

        let field = format!("{}.subnetCidr", path);
        if let Some(subnet) = check_subnet(errs, &field, &pool.subnet_cidr, vnet) {
            subnets.push((field, subnet));
        }
    }
}

fn validate_pool_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > MAX_POOL_NAME_LEN {
        return Err(format!(
            "must be between 1 and {} characters, got {}",
            MAX_POOL_NAME_LEN,
            name.len()
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(format!("{:?} must start with a lowercase letter", name));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(format!(
            "{:?} must contain only lowercase letters and digits",
            name
        ));
    }
    Ok(())
}

/// Parse a subnet and check it lies inside the vnet
fn check_subnet(
    errs: &mut ValidationErrors,
    field: &str,
    cidr: &str,
    vnet: Option<&Ipv4Cidr>,
) -> Option<Ipv4Cidr> {
    match Ipv4Cidr::parse(cidr) {
        Ok(subnet) => {
            if let Some(vnet) = vnet {
                if !vnet.contains(&subnet) {
                    errs.push(field, format!("subnet {} is not inside vnet {}", subnet, vnet));
                }
            }
            Some(subnet)
        }
        Err(msg) => {
            errs.push(field, msg);
            None
        }
    }
}

/// Pools may share a subnet, but distinct subnets must not overlap
fn validate_subnet_overlap(subnets: &[(String, Ipv4Cidr)], errs: &mut ValidationErrors) {
    for (i, (_, a)) in subnets.iter().enumerate() {
        for (field, b) in &subnets[i + 1..] {
            if a != b && a.overlaps(b) {
                errs.push(field.clone(), format!("subnet {} overlaps subnet {}", b, a));
            }
        }
    }
}

fn validate_auth(cluster: &ManagedOpenShiftCluster, errs: &mut ValidationErrors) {
    let providers = &cluster.properties.auth_profile.identity_providers;
    if providers.len() != 1 {
        errs.push(
            "properties.authProfile.identityProviders",
            format!(
                "exactly one identity provider is required, got {}",
                providers.len()
            ),
        );
    }

    for (i, idp) in providers.iter().enumerate() {
        let path = format!("properties.authProfile.identityProviders[{}]", i);
        if idp.name.trim().is_empty() {
            errs.push(format!("{}.name", path), "must not be empty");
        }

        let provider = &idp.provider;
        if provider.kind != AAD_PROVIDER_KIND {
            errs.push(
                format!("{}.provider.kind", path),
                format!(
                    "unsupported provider kind {:?}, expected {:?}",
                    provider.kind, AAD_PROVIDER_KIND
                ),
            );
        }
        if provider.client_id.trim().is_empty() {
            errs.push(format!("{}.provider.clientId", path), "must not be empty");
        }
        if provider.secret.is_empty() {
            errs.push(format!("{}.provider.secret", path), "must not be empty");
        }
        if uuid::Uuid::parse_str(&provider.tenant_id).is_err() {
            errs.push(
                format!("{}.provider.tenantId", path),
                format!("{:?} is not a valid UUID", provider.tenant_id),
            );
        }
    }
}
