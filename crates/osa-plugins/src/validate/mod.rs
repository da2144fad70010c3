//! Manifest validation
//!
//! - [`versioned`] - checks bound to one api version's rules
//! - [`upgrade`] - checks of a manifest against the one it replaces
//!
//! Versioned validation always runs first. Normalization and upgrade checks
//! only run on manifests that passed it, so upgrade checks can rely on every
//! field being well formed.

mod upgrade;
mod versioned;

use tracing::{debug, info};

use osa_common::api::{ApiVersion, ManagedOpenShiftCluster, ProvisioningState, VersionRules};
use osa_common::{Error, ValidationErrors};

use crate::plugin::Validator;

/// Validator bound to the rules of one api version
#[derive(Clone, Debug)]
pub struct ManifestValidator {
    api_version: ApiVersion,
    rules: VersionRules,
}

impl ManifestValidator {
    /// Create a validator for `api_version`
    pub fn new(api_version: ApiVersion) -> Self {
        Self {
            api_version,
            rules: api_version.rules(),
        }
    }

    /// The api version this validator accepts
    pub fn api_version(&self) -> ApiVersion {
        self.api_version
    }
}

impl Validator for ManifestValidator {
    fn validate(
        &self,
        new: &ManagedOpenShiftCluster,
        old: Option<&ManagedOpenShiftCluster>,
    ) -> Result<ManagedOpenShiftCluster, ValidationErrors> {
        if new.api_version != self.api_version {
            return Err(ValidationErrors(vec![Error::validation(
                "apiVersion",
                format!(
                    "validator for {} cannot validate a {} manifest",
                    self.api_version, new.api_version
                ),
            )]));
        }

        let errs = versioned::validate(new, &self.rules);
        if !errs.is_empty() {
            debug!(cluster = %new.name, errors = errs.len(), "versioned validation failed");
            return Err(errs);
        }

        let normalized = normalize(new, old.is_some());

        if let Some(old) = old {
            let errs = upgrade::validate(&normalized, &normalize(old, true));
            if !errs.is_empty() {
                debug!(cluster = %new.name, errors = errs.len(), "upgrade validation failed");
                return Err(errs);
            }
        }

        info!(
            cluster = %normalized.name,
            api_version = %self.api_version,
            upgrade = old.is_some(),
            "manifest validated"
        );
        Ok(normalized)
    }
}

/// Validator for the given api version
pub fn validator_for(api_version: ApiVersion) -> Box<dyn Validator> {
    Box::new(ManifestValidator::new(api_version))
}

/// Fill defaults and canonicalize hostnames
fn normalize(cluster: &ManagedOpenShiftCluster, updating: bool) -> ManagedOpenShiftCluster {
    let mut out = cluster.clone();
    let props = &mut out.properties;

    props.fqdn = props.fqdn.to_ascii_lowercase();
    props.public_hostname = Some(
        props
            .public_hostname
            .as_deref()
            .unwrap_or(&props.fqdn)
            .to_ascii_lowercase(),
    );

    for router in &mut props.router_profiles {
        router.public_subdomain = router.public_subdomain.to_ascii_lowercase();
        router.fqdn = Some(
            router
                .fqdn
                .as_deref()
                .unwrap_or(&router.public_subdomain)
                .to_ascii_lowercase(),
        );
    }

    props.provisioning_state = Some(if updating {
        ProvisioningState::Updating
    } else {
        ProvisioningState::Creating
    });

    out
}
