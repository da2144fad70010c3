//! API versions and the validation rules bound to each of them
//!
//! A manifest enters the chain in a versioned state. Each version pins the
//! OpenShift releases, VM sizes and pool sizes it accepts, so validators for
//! different versions can coexist while callers migrate.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Manifest schema version
#[derive(
    Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum ApiVersion {
    /// First public preview
    #[serde(rename = "2018-09-30-preview")]
    V20180930Preview,
    /// General availability
    #[serde(rename = "2019-04-30")]
    V20190430,
}

impl ApiVersion {
    /// Every version this build understands, oldest first
    pub const ALL: [ApiVersion; 2] = [Self::V20180930Preview, Self::V20190430];

    /// The version string as it appears in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V20180930Preview => "2018-09-30-preview",
            Self::V20190430 => "2019-04-30",
        }
    }

    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                Error::validation(
                    "apiVersion",
                    format!(
                        "unsupported api version {:?}, expected one of: {}",
                        s,
                        Self::ALL.map(|v| v.as_str()).join(", ")
                    ),
                )
            })
    }

    /// Validation rules for this version
    pub fn rules(&self) -> VersionRules {
        match self {
            Self::V20180930Preview => VersionRules {
                openshift_versions: &["v3.10", "v3.11"],
                master_vm_sizes: &["Standard_D4s_v3", "Standard_D8s_v3"],
                agent_vm_sizes: &["Standard_D2s_v3", "Standard_D4s_v3", "Standard_D8s_v3"],
                max_compute_count: 5,
                infra_counts: 2..=2,
            },
            Self::V20190430 => VersionRules {
                openshift_versions: &["v3.11"],
                master_vm_sizes: &["Standard_D4s_v3", "Standard_D8s_v3", "Standard_D16s_v3"],
                agent_vm_sizes: &[
                    "Standard_D2s_v3",
                    "Standard_D4s_v3",
                    "Standard_D8s_v3",
                    "Standard_D16s_v3",
                    "Standard_E4s_v3",
                ],
                max_compute_count: 20,
                infra_counts: 2..=3,
            },
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Limits a manifest must satisfy for a given api version
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionRules {
    /// Accepted `openShiftVersion` values
    pub openshift_versions: &'static [&'static str],
    /// Accepted master VM sizes
    pub master_vm_sizes: &'static [&'static str],
    /// Accepted infra/compute VM sizes
    pub agent_vm_sizes: &'static [&'static str],
    /// Largest node count a single compute pool may request
    pub max_compute_count: u32,
    /// Accepted infra pool sizes
    pub infra_counts: std::ops::RangeInclusive<u32>,
}

/// Parse an OpenShift release string ("v3.11") into (major, minor)
pub fn parse_openshift_version(s: &str) -> Option<(u32, u32)> {
    let rest = s.strip_prefix('v')?;
    let (major, minor) = rest.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}
