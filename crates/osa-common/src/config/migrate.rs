//! Loading persisted configs across format versions
//!
//! Each step upgrades the raw JSON document by exactly one version. Steps only
//! move or rename data; values a step introduces are left empty for the config
//! manager to generate, so migration never invents secret material.

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::OpenShiftAzureConfig;
use crate::{Error, Result, CONFIG_VERSION};

/// Upgrades a document from version `n` to `n + 1`, where `n` is the index + 1
type MigrationStep = fn(&mut Map<String, Value>) -> std::result::Result<(), String>;

const MIGRATIONS: &[MigrationStep] = &[v1_to_v2];

/// Parse a persisted config, migrating it to [`CONFIG_VERSION`].
///
/// Configs without a `version` field predate versioning and are treated as v1.
/// Configs written by a newer plugin are rejected; downgrades are not supported.
pub fn load(bytes: &[u8]) -> Result<OpenShiftAzureConfig> {
    let mut value: Value = serde_json::from_slice(bytes)?;
    let doc = value
        .as_object_mut()
        .ok_or_else(|| Error::serialization("config", "config must be a JSON object"))?;

    let version = match doc.get("version") {
        None => 1,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                Error::migration(0, CONFIG_VERSION, format!("invalid config version {}", v))
            })?,
    };

    if version > CONFIG_VERSION {
        return Err(Error::migration(
            version,
            CONFIG_VERSION,
            "config was written by a newer plugin, downgrades are not supported",
        ));
    }

    let mut current = version;
    while current < CONFIG_VERSION {
        let step = MIGRATIONS[(current - 1) as usize];
        step(doc).map_err(|msg| Error::migration(current, current + 1, msg))?;
        debug!(from = current, to = current + 1, "migrated config");
        current += 1;
    }
    doc.insert("version".to_string(), json!(CONFIG_VERSION));

    if version < CONFIG_VERSION {
        info!(from = version, to = CONFIG_VERSION, "config migrated");
    }

    Ok(serde_json::from_value(value)?)
}

/// v1 stored certificates as a list and a single session secret.
fn v1_to_v2(doc: &mut Map<String, Value>) -> std::result::Result<(), String> {
    match doc.remove("certificates") {
        Some(Value::Array(entries)) => {
            let mut certs = Map::new();
            for entry in entries {
                let name = entry
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or("certificate entry without a name")?;
                let field = |f: &str| {
                    entry
                        .get(f)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| format!("certificate {} has no {}", name, f))
                };
                certs.insert(
                    name.to_string(),
                    json!({ "cert": field("cert")?, "key": field("key")? }),
                );
            }
            doc.insert("certificates".to_string(), Value::Object(certs));
        }
        Some(Value::Null) | None => {}
        Some(other @ Value::Object(_)) => {
            doc.insert("certificates".to_string(), other);
        }
        Some(_) => return Err("certificates must be a list".to_string()),
    }

    if let Some(Value::Object(secrets)) = doc.get_mut("secrets") {
        if let Some(session) = secrets.remove("sessionSecret") {
            secrets
                .entry("sessionAuthSecret".to_string())
                .or_insert(session);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CertificateName;

    #[test]
    fn test_current_version_loads_unchanged() {
        let mut config = OpenShiftAzureConfig {
            version: CONFIG_VERSION,
            plugin_version: "v1.2".to_string(),
            ..Default::default()
        };
        config.secrets.session_auth_secret = "auth".to_string();
        let bytes = config.to_bytes().expect("config should serialize");

        let loaded = load(&bytes).expect("current config should load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unversioned_config_is_migrated_from_v1() {
        let v1 = json!({
            "pluginVersion": "v0.9",
            "certificates": [
                { "name": "Ca", "cert": "ca-cert", "key": "ca-key" },
                { "name": "Router", "cert": "router-cert", "key": "router-key" }
            ],
            "secrets": { "sessionSecret": "c2Vzc2lvbg==", "registryHttpSecret": "cmVn" }
        });

        let loaded = load(v1.to_string().as_bytes()).expect("v1 config should migrate");

        assert_eq!(loaded.version, CONFIG_VERSION);
        assert_eq!(loaded.plugin_version, "v0.9");
        assert_eq!(
            loaded
                .certificate(CertificateName::Router)
                .map(|c| c.cert.as_str()),
            Some("router-cert")
        );
        assert_eq!(loaded.secrets.session_auth_secret, "c2Vzc2lvbg==");
        assert_eq!(loaded.secrets.registry_http_secret, "cmVn");
        assert!(
            loaded.secrets.session_encryption_secret.is_empty(),
            "migration must not invent secrets"
        );
    }

    #[test]
    fn test_explicit_v1_is_migrated() {
        let v1 = json!({ "version": 1, "certificates": [] });
        let loaded = load(v1.to_string().as_bytes()).expect("v1 config should migrate");
        assert_eq!(loaded.version, CONFIG_VERSION);
        assert!(loaded.certificates.is_empty());
    }

    #[test]
    fn test_newer_config_is_rejected() {
        let future = json!({ "version": CONFIG_VERSION + 1 });
        let err = load(future.to_string().as_bytes()).expect_err("newer config must fail");
        assert!(matches!(err, Error::Migration { from, .. } if from == CONFIG_VERSION + 1));
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        for bad in [json!({ "version": 0 }), json!({ "version": "two" })] {
            assert!(load(bad.to_string().as_bytes()).is_err());
        }
    }

    #[test]
    fn test_malformed_v1_certificate_names_step() {
        let v1 = json!({ "certificates": [ { "cert": "x", "key": "y" } ] });
        let err = load(v1.to_string().as_bytes()).expect_err("nameless cert must fail");
        assert!(matches!(err, Error::Migration { from: 1, to: 2, .. }));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(load(b"[1, 2, 3]").is_err());
        assert!(load(b"not json").is_err());
    }
}
