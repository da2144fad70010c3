//! Cluster health checking
//!
//! A cluster is handed over once every public endpoint has answered healthy
//! on several consecutive probes. A single good answer is not enough: routers
//! and the console commonly flap while the control plane settles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use osa_common::api::ManagedOpenShiftCluster;
use osa_common::config::{CertificateName, OpenShiftAzureConfig};
use osa_common::Error;

use crate::plugin::HealthChecker;

/// Per-request timeout of the HTTP probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Probes a single endpoint
///
/// This trait allows mocking HTTP access in tests while using a real client
/// in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe `url`, trusting only `ca_pem`
    ///
    /// `Ok(())` means healthy; the error describes the observed state.
    async fn probe(&self, url: &str, ca_pem: &str) -> Result<(), String>;
}

/// [`HealthProbe`] over HTTPS
#[derive(Clone, Debug, Default)]
pub struct HttpProbe;

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self, url: &str, ca_pem: &str) -> Result<(), String> {
        let ca = reqwest::Certificate::from_pem(ca_pem.as_bytes())
            .map_err(|e| format!("invalid CA certificate: {}", e))?;
        let client = reqwest::Client::builder()
            .tls_built_in_root_certs(false)
            .add_root_certificate(ca)
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;

        let response = client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", status))
        }
    }
}

/// How long and how strictly to wait for health
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthSettings {
    /// Give up on an endpoint after this long
    pub timeout: Duration,
    /// Pause between probes of the same endpoint
    pub interval: Duration,
    /// Consecutive healthy probes required
    pub stability_threshold: u32,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(2),
            stability_threshold: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Endpoint {
    component: &'static str,
    url: String,
}

fn endpoints(cluster: &ManagedOpenShiftCluster, config: &OpenShiftAzureConfig) -> Vec<Endpoint> {
    let props = &cluster.properties;
    vec![
        Endpoint {
            component: "api-server",
            url: format!("https://{}/healthz", props.fqdn),
        },
        Endpoint {
            component: "console",
            url: format!("https://{}/console/", props.public_hostname()),
        },
        Endpoint {
            component: "router",
            url: format!("https://{}/healthz", config.router_hostname),
        },
    ]
}

/// Default [`HealthChecker`]
#[derive(Clone)]
pub struct DefaultHealthChecker {
    probe: Arc<dyn HealthProbe>,
    settings: HealthSettings,
}

impl std::fmt::Debug for DefaultHealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultHealthChecker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DefaultHealthChecker {
    /// Create a checker that probes through `probe`
    pub fn new(probe: Arc<dyn HealthProbe>, settings: HealthSettings) -> Self {
        Self { probe, settings }
    }

    /// Create a checker that probes over HTTPS
    pub fn http(settings: HealthSettings) -> Self {
        Self::new(Arc::new(HttpProbe), settings)
    }

    /// Poll one endpoint until it is stable or the timeout passes
    ///
    /// The deadline bounds each probe call as well as the polling.
    async fn wait_until_stable(&self, endpoint: &Endpoint, ca_pem: &str) -> Result<(), Error> {
        let settings = &self.settings;
        let deadline = Instant::now() + settings.timeout;
        let mut streak = 0;
        let mut last = "not probed".to_string();

        loop {
            match timeout_at(deadline, self.probe.probe(&endpoint.url, ca_pem)).await {
                Ok(Ok(())) => {
                    streak += 1;
                    if streak >= settings.stability_threshold {
                        debug!(component = endpoint.component, "endpoint stable");
                        return Ok(());
                    }
                    last = format!("healthy {} of {} times", streak, settings.stability_threshold);
                }
                Ok(Err(status)) => {
                    debug!(
                        component = endpoint.component,
                        url = %endpoint.url,
                        status = %status,
                        streak,
                        "probe failed"
                    );
                    streak = 0;
                    last = status;
                }
                Err(_) => {
                    last = format!("no answer before the deadline (last status: {})", last);
                    return Err(self.timed_out(endpoint, &last));
                }
            }

            if Instant::now() >= deadline {
                return Err(self.timed_out(endpoint, &last));
            }
            sleep_until((Instant::now() + settings.interval).min(deadline)).await;
        }
    }

    fn timed_out(&self, endpoint: &Endpoint, last: &str) -> Error {
        warn!(
            component = endpoint.component,
            url = %endpoint.url,
            last = %last,
            "timed out waiting for endpoint"
        );
        Error::health(
            endpoint.component,
            format!(
                "not stable after {:?} ({}): {}",
                self.settings.timeout, endpoint.url, last
            ),
        )
    }
}

#[async_trait]
impl HealthChecker for DefaultHealthChecker {
    async fn check(
        &self,
        cluster: &ManagedOpenShiftCluster,
        config: &OpenShiftAzureConfig,
    ) -> Vec<Error> {
        let ca = match config.require_certificate(CertificateName::Ca) {
            Ok(pair) => pair.cert.as_str(),
            Err(e) => return vec![Error::health("cluster", e.to_string())],
        };

        let endpoints = endpoints(cluster, config);
        info!(cluster = %cluster.name, endpoints = endpoints.len(), "waiting for cluster health");

        let results = join_all(endpoints.iter().map(|ep| self.wait_until_stable(ep, ca))).await;
        let errors: Vec<Error> = results.into_iter().filter_map(Result::err).collect();

        if errors.is_empty() {
            info!(cluster = %cluster.name, "cluster healthy");
        } else {
            warn!(cluster = %cluster.name, failed = errors.len(), "cluster not healthy");
        }
        errors
    }
}
