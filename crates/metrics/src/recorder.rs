//! Metrics recorder initialization and configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tracing::info;

use crate::error::Result;

/// Scrape address used when none is configured.
pub const DEFAULT_LISTEN: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9464);

/// Configuration for the metrics system.
#[derive(Debug, Clone)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address the Prometheus scrape endpoint binds to.
    pub listen: SocketAddr,
}

impl Default for MetricsRecorderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: DEFAULT_LISTEN,
        }
    }
}

/// Initialize the metrics system.
///
/// Call once at startup, from inside the tokio runtime. Without the
/// `prometheus` feature (or with `enabled = false`) no recorder is installed
/// and the facade macros are no-ops.
///
/// # Errors
///
/// Returns an error if the exporter fails to build or bind.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        init_prometheus(config.listen)
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!(listen = %config.listen, "metrics feature not enabled at compile time");
        Ok(())
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(addr: SocketAddr) -> Result<()> {
    use {
        crate::buckets,
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(crate::flip::PASS_DURATION_SECONDS.to_string()),
            &buckets::PASS_DURATION,
        )?
        .set_buckets_for_metric(
            Matcher::Full(crate::scheduler::TICK_LATENCY_SECONDS.to_string()),
            &buckets::TICK_LATENCY,
        )?
        .with_http_listener(addr)
        .install()?;
    info!(%addr, "prometheus exporter listening");
    Ok(())
}
