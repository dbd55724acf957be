//! Validated runtime settings.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use secrecy::Secret;

use crate::{
    Error, Result,
    interval::parse_interval,
    loader::{ENV_FLIP_INTERVAL, ENV_TOKEN},
    schema::CurfewConfig,
};

/// Everything the bot needs to run, checked and parsed.
#[derive(Debug, Clone)]
pub struct Settings {
    pub token: Secret<String>,
    pub flip_interval: Duration,
    pub debug: bool,
    pub metrics: MetricsSettings,
}

/// Scrape address used when metrics are enabled without `listen`.
pub const DEFAULT_METRICS_LISTEN: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9464);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub listen: SocketAddr,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: DEFAULT_METRICS_LISTEN,
        }
    }
}

impl Settings {
    /// Resolve a loaded config into settings. A missing token or interval is
    /// an error, as is an interval that fails to parse or exceeds 12 hours.
    pub fn from_config(config: CurfewConfig) -> Result<Self> {
        let token = config.discord.token.ok_or(Error::Missing {
            what: "bot token",
            env: ENV_TOKEN,
        })?;
        let raw_interval = config.schedule.interval.ok_or(Error::Missing {
            what: "flip interval",
            env: ENV_FLIP_INTERVAL,
        })?;
        let flip_interval = parse_interval(&raw_interval)?;

        Ok(Self {
            token,
            flip_interval,
            debug: config.debug,
            metrics: MetricsSettings {
                enabled: config.metrics.enabled,
                listen: config.metrics.listen.unwrap_or(DEFAULT_METRICS_LISTEN),
            },
        })
    }
}
