//! Config file schema. Every field is optional here; required values are
//! enforced when resolving [`crate::Settings`].

use std::net::SocketAddr;

use {secrecy::Secret, serde::Deserialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurfewConfig {
    /// Verbose logging when no explicit log level is given.
    pub debug: bool,
    pub discord: DiscordConfig,
    pub schedule: ScheduleConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token.
    pub token: Option<Secret<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// ISO-8601 duration, e.g. `PT1H`.
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Address for the Prometheus scrape endpoint. Defaults to
    /// `127.0.0.1:9464` when metrics are enabled.
    pub listen: Option<SocketAddr>,
}
