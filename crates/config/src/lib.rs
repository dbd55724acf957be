//! Configuration loading and validation.
//!
//! Config file: `curfew.toml`, searched in `./` then `~/.config/curfew/`.
//! Environment variables (`DISCORD_BOT_TOKEN`, `CURFEW_FLIP_INTERVAL`,
//! `CURFEW_DEBUG`, `CURFEW_METRICS_LISTEN`) override file values.

pub mod error;
pub mod interval;
pub mod loader;
pub mod schema;
pub mod settings;

pub use {
    error::{Error, Result},
    interval::{MAX_INTERVAL, parse_interval},
    loader::{
        ENV_DEBUG, ENV_FLIP_INTERVAL, ENV_METRICS_LISTEN, ENV_TOKEN, apply_env_overrides,
        config_dir, discover_and_load, find_config_file, load_config, load_settings,
    },
    schema::CurfewConfig,
    settings::{DEFAULT_METRICS_LISTEN, MetricsSettings, Settings},
};
