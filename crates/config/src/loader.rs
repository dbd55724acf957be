use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{Error, Result, schema::CurfewConfig, settings::Settings};

pub const CONFIG_FILENAME: &str = "curfew.toml";

pub const ENV_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_FLIP_INTERVAL: &str = "CURFEW_FLIP_INTERVAL";
pub const ENV_DEBUG: &str = "CURFEW_DEBUG";
pub const ENV_METRICS_LISTEN: &str = "CURFEW_METRICS_LISTEN";

/// Load config from the given TOML file.
pub fn load_config(path: &Path) -> Result<CurfewConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load config from `explicit`, or from the first file found in standard
/// locations.
///
/// Search order when no path is given:
/// 1. `./curfew.toml`
/// 2. `~/.config/curfew/curfew.toml` (platform equivalent)
///
/// Returns `CurfewConfig::default()` if nothing is found. An explicit path
/// that cannot be read is an error.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<CurfewConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using environment only");
            Ok(CurfewConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .filter(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/curfew/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "curfew").map(|d| d.config_dir().to_path_buf())
}

/// Overlay environment values onto a loaded config. Empty values count as
/// unset. `lookup` is usually `|k| std::env::var(k).ok()`.
pub fn apply_env_overrides(
    config: &mut CurfewConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get(ENV_TOKEN) {
        config.discord.token = Some(Secret::new(token.trim().to_string()));
    }
    if let Some(interval) = get(ENV_FLIP_INTERVAL) {
        config.schedule.interval = Some(interval.trim().to_string());
    }
    if let Some(raw) = get(ENV_DEBUG) {
        config.debug = parse_bool(&raw).ok_or_else(|| {
            Error::invalid_env(ENV_DEBUG, format!("expected a boolean, got '{raw}'"))
        })?;
    }
    if let Some(raw) = get(ENV_METRICS_LISTEN) {
        let addr = raw
            .trim()
            .parse()
            .map_err(|e| Error::invalid_env(ENV_METRICS_LISTEN, format!("{e}")))?;
        config.metrics.listen = Some(addr);
        config.metrics.enabled = true;
    }
    Ok(())
}

/// File, then environment, then validation.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let mut config = discover_and_load(explicit)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Settings::from_config(config)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
