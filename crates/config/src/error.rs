use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid flip interval '{input}': {reason}")]
    InvalidInterval { input: String, reason: String },

    #[error("missing {what}; set {env} or configure it in the config file")]
    Missing {
        what: &'static str,
        env: &'static str,
    },

    #[error("invalid value for {name}: {reason}")]
    InvalidEnv { name: &'static str, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_interval(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInterval {
            input: input.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_env(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidEnv {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
