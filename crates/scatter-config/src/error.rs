use std::path::PathBuf;

use thiserror::Error;

/// Config-class errors per the error taxonomy: anything here means the
/// run never starts, and the process exits before spawning any stage.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config group [{group}] is missing required field `{field}`")]
    MissingField { group: &'static str, field: &'static str },

    #[error("config field [{group}].{field} is invalid: {reason}")]
    InvalidField {
        group: &'static str,
        field: &'static str,
        reason: String,
    },
}
