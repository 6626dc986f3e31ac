use std::fs;
use std::path::{Path, PathBuf};

use toml::Table;

use crate::app_config::AppConfig;
use crate::error::ConfigError;

/// A loaded config file: the typed [`AppConfig`] plus the raw table it
/// was parsed from, so fields this crate doesn't know about (custom
/// groups, keys a newer version of the program would add) survive a
/// load-edit-save cycle untouched.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    raw: Table,
    pub config: AppConfig,
}

impl ConfigFile {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let raw: Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, raw, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `self.config` back to `self.path`, overlaying only the
    /// fields this crate recognizes onto the originally loaded table so
    /// unrecognized keys and groups are preserved. Key ordering inside a
    /// group follows the typed struct, not the original file; inline
    /// comments are not preserved (no TOML-with-comments crate is part
    /// of this dependency stack).
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let overlay: Table = match toml::Value::try_from(&self.config)? {
            toml::Value::Table(t) => t,
            _ => unreachable!("AppConfig always serializes to a table"),
        };

        for (group, value) in overlay {
            match self.raw.get_mut(&group) {
                Some(toml::Value::Table(existing)) => {
                    if let toml::Value::Table(new_fields) = value {
                        for (k, v) in new_fields {
                            existing.insert(k, v);
                        }
                    }
                }
                _ => {
                    self.raw.insert(group, value);
                }
            }
        }

        let text = toml::to_string_pretty(&self.raw)?;
        fs::write(&self.path, text).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn save_default(path: impl Into<PathBuf>) -> Result<(), ConfigError> {
    let path = path.into();
    let config = AppConfig::default();
    let text = toml::to_string_pretty(&config)?;
    fs::write(&path, text).map_err(|source| ConfigError::Write { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_unknown_keys_and_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[general]
sum_images = 5
real_time = false
custom_note = "kept across a save"

[experimental]
flag = true
"#,
        )
        .unwrap();

        let mut cfg = ConfigFile::load(&path).unwrap();
        assert_eq!(cfg.config.general.sum_images, 5);
        cfg.config.general.sum_images = 20;
        cfg.save().unwrap();

        let reloaded = ConfigFile::load(&path).unwrap();
        assert_eq!(reloaded.config.general.sum_images, 20);
        assert_eq!(
            reloaded.raw.get("general").unwrap().get("custom_note").unwrap().as_str(),
            Some("kept across a save")
        );
        assert!(reloaded.raw.get("experimental").is_some());
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let err = ConfigFile::load("/nonexistent/path/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn save_default_produces_a_loadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        save_default(&path).unwrap();
        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.config, AppConfig::default());
    }
}
