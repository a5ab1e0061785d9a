//! Configuration loaded from `config.toml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculator::{NumberFormatConfig, Operator};

pub const APP_NAME: &str = "padcalc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid number format: {0}")]
    InvalidFormat(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub format: NumberFormatConfig,
    pub history: HistoryConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Defaults to `history.json` in the user data directory.
    pub path: Option<PathBuf>,
    pub max_retries: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            max_retries: 3,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Defaults to `state.json` in the user state directory.
    pub state_path: Option<PathBuf>,
}

impl Config {
    /// `<config_dir>/padcalc/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let config: Self =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let NumberFormatConfig {
            decimal_separator,
            grouping_separator,
        } = self.format;

        if decimal_separator == grouping_separator {
            return Err(ConfigError::InvalidFormat(format!(
                "decimal and grouping separators are both '{decimal_separator}'"
            )));
        }

        for separator in [decimal_separator, grouping_separator] {
            if separator.is_ascii_digit()
                || separator.is_alphabetic()
                || Operator::is_glyph(separator)
                || matches!(separator, '(' | ')' | '^' | '*' | '/')
            {
                return Err(ConfigError::InvalidFormat(format!(
                    "'{separator}' cannot be used as a separator"
                )));
            }
        }

        Ok(())
    }

    pub fn history_path(&self) -> Option<PathBuf> {
        self.history
            .path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join(APP_NAME).join("history.json")))
    }

    pub fn state_path(&self) -> Option<PathBuf> {
        self.session.state_path.clone().or_else(|| {
            dirs::state_dir()
                .or_else(dirs::data_dir)
                .map(|dir| dir.join(APP_NAME).join("state.json"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.format, NumberFormatConfig::default());
        assert!(config.history.enabled);
        assert_eq!(config.history.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[format]
decimal_separator = ","
grouping_separator = "."

[history]
path = "/tmp/padcalc-history.json"
max_retries = 1
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.format.decimal_separator, ',');
        assert_eq!(config.format.grouping_separator, '.');
        assert_eq!(config.history.max_retries, 1);
        assert!(config.history.enabled);
        assert_eq!(
            config.history_path(),
            Some(PathBuf::from("/tmp/padcalc-history.json"))
        );
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(dir.path().join("missing.toml").as_path()));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[format\n").unwrap();
        assert!(matches!(
            Config::load(Some(path.as_path())),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_separators() {
        let mut config = Config::default();
        config.format.grouping_separator = '.';
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFormat(_))
        ));

        config.format.grouping_separator = '×';
        assert!(config.validate().is_err());

        config.format.grouping_separator = '\u{a0}';
        assert!(config.validate().is_ok());

        config.format.grouping_separator = '\'';
        assert!(config.validate().is_ok());
    }
}
