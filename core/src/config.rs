//! Router configuration.
//!
//! Loaded from YAML, typically next to the bot's other settings. Every
//! field has a default, so an empty document is a valid configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! prefix: "/"
//! bot_username: jobs_bot
//! max_name_len: 32
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Settings shared by every root in a [`Router`](crate::Router).
///
/// # Examples
///
/// ```
/// use chain_command_core::RouterConfig;
///
/// let config: RouterConfig = serde_yaml::from_str("bot_username: jobs_bot").unwrap();
/// assert_eq!(config.prefix, '/');
/// assert_eq!(config.bot_username.as_deref(), Some("jobs_bot"));
/// assert_eq!(config.max_name_len, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Character every root command starts with.
    pub prefix: char,
    /// This bot's username. When set, `/cmd@name` addresses this bot only
    /// if `name` matches.
    pub bot_username: Option<String>,
    /// Longest allowed command or subcommand name, prefix excluded.
    pub max_name_len: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            prefix: '/',
            bot_username: None,
            max_name_len: 32,
        }
    }
}

impl RouterConfig {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if parsing fails, or [`ConfigError::Invalid`]
    /// if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(ConfigError::from)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written, or
    /// [`ConfigError::Yaml`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path).map_err(ConfigError::from)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self).map_err(ConfigError::from)?;
        Ok(())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a whitespace or quote prefix, a
    /// zero name length, or an empty bot username.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.is_whitespace() || self.prefix == '"' {
            return Err(ConfigError::Invalid(format!(
                "prefix {:?} cannot start a command",
                self.prefix
            ))
            .into());
        }
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid("max_name_len must be at least 1".to_string()).into());
        }
        if self.bot_username.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("bot_username cannot be empty".to_string()).into());
        }
        Ok(())
    }

    /// Returns `true` if `text` starts with the command prefix.
    pub fn is_command(&self, text: &str) -> bool {
        text.trim_start().starts_with(self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: RouterConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, RouterConfig::default());
    }

    #[test]
    fn test_deserialize_complete() {
        let yaml = "prefix: '!'\nbot_username: jobs_bot\nmax_name_len: 16\n";
        let config: RouterConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.prefix, '!');
        assert_eq!(config.bot_username.as_deref(), Some("jobs_bot"));
        assert_eq!(config.max_name_len, 16);
        assert!(config.is_command("  !start"));
        assert!(!config.is_command("/start"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let space = RouterConfig {
            prefix: ' ',
            ..Default::default()
        };
        assert!(matches!(space.validate(), Err(Error::Config(ConfigError::Invalid(_)))));

        let zero = RouterConfig {
            max_name_len: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let blank = RouterConfig {
            bot_username: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.yml");

        let original = RouterConfig {
            prefix: '!',
            bot_username: Some("jobs_bot".to_string()),
            max_name_len: 20,
        };
        original.save(&path).unwrap();

        let loaded = RouterConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RouterConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Io(_))));
    }
}
