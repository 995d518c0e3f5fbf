use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::domain::{ConfigError, DialConfig};

// ============================================================================
// TomlConfigProvider - Config File Loading
// ============================================================================

/// Configuration file structure. Other tables are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    dial: DialConfig,
}

/// TOML-based configuration provider.
///
/// # Config File Format
///
/// ```toml
/// [dial]
/// max_dynamic_dials = 50
/// max_active_dial_tasks = 16
/// dial_timeout_secs = 15
/// static_nodes = [
///     "4a1f...e9@10.0.0.1:30303",
/// ]
/// bootnodes = []
/// netrestrict = "10.0.0.0/8, 192.168.0.0/16"
/// ```
///
/// Node entries and the netrestrict list are parsed eagerly, so a provider
/// that loaded successfully always yields a usable config.
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    config: DialConfig,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let config = file.dial;

        config.validate()?;
        config.static_nodes()?;
        config.bootnodes()?;
        config.netrestrict()?;

        Ok(Self { config })
    }

    pub fn config(&self) -> &DialConfig {
        &self.config
    }

    pub fn into_config(self) -> DialConfig {
        self.config
    }
}
