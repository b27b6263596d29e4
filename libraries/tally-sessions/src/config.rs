//! Listener configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_core::{Result, SourceId, TallyError};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "TALLY";

/// Listener settings, loaded from an optional TOML file and `TALLY_*` variables
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Keys and defaults for the per-source tracking preference
    #[serde(default = "default_preferences")]
    pub preferences: PreferenceSettings,
}

/// Keys used in the preference store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreferenceSettings {
    /// Prefix of per-source keys; the source identifier is appended
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Global key holding the default for newly seen sources
    #[serde(default = "default_track_new_sources_key")]
    pub track_new_sources_key: String,

    /// Default used when the global key itself is unset
    #[serde(default = "default_track_new_sources_default")]
    pub track_new_sources_default: bool,
}

impl PreferenceSettings {
    /// Store key of the per-source preference
    pub fn source_key(&self, source_id: &SourceId) -> String {
        format!("{}{}", self.key_prefix, source_id)
    }
}

impl ListenerConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Environment variables use the `TALLY_` prefix with `__` between
    /// sections, e.g. `TALLY_PREFERENCES__KEY_PREFIX`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(TallyError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| TallyError::config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TallyError::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.preferences.key_prefix.trim().is_empty() {
            return Err(TallyError::config(
                "preferences.key_prefix must not be empty",
            ));
        }

        if self.preferences.track_new_sources_key.trim().is_empty() {
            return Err(TallyError::config(
                "preferences.track_new_sources_key must not be empty",
            ));
        }

        if self.preferences.track_new_sources_key.starts_with(&self.preferences.key_prefix) {
            return Err(TallyError::config(format!(
                "preferences.track_new_sources_key {:?} collides with per-source keys",
                self.preferences.track_new_sources_key
            )));
        }

        Ok(())
    }
}

// Default values
fn default_preferences() -> PreferenceSettings {
    PreferenceSettings {
        key_prefix: default_key_prefix(),
        track_new_sources_key: default_track_new_sources_key(),
        track_new_sources_default: default_track_new_sources_default(),
    }
}

fn default_key_prefix() -> String {
    "player.".to_string()
}

fn default_track_new_sources_key() -> String {
    "scrobble_new_players".to_string()
}

fn default_track_new_sources_default() -> bool {
    true
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            preferences: default_preferences(),
        }
    }
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        default_preferences()
    }
}
