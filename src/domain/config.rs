use std::path::Path;

use serde::{Deserialize, Serialize};

use super::UpdatePolicy;

/// Configuration for a backlog.
///
/// Stored as `.backlog/config.toml` in the backlog root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether to skip request files that cannot be parsed instead of failing
    /// the whole listing.
    pub allow_unrecognised: bool,

    /// Whether assignment changes drive the status.
    ///
    /// See [`UpdatePolicy::infer_status_from_assignee`].
    pub infer_status_from_assignee: bool,

    /// Minimum length of a new password.
    min_password_length: usize,

    /// How long a login stays valid, in hours.
    session_ttl_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_unrecognised: false,
            infer_status_from_assignee: true,
            min_password_length: default_min_password_length(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the minimum length of a new password.
    #[must_use]
    pub const fn min_password_length(&self) -> usize {
        self.min_password_length
    }

    /// Sets the minimum length of a new password.
    pub fn set_min_password_length(&mut self, length: u32) {
        self.min_password_length = length as usize;
    }

    /// Returns how long a login stays valid.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.session_ttl_hours))
    }

    /// Sets how long a login stays valid, in hours.
    pub const fn set_session_ttl_hours(&mut self, hours: u32) {
        self.session_ttl_hours = hours;
    }

    /// The update rules this configuration selects.
    #[must_use]
    pub const fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy {
            infer_status_from_assignee: self.infer_status_from_assignee,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_min_password_length() -> usize {
    6
}

const fn default_session_ttl_hours() -> u32 {
    12
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        allow_unrecognised: bool,

        #[serde(default = "default_true")]
        infer_status_from_assignee: bool,

        #[serde(default = "default_min_password_length")]
        min_password_length: usize,

        #[serde(default = "default_session_ttl_hours")]
        session_ttl_hours: u32,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                allow_unrecognised,
                infer_status_from_assignee,
                min_password_length,
                session_ttl_hours,
            } => Self {
                allow_unrecognised,
                infer_status_from_assignee,
                min_password_length,
                session_ttl_hours,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            allow_unrecognised: config.allow_unrecognised,
            infer_status_from_assignee: config.infer_status_from_assignee,
            min_password_length: config.min_password_length,
            session_ttl_hours: config.session_ttl_hours,
        }
    }
}
