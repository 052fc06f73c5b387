//! Configuration types for qb-migrate.
//!
//! The configuration lives in `config.json` next to the working directory.
//!
//! # Priority (highest to lowest)
//!
//! 1. Environment variables (`QBM_*`, `__` separates nested keys,
//!    e.g. `QBM_TARGET__TOKEN`)
//! 2. Configuration file (`config.json`)
//! 3. Default values

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "QBM_";

/// Main migration configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// App the configuration is copied from.
    #[serde(default)]
    pub source: AppConfig,
    /// App the configuration is copied to.
    #[serde(default)]
    pub target: AppConfig,
    /// Code page IDs to migrate.
    #[serde(default)]
    pub pages: Vec<u64>,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Credentials of one app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// App (database) ID.
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub id: String,
    /// User token.
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub token: String,
    /// Realm hostname, e.g. `acme.quickbase.com`.
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub realm: String,
}

/// Environment values are parsed into typed values, so an all-digit ID
/// arrives as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

fn string_or_scalar<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Str(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

/// Migration options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Base URL of the REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base URL of the legacy XML API (default: `https://<realm>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_url: Option<String>,
    /// Max in-flight requests per stage (0 = unbounded).
    #[serde(default)]
    pub concurrency: usize,
    /// Retries for transient errors (0 = fail on first error).
    #[serde(default)]
    pub max_retries: u32,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Dry run mode (don't write to the target app).
    #[serde(default)]
    pub dry_run: bool,
    /// `maxLength` applied by field-length normalization.
    #[serde(default)]
    pub field_length: FieldLengthOptions,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            legacy_url: None,
            concurrency: 0,
            max_retries: 0,
            timeout_secs: default_timeout_secs(),
            dry_run: false,
            field_length: FieldLengthOptions::default(),
        }
    }
}

/// Max lengths per text field type. `0` lets the platform use its maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLengthOptions {
    /// `text` fields.
    #[serde(default)]
    pub text: u32,
    /// `text-multi-line` fields.
    #[serde(default)]
    pub multi_line: u32,
}

impl FieldLengthOptions {
    /// Returns the configured length for a field type, if the type is resizable.
    #[must_use]
    pub fn for_field_type(&self, field_type: &str) -> Option<u32> {
        match field_type {
            "text" => Some(self.text),
            "text-multi-line" => Some(self.multi_line),
            _ => None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.quickbase.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Loads configuration from a JSON file, layered with `QBM_*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "{} not found, run `qb-migrate create-config` first",
                path.display()
            )));
        }

        let config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Parses configuration from a JSON string (no environment layering).
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_json(json: &str) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Json::string(json))
            .extract()?;
        Ok(config)
    }

    /// Writes an empty configuration to `path` unless a file already exists.
    ///
    /// Returns `true` when a new file was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn create_default(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        let content = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(path, content)?;
        Ok(true)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first empty credential.
    pub fn validate(&self) -> Result<()> {
        for (side, app) in [("source", &self.source), ("target", &self.target)] {
            for (key, value) in [("id", &app.id), ("token", &app.token), ("realm", &app.realm)] {
                if value.trim().is_empty() {
                    return Err(Error::Config(format!("{side}.{key} cannot be empty")));
                }
            }
        }
        if self.options.api_url.trim().is_empty() {
            return Err(Error::Config("options.api_url cannot be empty".to_string()));
        }
        Ok(())
    }
}
