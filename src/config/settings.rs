//! Application settings loading from config.toml
//!
//! Settings are read from a TOML file (default `./config.toml`, overridable with the
//! `FINANCE_TRACKER_CONFIG` environment variable). Every section is optional and falls
//! back to defaults; `DATABASE_URL` and `BIND_ADDRESS` override the file when set.
//! The `[[buckets]]` list is the bucket reference data seeded on startup.

use crate::{
    entities::BucketType,
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_DATABASE_URL: &str = "sqlite://data/finance_tracker.sqlite?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
/// bcrypt accepts work factors in this range
const PASSWORD_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Connection settings for the relational store
    #[serde(default)]
    pub database: DatabaseSettings,
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Password hashing settings
    #[serde(default)]
    pub auth: AuthSettings,
    /// Bucket reference data to seed
    #[serde(default)]
    pub buckets: Vec<BucketConfig>,
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Any SeaORM connection URL (`postgres://…`, `sqlite://…`)
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Upper bound of the connection pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// `host:port` the API listens on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// `[auth]` section
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// bcrypt work factor used when registering users
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            password_cost: default_password_cost(),
        }
    }
}

/// Configuration for a single seeded bucket
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BucketConfig {
    /// Name of the bucket
    pub name: String,
    /// `"Income"` or `"Spendable"`
    pub bucket_type: BucketType,
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    1
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

const fn default_password_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Parses settings from a TOML string.
///
/// # Errors
/// Returns `Error::Config` if the TOML syntax is invalid or a field has the wrong type.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads the application configuration the binary runs with.
///
/// A missing file is not an error: defaults are used and a warning is logged.
/// Environment overrides are applied last.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("FINANCE_TRACKER_CONFIG")
        .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        let config = load_config(&path)?;
        info!("Loaded configuration from {path}");
        config
    } else {
        warn!("Config file {path} not found; using defaults");
        AppConfig::default()
    };

    config.apply_env_overrides();
    Ok(config)
}

impl AppConfig {
    /// Replaces file values with `DATABASE_URL` / `BIND_ADDRESS` when those are set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(Error::Config {
                message: "database.max_connections must be at least 1".to_string(),
            });
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(Error::Config {
                message: "database.min_connections cannot exceed max_connections".to_string(),
            });
        }
        if !PASSWORD_COST_RANGE.contains(&self.auth.password_cost) {
            return Err(Error::Config {
                message: format!(
                    "auth.password_cost must be between {} and {}",
                    PASSWORD_COST_RANGE.start(),
                    PASSWORD_COST_RANGE.end()
                ),
            });
        }
        if let Some(bucket) = self.buckets.iter().find(|b| b.name.trim().is_empty()) {
            return Err(Error::Config {
                message: format!("bucket name cannot be empty ({:?})", bucket.bucket_type),
            });
        }
        Ok(())
    }
}
