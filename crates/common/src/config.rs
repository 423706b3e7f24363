//! Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Community engine configuration.
    #[serde(default)]
    pub community: CommunityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis channels.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Community engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CommunityConfig {
    /// Deadline for a single mutating engine call, in seconds.
    #[serde(default = "default_op_deadline_secs")]
    pub op_deadline_secs: u64,
    /// Default feed page size.
    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: u64,
    /// Path of the per-device offline write-intent journal.
    #[serde(default = "default_offline_journal")]
    pub offline_journal: String,
}

impl CommunityConfig {
    /// The per-call deadline as a [`Duration`].
    #[must_use]
    pub const fn op_deadline(&self) -> Duration {
        Duration::from_secs(self.op_deadline_secs)
    }
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            op_deadline_secs: default_op_deadline_secs(),
            feed_page_size: default_feed_page_size(),
            offline_journal: default_offline_journal(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "nagare".to_string()
}

const fn default_op_deadline_secs() -> u64 {
    10
}

const fn default_feed_page_size() -> u64 {
    20
}

fn default_offline_journal() -> String {
    "data/offline-journal.jsonl".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `NAGARE_ENV`)
    /// 3. Environment variables with `NAGARE_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("NAGARE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NAGARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("NAGARE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_community_defaults() {
        let community = CommunityConfig::default();
        assert_eq!(community.op_deadline(), Duration::from_secs(10));
        assert_eq!(community.feed_page_size, 20);
        assert!(community.offline_journal.ends_with(".jsonl"));
    }
}
