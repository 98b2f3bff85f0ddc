/// Configuration management for the admin tool
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: SQLite connection string (default: sqlite://handyhub.db)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `DATABASE_MIN_CONNECTIONS`: Idle connections kept open (default: 1)
/// - `DATABASE_BUSY_TIMEOUT_MS`: Wait on a locked database (default: 5000)
/// - `LOG_FORMAT`: `text` or `json` (default: text)
/// - `RUST_LOG`: Log filter (default: info)
///
/// # Example
///
/// ```no_run
/// use handyhub_admin::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Using database {}", config.database.url);
/// # Ok(())
/// # }
/// ```

use handyhub_shared::db::pool::{self, DEFAULT_DATABASE_URL};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Complete tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of idle connections
    pub min_connections: u32,

    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Pool configuration for these settings
    ///
    /// In-memory URLs get the single-connection pool they need regardless of the
    /// configured sizes.
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        let base = pool::DatabaseConfig {
            url: self.url.clone(),
            ..Default::default()
        };

        if base.is_in_memory() {
            return pool::DatabaseConfig {
                url: self.url.clone(),
                ..pool::DatabaseConfig::in_memory()
            };
        }

        pool::DatabaseConfig {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            busy_timeout_ms: self.busy_timeout_ms,
            ..base
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,

    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?;
        let min_connections = parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 1u32)?;
        let busy_timeout_ms = parse_or(&lookup, "DATABASE_BUSY_TIMEOUT_MS", 5_000u64)?;

        if max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if min_connections > max_connections {
            anyhow::bail!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                min_connections,
                max_connections
            );
        }

        let format = parse_or(&lookup, "LOG_FORMAT", LogFormat::default())?;

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections,
                min_connections,
                busy_timeout_ms,
            },
            logging: LoggingConfig { format },
        })
    }

    /// Replaces the database URL (command-line override)
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.database.url = url;
        }
        self
    }
}
