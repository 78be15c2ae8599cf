//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::{fmt, net::SocketAddr, str::FromStr};
use tournament_hub::{auth::verifier::MIN_SECRET_LEN, db::DatabaseConfig, events::DEFAULT_CHANNEL_CAPACITY};

/// Default server bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Where competitions, teams and matches are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local maps, lost on restart
    #[default]
    Memory,
    /// PostgreSQL via `DATABASE_URL`
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(format!("unknown storage backend '{other}' (expected memory or postgres)")),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Postgres => f.write_str("postgres"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub storage: StorageBackend,
    /// Database configuration (Postgres backend only)
    pub database: Option<DatabaseConfig>,
    /// Security configuration
    pub security: SecurityConfig,
    /// Capacity of the change event channel
    pub event_channel_capacity: usize,
    /// Prometheus listener address, if metrics are exported
    pub metrics_bind: Option<SocketAddr>,
    /// Fixed seed for bracket shuffling
    pub bracket_seed: Option<u64>,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Lifetime of issued access tokens
    pub access_token_minutes: i64,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_minutes", &self.access_token_minutes)
            .finish()
    }
}

/// Values given on the command line, taking priority over the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub storage: Option<StorageBackend>,
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values parsed from CLI args
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_env_required_or("SERVER_BIND", DEFAULT_BIND)?,
        };

        let storage = match overrides.storage {
            Some(storage) => storage,
            None => match std::env::var("STORAGE_BACKEND") {
                Ok(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                    var: "STORAGE_BACKEND".to_string(),
                    reason,
                })?,
                Err(_) => StorageBackend::default(),
            },
        };

        let database_url = overrides
            .database_url
            .or_else(|| std::env::var("DATABASE_URL").ok());

        let database = match (storage, database_url) {
            (StorageBackend::Memory, _) => None,
            (StorageBackend::Postgres, None) => {
                return Err(ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set DATABASE_URL or pass --db-url when STORAGE_BACKEND=postgres".to_string(),
                });
            }
            (StorageBackend::Postgres, Some(database_url)) => {
                let defaults = DatabaseConfig::development();
                Some(DatabaseConfig {
                    database_url,
                    max_connections: parse_env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
                    min_connections: parse_env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
                    connection_timeout_secs: parse_env_or(
                        "DB_CONNECTION_TIMEOUT_SECS",
                        defaults.connection_timeout_secs,
                    ),
                    idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
                    max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
                })
            }
        };

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let security = SecurityConfig {
            jwt_secret,
            access_token_minutes: parse_env_or("ACCESS_TOKEN_MINUTES", 60),
        };

        let metrics_bind = match overrides.metrics_bind {
            Some(addr) => Some(addr),
            None => match std::env::var("METRICS_BIND") {
                Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{value}' is not a socket address"),
                })?),
                Err(_) => None,
            },
        };

        let bracket_seed = match std::env::var("BRACKET_SEED") {
            Ok(value) => Some(value.parse().map_err(|_| ConfigError::Invalid {
                var: "BRACKET_SEED".to_string(),
                reason: format!("'{value}' is not an unsigned 64-bit integer"),
            })?),
            Err(_) => None,
        };

        Ok(ServerConfig {
            bind,
            storage,
            database,
            security,
            event_channel_capacity: parse_env_or("EVENT_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY),
            metrics_bind,
            bracket_seed,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_SECRET_LEN} characters (128-bit security)"),
            });
        }

        if self.security.access_token_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_MINUTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "EVENT_CHANNEL_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(database) = &self.database {
            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from the server bind address".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse an environment variable, falling back to a literal default; a set
/// but unparsable value is an error
fn parse_env_required_or(key: &str, default: &str) -> Result<SocketAddr, ConfigError> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("'{value}' is not a socket address"),
    })
}
