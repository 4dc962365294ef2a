//! Configuration management
//!
//! Configuration is loaded once at startup from:
//! - an optional `config.yml` file
//! - environment variables (override file settings, `.env` is honoured)
//!
//! Missing optional values are filled with defaults. The resulting `Config`
//! is immutable and handed to the components that need it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Deployment environment name (`development`, `production`, ...)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            environment: default_environment(),
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Directory of `NNNNN_name.sql` migrations replacing the embedded set
    #[serde(default)]
    pub migrations_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            migrations_dir: None,
        }
    }
}

fn default_database_url() -> String {
    "data/blog.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Token signing and lifetime configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access and refresh tokens
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in hours
    #[serde(default = "default_access_token_ttl_hours")]
    pub access_token_ttl_hours: i64,
    /// Refresh token lifetime in hours
    #[serde(default = "default_refresh_token_ttl_hours")]
    pub refresh_token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_hours: default_access_token_ttl_hours(),
            refresh_token_ttl_hours: default_refresh_token_ttl_hours(),
        }
    }
}

// Keeps the secret out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_hours", &self.access_token_ttl_hours)
            .field("refresh_token_ttl_hours", &self.refresh_token_ttl_hours)
            .finish()
    }
}

/// Longest accepted token lifetime (ten years)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

fn default_access_token_ttl_hours() -> i64 {
    24
}

fn default_refresh_token_ttl_hours() -> i64 {
    168
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - HOST, PORT
    /// - DATABASE_DRIVER, DATABASE_URL, MIGRATIONS_DIR
    /// - JWT_SECRET, ACCESS_TOKEN_TTL_HOURS, REFRESH_TOKEN_TTL_HOURS
    /// - ENVIRONMENT
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(dir) = std::env::var("MIGRATIONS_DIR") {
            if !dir.trim().is_empty() {
                self.database.migrations_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(ttl) = std::env::var("ACCESS_TOKEN_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.access_token_ttl_hours = ttl;
            }
        }
        if let Ok(ttl) = std::env::var("REFRESH_TOKEN_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.refresh_token_ttl_hours = ttl;
            }
        }

        if let Ok(environment) = std::env::var("ENVIRONMENT") {
            if !environment.trim().is_empty() {
                self.environment = environment;
            }
        }
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "JWT secret must be set (auth.jwt_secret or JWT_SECRET)".to_string(),
            ));
        }
        let ttls = [self.auth.access_token_ttl_hours, self.auth.refresh_token_ttl_hours];
        if ttls.iter().any(|ttl| !(1..=MAX_TOKEN_TTL_HOURS).contains(ttl)) {
            return Err(ConfigError::ValidationError(format!(
                "Token lifetimes must be between 1 and {} hours",
                MAX_TOKEN_TTL_HOURS
            )));
        }
        Ok(())
    }

    /// Whether the process runs in the production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Default tracing filter for this environment, used when RUST_LOG is unset
    pub fn default_log_filter(&self) -> &'static str {
        if self.is_production() {
            "travel_blog=info,tower_http=info"
        } else {
            "travel_blog=debug,tower_http=debug"
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            "[a-z0-9.]{1,20}",
            1u16..=65535,
            prop_oneof![Just(DatabaseDriver::Sqlite), Just(DatabaseDriver::Mysql)],
            "[a-z/]{1,20}\\.db",
            "[A-Za-z0-9]{8,32}",
            1i64..1000,
            1i64..10000,
            prop_oneof![Just("development".to_string()), Just("production".to_string())],
        )
            .prop_map(
                |(host, port, driver, url, secret, access, refresh, environment)| Config {
                    server: ServerConfig { host, port },
                    database: DatabaseConfig {
                        driver,
                        url,
                        migrations_dir: None,
                    },
                    auth: AuthConfig {
                        jwt_secret: secret,
                        access_token_ttl_hours: access,
                        refresh_token_ttl_hours: refresh,
                    },
                    environment,
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        #[test]
        fn config_survives_yaml_roundtrip(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.host, config.server.host);
            prop_assert_eq!(parsed.server.port, config.server.port);
            prop_assert_eq!(parsed.database.driver, config.database.driver);
            prop_assert_eq!(parsed.database.url, config.database.url);
            prop_assert_eq!(parsed.auth.jwt_secret, config.auth.jwt_secret);
            prop_assert_eq!(parsed.auth.refresh_token_ttl_hours, config.auth.refresh_token_ttl_hours);
            prop_assert_eq!(parsed.environment, config.environment);
        }

        #[test]
        fn port_override_wins_over_file(file_port in 1u16..=65535, env_port in 1u16..=65535) {
            let _guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

            let mut file = tempfile::NamedTempFile::new().unwrap();
            std::io::Write::write_all(
                &mut file,
                format!("server:\n  port: {}\nauth:\n  jwt_secret: \"x\"\n", file_port).as_bytes(),
            ).unwrap();

            std::env::set_var("PORT", env_port.to_string());
            let config = Config::load_with_env(file.path());
            std::env::remove_var("PORT");

            prop_assert_eq!(config.unwrap().server.port, env_port);
        }
    }
}
