//! Configuration management for session-gate
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Prefix of every environment variable read by [`Config::from_env`]
pub const ENV_PREFIX: &str = "SESSION_GATE_";

/// Shortest accepted signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted lifetime, margin or window, in seconds (one leap year)
pub const MAX_DURATION_SECS: u64 = 366 * 24 * 3600;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Token and session configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Session store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Identity database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix SESSION_GATE_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(host) = env_var("SERVER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env("SERVER_PORT")? {
            config.server.port = port;
        }

        if let Some(secret) = env_var("AUTH_JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Some(issuer) = env_var("AUTH_ISSUER") {
            config.auth.issuer = issuer;
        }
        if let Some(secs) = parse_env("AUTH_ACCESS_TOKEN_TTL_SECS")? {
            config.auth.access_token_ttl_secs = secs;
        }
        if let Some(secs) = parse_env("AUTH_REFRESH_TOKEN_TTL_SECS")? {
            config.auth.refresh_token_ttl_secs = secs;
        }
        if let Some(secs) = parse_env("AUTH_LEEWAY_SECS")? {
            config.auth.leeway_secs = secs;
        }
        if let Some(secure) = parse_env("AUTH_COOKIE_SECURE")? {
            config.auth.cookie_secure = secure;
        }

        if let Some(backend) = parse_env("STORE_BACKEND")? {
            config.store.backend = backend;
        }
        if let Some(url) = env_var("STORE_REDIS_URL") {
            config.store.redis_url = url;
        }
        if let Some(prefix) = env_var("STORE_KEY_PREFIX") {
            config.store.key_prefix = prefix;
        }
        if let Some(secs) = parse_env("STORE_SWEEP_INTERVAL_SECS")? {
            config.store.sweep_interval_secs = secs;
        }

        if let Some(path) = env_var("DATABASE_PATH") {
            config.database.path = path;
        }

        if let Some(level) = env_var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = env_var("LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;

        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_empty() {
            return Err(ConfigError::MissingRequired("store.redis_url".to_string()));
        }
        if self.store.backend == StoreBackend::Memory && self.store.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "store.sweep_interval_secs must be positive".to_string(),
            ));
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ConfigError::InvalidValue(format!(
                "logging.format must be json or pretty, got {}",
                other
            ))),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
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

/// Token and session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// HS256 signing secret
    #[serde(default)]
    pub jwt_secret: String,

    /// `iss` claim written and required on every token
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,

    /// Extra registry TTL on top of the access token lifetime
    #[serde(default = "default_access_margin")]
    pub access_session_margin_secs: u64,

    /// Extra registry TTL on top of the refresh token lifetime
    #[serde(default = "default_refresh_margin")]
    pub refresh_session_margin_secs: u64,

    /// Revocation window for a logout token whose expiry cannot be read
    #[serde(default = "default_logout_fallback")]
    pub logout_fallback_secs: u64,

    /// Clock skew tolerated when checking `exp` and `nbf`
    #[serde(default)]
    pub leeway_secs: u64,

    /// Mark token cookies `Secure`
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: default_issuer(),
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            access_session_margin_secs: default_access_margin(),
            refresh_session_margin_secs: default_refresh_margin(),
            logout_fallback_secs: default_logout_fallback(),
            leeway_secs: 0,
            cookie_secure: false,
        }
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if self.issuer.is_empty() {
            return Err(ConfigError::MissingRequired("auth.issuer".to_string()));
        }
        if self.access_token_ttl_secs == 0 || self.refresh_token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.logout_fallback_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.logout_fallback_secs must be positive".to_string(),
            ));
        }

        let bounded = [
            ("auth.access_token_ttl_secs", self.access_token_ttl_secs),
            ("auth.refresh_token_ttl_secs", self.refresh_token_ttl_secs),
            ("auth.access_session_margin_secs", self.access_session_margin_secs),
            ("auth.refresh_session_margin_secs", self.refresh_session_margin_secs),
            ("auth.logout_fallback_secs", self.logout_fallback_secs),
            ("auth.leeway_secs", self.leeway_secs),
        ];
        for (name, secs) in bounded {
            if secs > MAX_DURATION_SECS {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_DURATION_SECS, secs
                )));
            }
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "web-security-app".to_string()
}

fn default_access_ttl() -> u64 {
    15 * 60
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_access_margin() -> u64 {
    5 * 60
}

fn default_refresh_margin() -> u64 {
    3600
}

fn default_logout_fallback() -> u64 {
    15 * 60
}

/// Session store backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Which backend holds registry and revocation entries
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix prepended to every key
    #[serde(default)]
    pub key_prefix: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// How often the memory backend drops expired entries, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_url: default_redis_url(),
            key_prefix: String::new(),
            connection_timeout_secs: default_connection_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Redis
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_sweep_interval() -> u64 {
    60
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "/data/db/session-gate.db".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    match env_var(name) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ConfigError::Parse(format!("Invalid value for {}{}: {}", ENV_PREFIX, name, raw))
        }),
        None => Ok(None),
    }
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax; unknown variables are left as written
fn expand_env_vars(input: &str) -> String {
    let Ok(re) = regex_lite::Regex::new(r"\$\{([^}]+)\}") else {
        return input.to_string();
    };

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
