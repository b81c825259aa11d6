//! Configuration System
//!
//! Handles loading connection and logging settings from TOML files and
//! environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub puppetdb: PuppetDbConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP method used to send queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
}

impl std::str::FromStr for RequestMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            other => Err(ConfigError::Invalid(format!(
                "request method must be get or post, got {other}"
            ))),
        }
    }
}

/// Connection settings for a PuppetDB server
#[derive(Debug, Clone, Deserialize)]
pub struct PuppetDbConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `http` or `https`; inferred when unset
    pub protocol: Option<String>,

    /// Prefix PuppetDB is served under, e.g. `/puppetdb`
    pub url_path: Option<String>,

    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Sent as `X-Authentication`
    pub token: Option<String>,

    pub username: Option<String>,

    pub password: Option<String>,

    #[serde(default)]
    pub request_method: RequestMethod,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ssl_verify() -> bool {
    true
}

fn default_timeout() -> u64 {
    10
}

impl Default for PuppetDbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: None,
            url_path: None,
            ssl_verify: default_ssl_verify(),
            timeout_secs: default_timeout(),
            token: None,
            username: None,
            password: None,
            request_method: RequestMethod::default(),
        }
    }
}

impl PuppetDbConfig {
    /// Effective protocol: the explicit one, else `https` with a token, else `http`
    pub fn protocol(&self) -> Result<&'static str, ConfigError> {
        match self.protocol.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("http") => Ok("http"),
            Some("https") => Ok("https"),
            Some(other) => Err(ConfigError::Invalid(format!(
                "protocol must be http or https, got {other}"
            ))),
            None if self.token.is_some() => Ok("https"),
            None => Ok("http"),
        }
    }

    /// URL path prefix with a leading `/` and no trailing `/`, or empty
    pub fn normalized_url_path(&self) -> String {
        let path = self.url_path.as_deref().unwrap_or("").trim_end_matches('/');
        if path.is_empty() {
            String::new()
        } else if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    /// `proto://host:port{url_path}`
    pub fn base_url(&self) -> Result<String, ConfigError> {
        Ok(format!(
            "{}://{}:{}{}",
            self.protocol()?,
            self.host,
            self.port,
            self.normalized_url_path()
        ))
    }

    /// Basic auth credentials, only when both parts are set
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.puppetdb.protocol()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("puppetdb-query").join("config.toml")),
            Some(PathBuf::from("/etc/puppetdb-query/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!(path = ?path, "Loaded config");
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "Failed to load config");
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `PUPPETDB_*` overrides from any key/value source
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.puppetdb;

        if let Some(host) = lookup("PUPPETDB_HOST") {
            db.host = host;
        }
        if let Some(port) = lookup("PUPPETDB_PORT") {
            db.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PUPPETDB_PORT is not a port: {port}")))?;
        }
        if let Some(protocol) = lookup("PUPPETDB_PROTOCOL") {
            db.protocol = Some(protocol);
        }
        if let Some(url_path) = lookup("PUPPETDB_URL_PATH") {
            db.url_path = Some(url_path);
        }
        if let Some(token) = lookup("PUPPETDB_TOKEN") {
            db.token = Some(token);
        }
        if let Some(timeout) = lookup("PUPPETDB_TIMEOUT") {
            db.timeout_secs = timeout.parse().map_err(|_| {
                ConfigError::Invalid(format!("PUPPETDB_TIMEOUT is not a number of seconds: {timeout}"))
            })?;
        }
        if let Some(method) = lookup("PUPPETDB_REQUEST_METHOD") {
            db.request_method = method.parse()?;
        }

        if let Some(level) = lookup("PUPPETDB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PUPPETDB_LOG_FORMAT") {
            self.logging.format = format;
        }

        self.puppetdb.protocol()?;
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# PuppetDB query client configuration
#
# Environment variables override these settings:
# - PUPPETDB_HOST
# - PUPPETDB_PORT
# - PUPPETDB_PROTOCOL
# - PUPPETDB_URL_PATH
# - PUPPETDB_TOKEN
# - PUPPETDB_TIMEOUT
# - PUPPETDB_REQUEST_METHOD
# - PUPPETDB_LOG_LEVEL
# - PUPPETDB_LOG_FORMAT

[puppetdb]
host = "localhost"
port = 8080

# http or https; defaults to https when a token is set
# protocol = "https"

# Prefix when PuppetDB is served behind a proxy
# url_path = "/puppetdb"

# Verify the server certificate
ssl_verify = true

# Request timeout (seconds)
timeout_secs = 10

# RBAC token, sent as X-Authentication
# token = ""

# Basic auth
# username = ""
# password = ""

# get or post
request_method = "get"

[logging]
# trace, debug, info, warn, error
level = "info"

# pretty or json
format = "pretty"
"#
    .to_string()
}
