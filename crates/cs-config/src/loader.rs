//! Configuration loader with file and environment variable support

use crate::{parse_duration_secs, AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "courtside.toml",
    "./config/config.toml",
    "/etc/courtside/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_env_overrides(&mut config)?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured config file does not exist");
        }

        if let Ok(path) = env::var("COURTSIDE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply environment variable overrides.
    ///
    /// `COURTSIDE_*` names win over the legacy unprefixed names.
    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        // HTTP
        if let Some(val) = first_env(&["COURTSIDE_HTTP_PORT", "PORT"]) {
            config.http.port = val
                .parse()
                .map_err(|_| ConfigError::EnvError(format!("invalid port: {}", val)))?;
        }
        if let Ok(val) = env::var("COURTSIDE_HTTP_HOST") {
            config.http.host = val;
        }
        if let Some(val) = first_env(&["COURTSIDE_CORS_ORIGINS", "CORS_ALLOWED_ORIGINS"]) {
            config.http.cors_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Database
        if let Some(val) = first_env(&["COURTSIDE_DATABASE_URL", "DATABASE_URL"]) {
            config.database.url = val;
        }
        if let Ok(val) = env::var("COURTSIDE_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                config.database.max_connections = max;
            }
        }

        // Auth
        if let Some(val) = first_env(&["COURTSIDE_JWT_SECRET", "JWT_SECRET"]) {
            config.auth.jwt_secret = val;
        }
        if let Ok(val) = env::var("COURTSIDE_JWT_ISSUER") {
            config.auth.issuer = val;
        }
        if let Some(val) = first_env(&["COURTSIDE_ACCESS_TOKEN_TTL", "JWT_EXPIRATION"]) {
            config.auth.access_token_ttl_secs = parse_duration_secs(&val)
                .ok_or_else(|| ConfigError::EnvError(format!("invalid access token TTL: {}", val)))?;
        }
        if let Some(val) = first_env(&["COURTSIDE_REFRESH_TOKEN_TTL", "JWT_REFRESH_EXPIRATION"]) {
            config.auth.refresh_token_ttl_secs = parse_duration_secs(&val)
                .ok_or_else(|| ConfigError::EnvError(format!("invalid refresh token TTL: {}", val)))?;
        }
        if let Ok(val) = env::var("COURTSIDE_PASSWORD_MIN_LENGTH") {
            if let Ok(len) = val.parse() {
                config.auth.password_min_length = len;
            }
        }
        if let Ok(val) = env::var("COURTSIDE_PRINCIPAL_LOOKUP_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.auth.principal_lookup_timeout_ms = ms;
            }
        }

        // Bootstrap admin
        if let Ok(val) = env::var("COURTSIDE_BOOTSTRAP_ADMIN_ENABLED") {
            config.bootstrap_admin.enabled = parse_bool(&val);
        }
        if let Ok(val) = env::var("COURTSIDE_BOOTSTRAP_ADMIN_EMAIL") {
            config.bootstrap_admin.email = val;
        }
        if let Ok(val) = env::var("COURTSIDE_BOOTSTRAP_ADMIN_PASSWORD") {
            config.bootstrap_admin.password = val;
        }

        // General
        if let Ok(val) = env::var("COURTSIDE_DEV_MODE") {
            config.dev_mode = parse_bool(&val);
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .find(|val| !val.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
