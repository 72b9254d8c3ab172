//! Configuration loading for bifrostd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.bifrost/config.toml` (user)
//! 3. `/etc/bifrost/config.toml` (system)
//!
//! The upstream API key is loaded separately with mandatory permission
//! checks:
//! 1. `~/.bifrost/secrets.toml` (user, must be 0600)
//! 2. `/etc/bifrost/secrets.toml` (system, must be 0600)
//! 3. the `BIFROST_API_KEY` environment variable

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{BifrostError, Result};

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub upstream: UpstreamSection,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub cache: CacheSection,
}

/// Listener addresses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address (default: 0.0.0.0:8080).
    #[serde(default = "default_http_address")]
    pub http_address: String,
    /// gRPC bind address (default: 0.0.0.0:50051).
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_address: default_http_address(),
            grpc_address: default_grpc_address(),
        }
    }
}

fn default_http_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_grpc_address() -> String {
    "0.0.0.0:50051".to_string()
}

/// Upstream provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSection {
    /// Provider base URL.
    pub endpoint: String,
    /// Deadline for one upstream call in seconds (default: 600).
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
    /// Outbound throttle sustained rate (default: 10/s).
    #[serde(default = "default_rate")]
    pub rate_per_second: u32,
    /// Outbound throttle burst capacity (default: 10).
    #[serde(default = "default_rate")]
    pub rate_burst: u32,
}

fn default_upstream_timeout() -> u64 {
    600
}

fn default_rate() -> u32 {
    10
}

/// Per-user rate limiting.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Requests each user may make per window (default: 100).
    #[serde(default = "default_user_requests")]
    pub user_requests: u32,
    /// Window length in seconds (default: 60).
    #[serde(default = "default_window")]
    pub window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            user_requests: default_user_requests(),
            window_secs: default_window(),
        }
    }
}

fn default_user_requests() -> u32 {
    100
}

fn default_window() -> u64 {
    60
}

/// Answer cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Cached-answer time-to-live in seconds (default: 24 hours).
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Maximum live entries in the in-process store (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    24 * 3600
}

fn default_max_entries() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            BifrostError::Configuration(format!("failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            BifrostError::Configuration(format!("failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(BifrostError::Configuration(format!(
                "config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".bifrost").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/bifrost/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(BifrostError::Configuration(
            "no config file found. Create ~/.bifrost/config.toml or /etc/bifrost/config.toml"
                .to_string(),
        ))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    pub fn user_window(&self) -> Duration {
        Duration::from_secs(self.limits.window_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

/// Secrets configuration (upstream API key).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub upstream: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (the key may come from
    /// the environment instead).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".bifrost").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/bifrost/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BifrostError::Configuration(format!("failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            BifrostError::Configuration(format!("failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            BifrostError::Configuration(format!("failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(BifrostError::Configuration(format!(
                "secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Get the upstream API key, falling back to `BIFROST_API_KEY`.
    pub fn upstream_api_key(&self) -> Option<String> {
        self.upstream
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var("BIFROST_API_KEY").ok())
    }
}
