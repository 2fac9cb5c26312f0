//! Application configuration.
//!
//! Environment variables with sensible defaults, grouped per concern.
//! The binary's CLI flags (see `main.rs`) override the environment.

use snafu::Snafu;

/// Errors from loading configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// An environment variable held a value that does not parse.
    #[snafu(display("invalid value for {key}: {value:?}: {reason}"))]
    InvalidValue {
        /// The environment variable.
        key: String,
        /// The offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,
    /// Bind address.
    pub bind_addr: String,
}

impl ServerConfig {
    /// Load from `NEXUS_HTTP_PORT` / `NEXUS_BIND_ADDR`.
    pub fn load() -> Result<Self, ConfigError> {
        let raw_port = std::env::var("NEXUS_HTTP_PORT").unwrap_or_else(|_| "8787".to_string());
        let port = raw_port.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
            key: "NEXUS_HTTP_PORT".to_string(),
            value: raw_port.clone(),
            reason: format!("must be a port number: {e}"),
        })?;

        Ok(Self {
            port,
            bind_addr: std::env::var("NEXUS_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8787,
            bind_addr: "0.0.0.0".to_string(),
        }
    }
}

/// Which storage back-end to run behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local map, lost on restart.
    Memory,
    /// Files under a root directory.
    Fs {
        /// Root directory for the store.
        path: String,
    },
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected back-end.
    pub backend: StorageBackend,
}

impl StorageConfig {
    /// Load from `NEXUS_STORAGE` (`memory` | `fs`) and
    /// `NEXUS_STORAGE_PATH`.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = std::env::var("NEXUS_STORAGE").unwrap_or_else(|_| "memory".to_string());
        let backend = match raw.as_str() {
            "memory" => StorageBackend::Memory,
            "fs" => StorageBackend::Fs {
                path: std::env::var("NEXUS_STORAGE_PATH").unwrap_or_else(|_| "./data/nexus".to_string()),
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "NEXUS_STORAGE".to_string(),
                    value: other.to_string(),
                    reason: "must be one of: memory, fs".to_string(),
                });
            }
        };
        Ok(Self { backend })
    }
}

/// Upstream access configuration.
#[derive(Debug, Clone, Default)]
pub struct UpstreamConfig {
    /// Optional bearer token for the GitHub API.
    pub github_token: Option<String>,
}

impl UpstreamConfig {
    /// Load from `GITHUB_TOKEN`.
    pub fn load() -> Self {
        Self {
            github_token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
        }
    }
}

/// WinGet index configuration.
#[derive(Debug, Clone)]
pub struct WingetConfig {
    /// Tracked repository, `owner/name`.
    pub repo: String,
    /// Tracked branch.
    pub branch: String,
}

impl WingetConfig {
    /// Load from `NEXUS_WINGET_REPO` / `NEXUS_WINGET_BRANCH`.
    pub fn load() -> Self {
        Self {
            repo: std::env::var("NEXUS_WINGET_REPO").unwrap_or_else(|_| "microsoft/winget-pkgs".to_string()),
            branch: std::env::var("NEXUS_WINGET_BRANCH").unwrap_or_else(|_| "master".to_string()),
        }
    }
}

impl Default for WingetConfig {
    fn default() -> Self {
        Self {
            repo: "microsoft/winget-pkgs".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// The complete application configuration.
#[derive(Debug, Clone)]
pub struct NexusConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Storage back-end selection.
    pub storage: StorageConfig,
    /// Upstream credentials.
    pub upstream: UpstreamConfig,
    /// WinGet index settings.
    pub winget: WingetConfig,
}

impl NexusConfig {
    /// Load everything from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::load()?,
            storage: StorageConfig::load()?,
            upstream: UpstreamConfig::load(),
            winget: WingetConfig::load(),
        })
    }
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            upstream: UpstreamConfig::default(),
            winget: WingetConfig::default(),
        }
    }
}
