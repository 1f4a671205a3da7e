use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

// =============================================================================
// Cache constants
// =============================================================================

/// Key holding the serialized release snapshot
pub const CACHE_KEY: &str = "releases";

/// Snapshot time-to-live in seconds (24 hours)
pub const CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Key holding the forced-refresh credential
pub const REFRESH_SECRET_KEY: &str = "refresh_secret";

// =============================================================================
// Upstream constants
// =============================================================================

/// Page size for the release list; older releases beyond one page are not served
pub const RELEASES_PER_PAGE: u32 = 100;

/// Timeout for each upstream request in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// Upper bound on concurrent manifest lookups during one normalization pass
pub const MAX_CONCURRENT_LOOKUPS: usize = 8;

pub const DEFAULT_ARTIFACT_NAME: &str = "Billing-Setup.exe";
pub const DEFAULT_RUNTIME_DEPENDENCY: &str = "electron";
pub const DEFAULT_REPOSITORY: &str = "acme/billing-desktop";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Gateway configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
}

/// Upstream release feed configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub api_url: String,
    /// `owner/repo`
    pub repository: String,
    /// Bearer credential for the upstream API; usually supplied via `GITHUB_TOKEN`
    pub token: String,
    /// Exact asset name a release must carry to be served
    pub artifact_name: String,
    /// Manifest dependency whose constraint is the minimum runtime version
    pub runtime_dependency: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: crate::release::sources::github::DEFAULT_BASE_URL.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            token: String::new(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            runtime_dependency: DEFAULT_RUNTIME_DEPENDENCY.to_string(),
        }
    }
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub key: String,
    /// Snapshot time-to-live in seconds
    pub ttl: u64,
    pub secret_key: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key: CACHE_KEY.to_string(),
            ttl: CACHE_TTL_SECS,
            secret_key: REFRESH_SECRET_KEY.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load `config.json` from the data directory and apply env overrides
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self::load_from(&config_path())?.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GITHUB_TOKEN`, `RELEASE_GATEWAY_REPOSITORY` and `RELEASE_GATEWAY_API_URL`
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|value| !value.is_empty());

        if let Some(token) = non_empty("GITHUB_TOKEN") {
            self.upstream.token = token;
        }
        if let Some(repository) = non_empty("RELEASE_GATEWAY_REPOSITORY") {
            self.upstream.repository = repository;
        }
        if let Some(api_url) = non_empty("RELEASE_GATEWAY_API_URL") {
            self.upstream.api_url = api_url;
        }
        self
    }
}

/// Returns the path to the data directory for release-gateway.
/// Uses $XDG_DATA_HOME/release-gateway if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/release-gateway,
/// or ./release-gateway if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the key/value store database.
pub fn db_path() -> PathBuf {
    data_dir().join("gateway.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("release-gateway.log")
}

/// Returns the path to the optional config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("release-gateway")
}
