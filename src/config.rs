//! Discovery configuration.
//!
//! [`DiscoveryConfig`] is a builder-style struct with sensible defaults.
//! It can also be loaded from TOML with the following resolution order:
//! 1. `--config <path>` style explicit path (must exist)
//! 2. `~/.hstc/config.toml` (user)
//! 3. built-in defaults
//!
//! ```toml
//! [discovery]
//! regions = ["us-east-1", "us-west-2"]
//! preferred_regions = ["us-west-2"]
//! cache_ttl_secs = 604800
//! region_timeout_secs = 5
//! include_profiles = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{DiscoveryError, Result};

/// Seconds after which a populated model cache is considered stale (7 days).
pub const CACHE_TTL_SECONDS: u64 = 604_800;

/// Default per-region timeout for catalog listing calls.
pub const DEFAULT_REGION_TIMEOUT: Duration = Duration::from_secs(5);

/// Regions scanned when no explicit list is given.
pub const DEFAULT_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-2",
    "eu-central-1",
    "eu-west-1",
    "eu-west-3",
    "ap-northeast-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
];

/// Models the documentation pipeline invokes; checked for access problems.
pub const PROJECT_MODEL_IDS: &[&str] = &[
    "anthropic.claude-3-5-sonnet-20240620-v1:0",
    "anthropic.claude-3-5-sonnet-20241022-v2:0",
    "anthropic.claude-3-7-sonnet-20250219-v1:0",
    "anthropic.claude-3-5-haiku-20241022-v1:0",
    "amazon.nova-micro-v1:0",
    "amazon.nova-lite-v1:0",
    "amazon.nova-pro-v1:0",
];

/// Configuration for model discovery and the region cache.
///
/// ```rust
/// # use bedrock_discovery::DiscoveryConfig;
/// # use std::time::Duration;
/// let config = DiscoveryConfig::new()
///     .regions(["us-east-1", "us-west-2"])
///     .preferred_regions(["us-west-2"])
///     .region_timeout(Duration::from_secs(3));
/// assert_eq!(config.regions.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Regions scanned by default.
    pub regions: Vec<String>,
    /// Regions ranked first by best-region selection, in order.
    pub preferred_regions: Vec<String>,
    /// Age after which the model cache is stale. Default: 7 days.
    pub cache_ttl: Duration,
    /// Bound on each per-region listing call. Default: 5s.
    pub region_timeout: Duration,
    /// Where the cache is persisted.
    pub cache_path: PathBuf,
    /// Also list and associate inference profiles during scans. Default: true.
    pub include_profiles: bool,
    /// Model ids checked by access-issue reporting.
    pub project_models: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            preferred_regions: Vec::new(),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECONDS),
            region_timeout: DEFAULT_REGION_TIMEOUT,
            cache_path: default_cache_path(),
            include_profiles: true,
            project_models: PROJECT_MODEL_IDS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the regions scanned by default.
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the preferred regions, highest preference first.
    pub fn preferred_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the cache time-to-live.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the per-region listing timeout.
    pub fn region_timeout(mut self, timeout: Duration) -> Self {
        self.region_timeout = timeout;
        self
    }

    /// Set the cache file location.
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Enable or disable inference-profile listing during scans.
    pub fn include_profiles(mut self, enabled: bool) -> Self {
        self.include_profiles = enabled;
        self
    }

    /// Set the model ids checked by access-issue reporting.
    pub fn project_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project_models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, `~/.hstc/config.toml` is
    /// used if present, otherwise the defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DiscoveryError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            DiscoveryError::Configuration(msg) => {
                DiscoveryError::Configuration(format!("{msg} (in {path:?})"))
            }
            other => other,
        })
    }

    /// Parse config from a TOML string. Missing keys keep their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| {
            DiscoveryError::Configuration(format!("Failed to parse config: {e}"))
        })?;
        Ok(file.discovery.apply(Self::default()))
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(DiscoveryError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hstc").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }
}

/// Default cache path: `~/.hstc/cache/bedrock_models.json`.
pub fn default_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hstc")
        .join("cache")
        .join("bedrock_models.json")
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    discovery: DiscoverySection,
}

/// On-disk shape of the `[discovery]` table; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct DiscoverySection {
    regions: Option<Vec<String>>,
    preferred_regions: Option<Vec<String>>,
    cache_ttl_secs: Option<u64>,
    region_timeout_secs: Option<u64>,
    cache_path: Option<PathBuf>,
    include_profiles: Option<bool>,
    project_models: Option<Vec<String>>,
}

impl DiscoverySection {
    fn apply(self, mut config: DiscoveryConfig) -> DiscoveryConfig {
        if let Some(regions) = self.regions {
            config.regions = regions;
        }
        if let Some(preferred) = self.preferred_regions {
            config.preferred_regions = preferred;
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = self.region_timeout_secs {
            config.region_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = self.cache_path {
            config.cache_path = path;
        }
        if let Some(enabled) = self.include_profiles {
            config.include_profiles = enabled;
        }
        if let Some(models) = self.project_models {
            config.project_models = models;
        }
        config
    }
}
