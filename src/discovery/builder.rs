//! Builder for configuring discovery instances

use std::sync::Arc;

use tracing::debug;

use super::ModelDiscovery;
use crate::Result;
use crate::cache::ModelCache;
use crate::catalog::{BedrockHttpCatalog, ModelCatalog};
use crate::config::DiscoveryConfig;

/// Builder for [`ModelDiscovery`].
///
/// ```rust,no_run
/// # use bedrock_discovery::{DiscoveryConfig, ModelDiscovery};
/// # async fn run() -> bedrock_discovery::Result<()> {
/// let discovery = ModelDiscovery::builder()
///     .config(DiscoveryConfig::new().regions(["us-east-1", "us-west-2"]))
///     .build()?;
/// let report = discovery.scan_default_regions(false).await;
/// println!("{} regions refreshed", report.refreshed.len());
/// # Ok(())
/// # }
/// ```
pub struct DiscoveryBuilder {
    config: Option<DiscoveryConfig>,
    catalog: Option<Arc<dyn ModelCatalog>>,
    cache: Option<Arc<ModelCache>>,
    load_persisted: bool,
}

impl DiscoveryBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            catalog: None,
            cache: None,
            load_persisted: true,
        }
    }

    /// Use a specific configuration instead of the defaults.
    pub fn config(mut self, config: DiscoveryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific catalog instead of [`BedrockHttpCatalog::from_env`].
    pub fn catalog(mut self, catalog: Arc<dyn ModelCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Share an existing cache.
    pub fn cache(mut self, cache: Arc<ModelCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Whether to merge the persisted cache file on build (default: true).
    pub fn load_persisted(mut self, enabled: bool) -> Self {
        self.load_persisted = enabled;
        self
    }

    /// Build the discovery service.
    pub fn build(self) -> Result<ModelDiscovery> {
        let config = self.config.unwrap_or_default();
        let catalog: Arc<dyn ModelCatalog> = match self.catalog {
            Some(catalog) => catalog,
            None => Arc::new(BedrockHttpCatalog::from_env()?),
        };
        let cache = self.cache.unwrap_or_default();

        if self.load_persisted {
            // A missing or corrupt file just leaves the cache as it was.
            let loaded = cache.load(&config.cache_path);
            debug!(path = %config.cache_path.display(), loaded, "startup cache load");
        }

        Ok(ModelDiscovery::with_cache(cache, catalog, config))
    }
}

impl Default for DiscoveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
