//! Model discovery over the region cache.
//!
//! [`ModelDiscovery`] ties a [`ModelCatalog`] to a shared [`ModelCache`]:
//!
//! - **Scanning** lists models per region (concurrently, each bounded by the
//!   configured timeout) and swaps each region's new map into the cache. The
//!   scan is cache-first: when nothing is missing or stale it returns the
//!   cached snapshot without touching the catalog.
//! - **Availability and ranking** answer where a model can be invoked, with
//!   caller preference ranked above measured latency.
//! - **Profiles** ([`profiles`]) and **capabilities** ([`capabilities`])
//!   layer further queries on the same cache.
//!
//! One region failing never aborts a scan; the failure is logged and
//! reported in [`ScanReport::failures`].

mod association;
mod builder;
pub mod capabilities;
pub mod profiles;

pub use association::{
    AssociationReport, SkipReason, SkippedReference, associate_profiles_with_models,
    filter_profiles_by_model, get_model_ids_from_profile,
};
pub use builder::DiscoveryBuilder;
pub use capabilities::{AccessIssue, PROMPT_CACHING_MODEL_PREFIXES, supports_prompt_caching};
pub use profiles::{DEFAULT_SCHEMA_VERSION, ModelProfileMapping};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{ModelCache, RegionCache};
use crate::catalog::ModelCatalog;
use crate::config::DiscoveryConfig;
use crate::telemetry;
use crate::types::ModelRecord;
use crate::{DiscoveryError, Result};

/// A region that could not be refreshed during a scan.
#[derive(Debug)]
pub struct RegionFailure {
    pub region: String,
    pub error: DiscoveryError,
}

impl RegionFailure {
    /// Whether the region failed on permissions rather than availability.
    pub fn is_access_denied(&self) -> bool {
        self.error.is_access_denied()
    }
}

/// Outcome of [`ModelDiscovery::scan_regions`].
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Cache contents after the scan.
    pub cache: RegionCache,
    /// Regions whose model map was replaced, in request order.
    pub refreshed: Vec<String>,
    /// Regions skipped because listing failed or timed out.
    pub failures: Vec<RegionFailure>,
    /// Profile association diagnostics across all refreshed regions.
    pub association: AssociationReport,
}

impl ScanReport {
    /// Whether the scan was answered from the cache alone.
    pub fn from_cache(&self) -> bool {
        self.refreshed.is_empty() && self.failures.is_empty()
    }
}

/// Result of listing one region, ready to swap into the cache.
struct RegionScan {
    models: BTreeMap<String, ModelRecord>,
    latency: Duration,
    association: AssociationReport,
}

/// Discovery service over a shared region cache.
pub struct ModelDiscovery {
    cache: Arc<ModelCache>,
    catalog: Arc<dyn ModelCatalog>,
    config: DiscoveryConfig,
}

impl ModelDiscovery {
    /// Create a new builder.
    pub fn builder() -> DiscoveryBuilder {
        DiscoveryBuilder::new()
    }

    /// Create a service with a fresh, empty cache.
    pub fn new(catalog: Arc<dyn ModelCatalog>, config: DiscoveryConfig) -> Self {
        Self::with_cache(Arc::new(ModelCache::new()), catalog, config)
    }

    /// Create a service over an existing cache.
    pub fn with_cache(
        cache: Arc<ModelCache>,
        catalog: Arc<dyn ModelCatalog>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            cache,
            catalog,
            config,
        }
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// The active configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Save the cache to the configured path.
    pub fn persist(&self) -> bool {
        self.cache.save(&self.config.cache_path)
    }

    /// Merge the cache file at the configured path into memory.
    pub fn reload(&self) -> bool {
        self.cache.load(&self.config.cache_path)
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    /// Scan the configured default regions.
    pub async fn scan_default_regions(&self, force_refresh: bool) -> ScanReport {
        self.scan_regions(self.config.regions.as_slice(), force_refresh).await
    }

    /// Refresh the cache for `regions` and return the resulting snapshot.
    ///
    /// A region is listed when `force_refresh` is set, when the cache is
    /// expired, or when the region has no cached entry. If no region needs
    /// listing, no catalog call is made.
    pub async fn scan_regions<S>(&self, regions: &[S], force_refresh: bool) -> ScanReport
    where
        S: AsRef<str> + Sync,
    {
        let stale = force_refresh || self.cache.is_expired(self.config.cache_ttl);
        let mut targets: Vec<String> = Vec::new();
        for region in regions.iter().map(AsRef::as_ref) {
            if (stale || !self.cache.has_region(region)) && !targets.iter().any(|t| t == region) {
                targets.push(region.to_string());
            }
        }

        if targets.is_empty() {
            metrics::counter!(telemetry::SCAN_CACHE_HITS_TOTAL).increment(1);
            debug!("model cache is fresh, skipping scan");
            return ScanReport {
                cache: self.cache.snapshot(),
                ..Default::default()
            };
        }

        info!(
            catalog = self.catalog.name(),
            regions = targets.len(),
            force_refresh,
            "scanning regions for foundation models"
        );

        let outcomes = join_all(targets.iter().map(|region| self.scan_region(region))).await;

        let mut report = ScanReport::default();
        for (region, outcome) in targets.into_iter().zip(outcomes) {
            match outcome {
                Ok(scan) => {
                    let count = scan.models.len();
                    self.cache.set_region_models(&region, scan.models.into_values());
                    self.cache
                        .set_latency(&region, scan.latency.as_secs_f64() * 1000.0);
                    record_skipped(&scan.association);
                    report.association.merge(scan.association);
                    debug!(region = %region, models = count, "refreshed region");
                    report.refreshed.push(region);
                }
                Err(error) => {
                    warn!(region = %region, error = %error, "skipping region after listing failure");
                    report.failures.push(RegionFailure { region, error });
                }
            }
        }

        info!(
            refreshed = report.refreshed.len(),
            failed = report.failures.len(),
            profiles_attached = report.association.attached,
            "region scan finished"
        );
        report.cache = self.cache.snapshot();
        report
    }

    /// List one region and assemble its replacement model map.
    async fn scan_region(&self, region: &str) -> Result<RegionScan> {
        let timeout = self.config.region_timeout;
        let started = Instant::now();
        let listing = tokio::time::timeout(timeout, self.catalog.list_foundation_models(region)).await;
        let latency = started.elapsed();

        let summaries = match listing {
            Ok(Ok(summaries)) => summaries,
            Ok(Err(e)) => {
                let status = if e.is_access_denied() {
                    "access_denied"
                } else {
                    "error"
                };
                record_scan(region, status);
                return Err(e);
            }
            Err(_) => {
                record_scan(region, "timeout");
                return Err(DiscoveryError::Timeout {
                    region: region.to_string(),
                    after: timeout,
                });
            }
        };
        record_scan(region, "ok");
        metrics::histogram!(telemetry::REGION_SCAN_DURATION_SECONDS,
            "region" => region.to_owned(),
        )
        .record(latency.as_secs_f64());

        let mut models: BTreeMap<String, ModelRecord> = summaries
            .into_iter()
            .filter(|s| !s.model_id.is_empty())
            .map(|s| {
                let record = s.into_model_record();
                (record.model_id.clone(), record)
            })
            .collect();

        let association = if self.config.include_profiles {
            match tokio::time::timeout(timeout, self.catalog.list_inference_profiles(region)).await
            {
                Ok(Ok(profiles)) => associate_profiles_with_models(&mut models, &profiles),
                Ok(Err(e)) => {
                    warn!(region, error = %e, "failed to list inference profiles, keeping models without profiles");
                    AssociationReport::default()
                }
                Err(_) => {
                    warn!(region, ?timeout, "inference profile listing timed out, keeping models without profiles");
                    AssociationReport::default()
                }
            }
        } else {
            AssociationReport::default()
        };

        Ok(RegionScan {
            models,
            latency,
            association,
        })
    }

    // ========================================================================
    // Availability
    // ========================================================================

    /// Whether the model is cached in `region` and not explicitly inaccessible.
    pub fn is_model_available_in_region(&self, model_id: &str, region: &str) -> bool {
        self.cache
            .read(|cache| cache.get(region, model_id).is_some_and(|m| m.accessible))
    }

    /// Regions where the model is cached, in region-name order.
    pub fn get_model_regions(&self, model_id: &str) -> Vec<String> {
        self.cache.get_regions_for_model(model_id)
    }

    /// Regions where the model is available, best first.
    ///
    /// Regions named in `preferred_regions` come first, in the caller's order.
    /// The rest follow by ascending recorded latency, unsampled regions last.
    /// An empty `preferred_regions` falls back to the configured preference.
    /// An empty result means "invoke on demand in the default region".
    pub fn get_best_regions_for_model(&self, model_id: &str, preferred_regions: &[&str]) -> Vec<String> {
        let configured: Vec<&str> = self
            .config
            .preferred_regions
            .iter()
            .map(String::as_str)
            .collect();
        let preferred = if preferred_regions.is_empty() {
            configured.as_slice()
        } else {
            preferred_regions
        };

        self.cache.read(|cache| {
            let available: Vec<String> = cache
                .regions_for_model(model_id)
                .into_iter()
                .filter(|region| cache.get(region, model_id).is_some_and(|m| m.accessible))
                .collect();

            let mut ranked: Vec<String> = Vec::with_capacity(available.len());
            for region in preferred {
                if available.iter().any(|a| a == region) && !ranked.iter().any(|r| r == region) {
                    ranked.push(region.to_string());
                }
            }

            let mut rest: Vec<String> = available
                .into_iter()
                .filter(|region| !ranked.contains(region))
                .collect();
            cache.sort_by_latency(&mut rest);
            ranked.extend(rest);
            ranked
        })
    }
}

fn record_scan(region: &str, status: &'static str) {
    metrics::counter!(telemetry::REGION_SCANS_TOTAL,
        "region" => region.to_owned(),
        "status" => status,
    )
    .increment(1);
}

fn record_skipped(report: &AssociationReport) {
    for skipped in &report.skipped {
        metrics::counter!(telemetry::PROFILES_SKIPPED_TOTAL,
            "reason" => skipped.reason.label(),
        )
        .increment(1);
    }
}
