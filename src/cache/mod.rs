//! Region/model cache store.
//!
//! [`ModelCache`] holds one [`RegionCache`] behind a single mutex: a map of
//! region → model id → [`ModelRecord`], per-region latency samples, and a
//! last-updated timestamp per category (currently only `"models"`).
//!
//! Every write is a wholesale replace or clear of one slot, so readers never
//! observe a half-populated region. Network I/O never happens while the lock
//! is held; scans assemble the replacement map first and then swap it in
//! with [`ModelCache::set_region_models`].
//!
//! The cache is an explicit context object. Construct one per process (or per
//! test) and share it with `Arc`.

mod persist;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::ModelRecord;

/// `last_updated` category for the model map.
pub const MODELS_CATEGORY: &str = "models";

/// Region name → model id → record.
pub type RegionModels = BTreeMap<String, BTreeMap<String, ModelRecord>>;

/// Plain snapshot of the cache contents.
///
/// This is also the persisted JSON shape:
/// `{"models": {...}, "latency": {...}, "last_updated": {"models": ts}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionCache {
    #[serde(default)]
    pub models: RegionModels,
    /// Region → round-trip estimate in milliseconds.
    #[serde(default)]
    pub latency: BTreeMap<String, f64>,
    /// Category → unix timestamp (seconds) of the last refresh.
    #[serde(default)]
    pub last_updated: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

impl RegionCache {
    /// Look up one record.
    pub fn get(&self, region: &str, model_id: &str) -> Option<&ModelRecord> {
        self.models.get(region)?.get(model_id)
    }

    /// Regions whose model map contains `model_id`, in region-name order.
    pub fn regions_for_model(&self, model_id: &str) -> Vec<String> {
        self.models
            .iter()
            .filter(|(_, models)| models.contains_key(model_id))
            .map(|(region, _)| region.clone())
            .collect()
    }

    /// Recorded latency for a region, `f64::INFINITY` when never sampled.
    pub fn latency_or_max(&self, region: &str) -> f64 {
        self.latency.get(region).copied().unwrap_or(f64::INFINITY)
    }

    /// Stable sort of `regions` by ascending latency; unsampled regions last.
    pub fn sort_by_latency(&self, regions: &mut [String]) {
        regions.sort_by(|a, b| self.latency_or_max(a).total_cmp(&self.latency_or_max(b)));
    }

    /// Whether the model map is empty or older than `ttl` at time `now`.
    pub fn is_expired_at(&self, now: f64, ttl: Duration) -> bool {
        if self.models.is_empty() {
            return true;
        }
        match self.last_updated.get(MODELS_CATEGORY) {
            Some(updated) => now - updated > ttl.as_secs_f64(),
            None => true,
        }
    }
}

/// Thread-safe region/model cache guarded by one mutex.
#[derive(Debug, Default)]
pub struct ModelCache {
    inner: Mutex<RegionCache>,
}

impl ModelCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: RegionCache) -> Self {
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegionCache> {
        // A panic mid-read cannot leave a half-written slot behind, since
        // every write is a single assignment or clear.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read-only closure against the cache under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&RegionCache) -> R) -> R {
        f(&self.lock())
    }

    /// Deep copy of the whole cache.
    pub fn snapshot(&self) -> RegionCache {
        self.lock().clone()
    }

    /// Look up one record.
    ///
    /// Returns `None` for unknown regions or models.
    pub fn get(&self, region: &str, model_id: &str) -> Option<ModelRecord> {
        self.lock().get(region, model_id).cloned()
    }

    /// Regions whose model map contains `model_id`, sorted by region name.
    pub fn get_regions_for_model(&self, model_id: &str) -> Vec<String> {
        self.lock().regions_for_model(model_id)
    }

    /// Whether a region has a model map (possibly empty).
    pub fn has_region(&self, region: &str) -> bool {
        self.lock().models.contains_key(region)
    }

    /// Replace one region's model map and stamp `last_updated["models"]`.
    ///
    /// Records are keyed by their own `model_id`, so keys always agree with
    /// the records they point at.
    pub fn set_region_models(&self, region: &str, models: impl IntoIterator<Item = ModelRecord>) {
        let map: BTreeMap<String, ModelRecord> = models
            .into_iter()
            .map(|record| (record.model_id.clone(), record))
            .collect();
        let mut cache = self.lock();
        cache.models.insert(region.to_string(), map);
        cache
            .last_updated
            .insert(MODELS_CATEGORY.to_string(), now_unix());
    }

    /// Drop one region's models. Latency samples are kept.
    pub fn invalidate_region(&self, region: &str) -> bool {
        self.lock().models.remove(region).is_some()
    }

    /// Record a latency sample (milliseconds) for a region.
    ///
    /// Negative or non-finite samples are dropped and `false` is returned;
    /// the previous sample, if any, stays in place.
    pub fn set_latency(&self, region: &str, millis: f64) -> bool {
        if !millis.is_finite() || millis < 0.0 {
            warn!(region, millis, "ignoring invalid latency sample");
            return false;
        }
        self.lock().latency.insert(region.to_string(), millis);
        true
    }

    /// Latest latency sample for a region.
    pub fn latency(&self, region: &str) -> Option<f64> {
        self.lock().latency.get(region).copied()
    }

    /// Copy of all latency samples.
    pub fn latencies(&self) -> BTreeMap<String, f64> {
        self.lock().latency.clone()
    }

    /// Last refresh timestamp for a category.
    pub fn last_updated(&self, category: &str) -> Option<f64> {
        self.lock().last_updated.get(category).copied()
    }

    /// Overwrite a category's refresh timestamp.
    pub fn set_last_updated(&self, category: &str, timestamp: f64) {
        self.lock()
            .last_updated
            .insert(category.to_string(), timestamp);
    }

    /// Schema version recorded in the cache, if any.
    pub fn schema_version(&self) -> Option<String> {
        self.lock().schema_version.clone()
    }

    /// Drop all models and the models timestamp, keeping latency samples.
    pub fn clear_models(&self) {
        let mut cache = self.lock();
        cache.models.clear();
        cache.last_updated.remove(MODELS_CATEGORY);
    }

    /// Same as [`clear_models`](Self::clear_models): latency is always kept,
    /// as there is no separate latency refresh path.
    pub fn clear_all(&self) {
        self.clear_models();
    }

    /// Whether the model cache is empty or older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.lock().is_expired_at(now_unix(), ttl)
    }

    /// Mutate the cache under the lock. Kept crate-private so every public
    /// write stays a single replace or clear.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut RegionCache) -> R) -> R {
        f(&mut self.lock())
    }
}

/// Current unix time in seconds.
pub fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
