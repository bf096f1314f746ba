//! JSON persistence for [`ModelCache`].
//!
//! Persistence is an optimisation: [`ModelCache::save`] and
//! [`ModelCache::load`] report failure as `false` plus a warning, and never
//! return an error.
//!
//! `load` merges rather than replaces. Top-level keys missing from the file
//! leave in-memory values untouched, and a file region only replaces an
//! in-memory one when the file's models timestamp is newer, so loading
//! speculatively at startup cannot roll back regions scanned since.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{MODELS_CATEGORY, ModelCache, RegionCache, RegionModels};
use crate::telemetry;
use crate::{DiscoveryError, Result};

/// File contents with every top-level key optional.
#[derive(Debug, Default, Deserialize)]
struct PersistedCache {
    models: Option<RegionModels>,
    /// Non-finite samples were written as `null` by earlier versions.
    latency: Option<BTreeMap<String, Option<f64>>>,
    last_updated: Option<BTreeMap<String, f64>>,
    schema_version: Option<String>,
}

impl ModelCache {
    /// Write the cache to `path` as JSON, creating parent directories.
    ///
    /// Returns `false` (after logging a warning) on any failure.
    pub fn save(&self, path: &Path) -> bool {
        let snapshot = self.snapshot();
        let ok = match write_snapshot(path, &snapshot) {
            Ok(()) => {
                debug!(path = %path.display(), regions = snapshot.models.len(), "saved model cache");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to save model cache");
                false
            }
        };
        record_persist("save", ok);
        ok
    }

    /// Merge the cache file at `path` into memory.
    ///
    /// Returns `false` when the file is missing, unreadable or corrupt.
    pub fn load(&self, path: &Path) -> bool {
        let persisted = match read_snapshot(path) {
            Ok(Some(p)) => p,
            Ok(None) => {
                debug!(path = %path.display(), "no model cache file");
                record_persist("load", false);
                return false;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load model cache");
                record_persist("load", false);
                return false;
            }
        };

        self.update(|cache| merge(cache, persisted));
        debug!(path = %path.display(), "loaded model cache");
        record_persist("load", true);
        true
    }
}

/// Fold file contents into memory without rolling back newer data.
///
/// File regions and latency samples fill gaps; they only overwrite memory
/// when the file's models timestamp is newer than the in-memory one.
/// Timestamps keep the newer value per category.
fn merge(cache: &mut RegionCache, persisted: PersistedCache) {
    let file_updated = persisted
        .last_updated
        .as_ref()
        .and_then(|t| t.get(MODELS_CATEGORY).copied());
    let file_is_newer = match (file_updated, cache.last_updated.get(MODELS_CATEGORY)) {
        (_, None) => true,
        (Some(file), Some(memory)) => file > *memory,
        (None, Some(_)) => false,
    };

    if let Some(models) = persisted.models {
        for (region, mut region_models) in models {
            if !file_is_newer && cache.models.contains_key(&region) {
                continue;
            }
            // Older files may omit or disagree on the inner id; the key wins.
            for (key, record) in region_models.iter_mut() {
                if record.model_id != *key {
                    record.model_id = key.clone();
                }
            }
            cache.models.insert(region, region_models);
        }
    }
    if let Some(latency) = persisted.latency {
        for (region, millis) in latency {
            let Some(millis) = millis.filter(|m| m.is_finite() && *m >= 0.0) else {
                continue;
            };
            if file_is_newer || !cache.latency.contains_key(&region) {
                cache.latency.insert(region, millis);
            }
        }
    }
    if let Some(last_updated) = persisted.last_updated {
        for (category, timestamp) in last_updated {
            let slot = cache.last_updated.entry(category).or_insert(timestamp);
            if timestamp > *slot {
                *slot = timestamp;
            }
        }
    }
    if persisted.schema_version.is_some() {
        cache.schema_version = persisted.schema_version;
    }
}

/// Atomic write via tmp file + rename.
fn write_snapshot(path: &Path, snapshot: &RegionCache) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DiscoveryError::Configuration(format!(
                "failed to create cache dir {}: {e}",
                parent.display()
            ))
        })?;
    }

    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &json).map_err(|e| {
        DiscoveryError::Configuration(format!(
            "failed to write cache file {}: {e}",
            tmp_path.display()
        ))
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        DiscoveryError::Configuration(format!(
            "failed to rename cache file {} → {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;
    Ok(())
}

/// `Ok(None)` when the file does not exist.
fn read_snapshot(path: &Path) -> Result<Option<PersistedCache>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(DiscoveryError::Configuration(format!(
                "failed to read cache file {}: {e}",
                path.display()
            )));
        }
    };
    Ok(Some(serde_json::from_str(&content)?))
}

fn record_persist(operation: &'static str, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::CACHE_PERSIST_TOTAL,
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
}
