//! Cache freshness, invalidation, and model capability predicates.

use serde::{Deserialize, Serialize};

use super::ModelDiscovery;

/// Model-family prefixes with Bedrock prompt caching support.
///
/// Matched as prefixes so every dated variant of a family qualifies.
pub const PROMPT_CACHING_MODEL_PREFIXES: &[&str] = &[
    "anthropic.claude-3-7-sonnet",
    "anthropic.claude-3-5-haiku",
    "anthropic.claude-sonnet-4",
    "anthropic.claude-opus-4",
    "amazon.nova-micro",
    "amazon.nova-lite",
    "amazon.nova-pro",
];

/// Whether `model_id` belongs to a family that supports prompt caching.
pub fn supports_prompt_caching(model_id: &str) -> bool {
    PROMPT_CACHING_MODEL_PREFIXES
        .iter()
        .any(|prefix| model_id.starts_with(prefix))
}

/// A project model that exists in some regions but cannot be invoked there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessIssue {
    pub model_id: String,
    pub inaccessible_regions: Vec<String>,
}

impl ModelDiscovery {
    /// Whether the model cache is empty or older than the configured TTL.
    ///
    /// Advisory only; callers decide whether to rescan.
    pub fn is_cache_expired(&self) -> bool {
        self.cache.is_expired(self.config.cache_ttl)
    }

    /// [`is_cache_expired`](Self::is_cache_expired) evaluated at a given unix time.
    pub fn is_cache_expired_at(&self, now: f64) -> bool {
        self.cache
            .read(|cache| cache.is_expired_at(now, self.config.cache_ttl))
    }

    /// Drop all cached models, keeping region latency samples.
    pub fn clear_models_cache(&self) {
        self.cache.clear_models();
    }

    /// Alias of [`clear_models_cache`](Self::clear_models_cache).
    pub fn clear_cache(&self) {
        self.clear_models_cache();
    }

    /// Whether `model_id` supports prompt caching.
    pub fn supports_prompt_caching(&self, model_id: &str) -> bool {
        supports_prompt_caching(model_id)
    }

    /// Project models that are cached somewhere with `accessible == false`.
    ///
    /// Only regions where the model exists are considered, and models with no
    /// such region are omitted. No catalog call is made.
    pub fn get_models_with_access_issues(&self) -> Vec<AccessIssue> {
        self.cache.read(|cache| {
            self.config
                .project_models
                .iter()
                .filter_map(|model_id| {
                    let inaccessible_regions: Vec<String> = cache
                        .models
                        .iter()
                        .filter(|(_, models)| models.get(model_id).is_some_and(|m| !m.accessible))
                        .map(|(region, _)| region.clone())
                        .collect();
                    (!inaccessible_regions.is_empty()).then(|| AccessIssue {
                        model_id: model_id.clone(),
                        inaccessible_regions,
                    })
                })
                .collect()
        })
    }
}
