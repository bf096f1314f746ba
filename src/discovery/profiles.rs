//! Profile discovery: queries over the profile-annotated model cache.
//!
//! Lookups tolerate version-suffix mismatches: when a region has no record
//! under the exact model id, records sharing its base id (the part before the
//! first `:`) are searched instead.

use serde::{Deserialize, Serialize};

use super::ModelDiscovery;
use super::association::{AssociationReport, associate_profiles_with_models};
use crate::cache::{RegionCache, RegionModels};
use crate::types::{InferenceProfileRecord, ModelRecord, base_model_id};

/// Schema version reported when the cache does not carry one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0";

/// Versioned export of the enriched model cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfileMapping {
    pub schema_version: String,
    pub models: RegionModels,
}

/// Records in `region` for `model_id`: the exact entry if present, otherwise
/// every entry sharing its base id.
fn matching_records<'a>(cache: &'a RegionCache, region: &str, model_id: &str) -> Vec<&'a ModelRecord> {
    let Some(models) = cache.models.get(region) else {
        return Vec::new();
    };
    if let Some(exact) = models.get(model_id) {
        return vec![exact];
    }
    let base = base_model_id(model_id);
    models
        .iter()
        .filter(|(key, _)| base_model_id(key) == base)
        .map(|(_, record)| record)
        .collect()
}

/// Regions holding a record that matches `model_id`, in region-name order.
fn matching_regions(cache: &RegionCache, model_id: &str) -> Vec<String> {
    cache
        .models
        .keys()
        .filter(|region| !matching_records(cache, region, model_id).is_empty())
        .cloned()
        .collect()
}

impl ModelDiscovery {
    /// Inference profile ids referencing `model_id`, deduplicated.
    ///
    /// With a region, only that region's record is read; without one, ids are
    /// unioned over every region where the model is cached. An empty result
    /// means "invoke on demand".
    pub fn get_inference_profile_ids(&self, model_id: &str, region: Option<&str>) -> Vec<String> {
        self.cache.read(|cache| {
            let regions = match region {
                Some(region) => vec![region.to_string()],
                None => matching_regions(cache, model_id),
            };

            let mut ids: Vec<String> = Vec::new();
            for region in &regions {
                for record in matching_records(cache, region, model_id) {
                    for id in record.profile_ids() {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
            }
            ids
        })
    }

    /// A copy of one embedded profile.
    ///
    /// Without a region, the lowest-latency region holding the profile for
    /// this model is used.
    pub fn get_inference_profile(
        &self,
        model_id: &str,
        profile_id: &str,
        region: Option<&str>,
    ) -> Option<InferenceProfileRecord> {
        let region = match region {
            Some(region) => region.to_string(),
            None => self
                .find_regions_for_profile(profile_id, Some(model_id))
                .into_iter()
                .next()?,
        };

        self.cache.read(|cache| {
            matching_records(cache, &region, model_id)
                .into_iter()
                .flat_map(|record| record.referenced_by_instance_profiles.iter())
                .find(|profile| profile.id() == Some(profile_id))
                .cloned()
        })
    }

    /// Regions offering `profile_id`, sorted by ascending latency.
    ///
    /// With a `model_id` hint only that model's regions are searched; without
    /// one every record in the cache is scanned. Pass the hint when known.
    pub fn find_regions_for_profile(&self, profile_id: &str, model_id: Option<&str>) -> Vec<String> {
        self.cache.read(|cache| {
            let mut regions: Vec<String> = match model_id {
                Some(model_id) => matching_regions(cache, model_id)
                    .into_iter()
                    .filter(|region| {
                        matching_records(cache, region, model_id)
                            .iter()
                            .any(|record| record.references_profile(profile_id))
                    })
                    .collect(),
                None => cache
                    .models
                    .iter()
                    .filter(|(_, models)| {
                        models
                            .values()
                            .any(|record| record.references_profile(profile_id))
                    })
                    .map(|(region, _)| region.clone())
                    .collect(),
            };
            cache.sort_by_latency(&mut regions);
            regions
        })
    }

    /// Versioned snapshot of the enriched cache, optionally rescanning the
    /// configured regions first.
    pub async fn get_model_profile_mapping(&self, refresh: bool) -> ModelProfileMapping {
        if refresh {
            self.scan_default_regions(true).await;
        }
        self.cache.read(|cache| ModelProfileMapping {
            schema_version: cache
                .schema_version
                .clone()
                .unwrap_or_else(|| DEFAULT_SCHEMA_VERSION.to_string()),
            models: cache.models.clone(),
        })
    }

    /// Associate externally obtained profiles with a cached region's models.
    ///
    /// The whole pass runs under the cache lock.
    pub fn associate_profiles(
        &self,
        region: &str,
        profiles: &[InferenceProfileRecord],
    ) -> AssociationReport {
        self.cache.update(|cache| match cache.models.get_mut(region) {
            Some(models) => associate_profiles_with_models(models, profiles),
            None => AssociationReport::default(),
        })
    }
}
