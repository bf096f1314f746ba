//! Integration tests for [`ModelDiscovery`]: cache-first scanning, partial
//! failure tolerance, availability and best-region ranking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use bedrock_discovery::{
    DiscoveryConfig, DiscoveryError, FoundationModelSummary, InferenceProfileRecord, ModelCache,
    ModelCatalog, ModelDiscovery, ModelRecord, Result,
};

const SONNET: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";
const NOVA_LITE: &str = "amazon.nova-lite-v1:0";

// =============================================================================
// Mock catalog
// =============================================================================

#[derive(Default)]
struct MockCatalog {
    models: HashMap<String, Vec<FoundationModelSummary>>,
    profiles: HashMap<String, Vec<InferenceProfileRecord>>,
    denied: HashSet<String>,
    failing: HashSet<String>,
    slow: HashSet<String>,
    profiles_fail: bool,
    model_calls: AtomicUsize,
    profile_calls: AtomicUsize,
}

impl MockCatalog {
    fn with_models(mut self, region: &str, ids: &[&str]) -> Self {
        self.models.insert(
            region.to_string(),
            ids.iter()
                .map(|id| FoundationModelSummary::new(*id, "test"))
                .collect(),
        );
        self
    }

    fn with_profiles(mut self, region: &str, profiles: Vec<InferenceProfileRecord>) -> Self {
        self.profiles.insert(region.to_string(), profiles);
        self
    }

    fn denied(mut self, region: &str) -> Self {
        self.denied.insert(region.to_string());
        self
    }

    fn failing(mut self, region: &str) -> Self {
        self.failing.insert(region.to_string());
        self
    }

    fn slow(mut self, region: &str) -> Self {
        self.slow.insert(region.to_string());
        self
    }

    fn model_calls(&self) -> usize {
        self.model_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelCatalog for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_foundation_models(&self, region: &str) -> Result<Vec<FoundationModelSummary>> {
        self.model_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow.contains(region) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.denied.contains(region) {
            return Err(DiscoveryError::AccessDenied {
                region: region.to_string(),
                message: "not authorized to perform bedrock:ListFoundationModels".to_string(),
            });
        }
        if self.failing.contains(region) {
            return Err(DiscoveryError::Http("connection reset".to_string()));
        }
        Ok(self.models.get(region).cloned().unwrap_or_default())
    }

    async fn list_inference_profiles(&self, region: &str) -> Result<Vec<InferenceProfileRecord>> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.profiles_fail {
            return Err(DiscoveryError::Api {
                status: 400,
                message: "ValidationException".to_string(),
            });
        }
        Ok(self.profiles.get(region).cloned().unwrap_or_default())
    }
}

fn test_config() -> DiscoveryConfig {
    DiscoveryConfig::new()
        .regions(["us-east-1", "us-west-2"])
        .region_timeout(Duration::from_secs(5))
}

fn discovery(catalog: Arc<MockCatalog>) -> ModelDiscovery {
    ModelDiscovery::new(catalog, test_config())
}

// =============================================================================
// Cache-first scanning
// =============================================================================

#[tokio::test]
async fn empty_cache_always_scans() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET, NOVA_LITE]));
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery.scan_regions(&["us-east-1"], false).await;

    assert_eq!(catalog.model_calls(), 1);
    assert_eq!(report.refreshed, vec!["us-east-1"]);
    assert!(!report.from_cache());
    assert_eq!(report.cache.models["us-east-1"].len(), 2);
    assert!(discovery.cache().latency("us-east-1").is_some());
    assert!(!discovery.is_cache_expired());
}

#[tokio::test]
async fn fresh_cache_skips_catalog() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET]));
    let discovery = discovery(Arc::clone(&catalog));

    discovery.scan_regions(&["us-east-1"], false).await;
    let report = discovery.scan_regions(&["us-east-1"], false).await;

    assert_eq!(catalog.model_calls(), 1);
    assert!(report.from_cache());
    assert!(report.cache.get("us-east-1", SONNET).is_some());
}

#[tokio::test]
async fn force_refresh_rescans() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET]));
    let discovery = discovery(Arc::clone(&catalog));

    discovery.scan_regions(&["us-east-1"], false).await;
    discovery.scan_regions(&["us-east-1"], true).await;

    assert_eq!(catalog.model_calls(), 2);
}

#[tokio::test]
async fn fresh_cache_scans_only_missing_regions() {
    let catalog = Arc::new(
        MockCatalog::default()
            .with_models("us-east-1", &[SONNET])
            .with_models("us-west-2", &[SONNET]),
    );
    let discovery = discovery(Arc::clone(&catalog));

    discovery.scan_regions(&["us-east-1"], false).await;
    let report = discovery
        .scan_regions(&["us-east-1", "us-west-2"], false)
        .await;

    assert_eq!(catalog.model_calls(), 2);
    assert_eq!(report.refreshed, vec!["us-west-2"]);
}

#[tokio::test]
async fn expired_cache_rescans_everything() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET]));
    let discovery = discovery(Arc::clone(&catalog));

    discovery.scan_regions(&["us-east-1"], false).await;
    discovery
        .cache()
        .set_last_updated(bedrock_discovery::MODELS_CATEGORY, 0.0);
    assert!(discovery.is_cache_expired());

    discovery.scan_regions(&["us-east-1"], false).await;
    assert_eq!(catalog.model_calls(), 2);
}

#[tokio::test]
async fn duplicate_regions_are_scanned_once() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET]));
    let discovery = discovery(Arc::clone(&catalog));

    discovery
        .scan_regions(&["us-east-1", "us-east-1"], false)
        .await;
    assert_eq!(catalog.model_calls(), 1);
}

#[tokio::test]
async fn scan_default_regions_uses_config() {
    let catalog = Arc::new(
        MockCatalog::default()
            .with_models("us-east-1", &[SONNET])
            .with_models("us-west-2", &[NOVA_LITE]),
    );
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery.scan_default_regions(false).await;

    assert_eq!(report.refreshed, vec!["us-east-1", "us-west-2"]);
    assert_eq!(discovery.get_model_regions(NOVA_LITE), vec!["us-west-2"]);
}

// =============================================================================
// Partial failure
// =============================================================================

#[tokio::test]
async fn failing_region_is_skipped() {
    let catalog = Arc::new(
        MockCatalog::default()
            .with_models("us-east-1", &[SONNET])
            .failing("us-west-2"),
    );
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery
        .scan_regions(&["us-east-1", "us-west-2"], false)
        .await;

    assert_eq!(report.refreshed, vec!["us-east-1"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].region, "us-west-2");
    assert!(report.failures[0].error.is_transient());
    assert!(!report.failures[0].is_access_denied());
    assert!(!report.cache.models.contains_key("us-west-2"));
}

#[tokio::test]
async fn access_denied_is_distinguishable() {
    let catalog = Arc::new(
        MockCatalog::default()
            .with_models("us-east-1", &[SONNET])
            .denied("us-west-2"),
    );
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery
        .scan_regions(&["us-east-1", "us-west-2"], false)
        .await;

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].is_access_denied());
    assert!(!report.failures[0].error.is_transient());
}

#[tokio::test]
async fn all_regions_failing_leaves_empty_expired_cache() {
    let catalog = Arc::new(MockCatalog::default().failing("us-east-1").denied("us-west-2"));
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery
        .scan_regions(&["us-east-1", "us-west-2"], false)
        .await;

    assert!(report.refreshed.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert!(report.cache.models.is_empty());
    assert!(discovery.is_cache_expired());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_region_data() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET]));
    let cache = Arc::new(ModelCache::new());
    let discovery = ModelDiscovery::with_cache(Arc::clone(&cache), catalog, test_config());
    discovery.scan_regions(&["us-east-1"], false).await;

    let broken = Arc::new(MockCatalog::default().failing("us-east-1"));
    let discovery = ModelDiscovery::with_cache(Arc::clone(&cache), broken, test_config());
    let report = discovery.scan_regions(&["us-east-1"], true).await;

    assert_eq!(report.failures.len(), 1);
    assert!(cache.get("us-east-1", SONNET).is_some());
}

#[tokio::test(start_paused = true)]
async fn slow_region_times_out() {
    let catalog = Arc::new(
        MockCatalog::default()
            .with_models("us-east-1", &[SONNET])
            .slow("us-west-2"),
    );
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery
        .scan_regions(&["us-east-1", "us-west-2"], false)
        .await;

    assert_eq!(report.refreshed, vec!["us-east-1"]);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures[0].error,
        DiscoveryError::Timeout { ref region, .. } if region == "us-west-2"
    ));
}

// =============================================================================
// Profiles during scan
// =============================================================================

#[tokio::test]
async fn scan_associates_region_profiles() {
    let profile = InferenceProfileRecord::new("us.amazon.nova-lite-v1:0").with_model_arn(
        "arn:aws:bedrock:us-east-1::foundation-model/amazon.nova-lite-v1:0",
    );
    let catalog = Arc::new(
        MockCatalog::default()
            .with_models("us-east-1", &[NOVA_LITE])
            .with_profiles("us-east-1", vec![profile, InferenceProfileRecord::default()]),
    );
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery.scan_regions(&["us-east-1"], false).await;

    assert_eq!(report.association.attached, 1);
    assert_eq!(report.association.malformed(), 1);
    assert_eq!(
        discovery.get_inference_profile_ids(NOVA_LITE, Some("us-east-1")),
        vec!["us.amazon.nova-lite-v1:0"]
    );
}

#[tokio::test]
async fn profile_listing_failure_keeps_models() {
    let mut catalog = MockCatalog::default().with_models("us-east-1", &[NOVA_LITE]);
    catalog.profiles_fail = true;
    let catalog = Arc::new(catalog);
    let discovery = discovery(Arc::clone(&catalog));

    let report = discovery.scan_regions(&["us-east-1"], false).await;

    assert!(report.failures.is_empty());
    assert!(discovery.is_model_available_in_region(NOVA_LITE, "us-east-1"));
    assert!(discovery.get_inference_profile_ids(NOVA_LITE, None).is_empty());
}

#[tokio::test]
async fn profiles_not_listed_when_disabled() {
    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[NOVA_LITE]));
    let discovery = ModelDiscovery::new(
        Arc::clone(&catalog) as Arc<dyn ModelCatalog>,
        test_config().include_profiles(false),
    );

    discovery.scan_regions(&["us-east-1"], false).await;

    assert_eq!(catalog.profile_calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Availability and ranking
// =============================================================================

fn seeded(latencies: &[(&str, f64)], config: DiscoveryConfig) -> ModelDiscovery {
    let cache = Arc::new(ModelCache::new());
    for (region, latency) in latencies {
        cache.set_region_models(region, [ModelRecord::new(SONNET, "Anthropic")]);
        cache.set_latency(region, *latency);
    }
    ModelDiscovery::with_cache(cache, Arc::new(MockCatalog::default()), config)
}

#[test]
fn best_regions_preferred_first_then_latency() {
    let discovery = seeded(&[("A", 50.0), ("B", 10.0), ("C", 30.0)], test_config());

    assert_eq!(
        discovery.get_best_regions_for_model(SONNET, &["C"]),
        vec!["C", "B", "A"]
    );
}

#[test]
fn best_regions_without_preference_sort_by_latency() {
    let discovery = seeded(&[("A", 50.0), ("B", 10.0), ("C", 30.0)], test_config());

    assert_eq!(
        discovery.get_best_regions_for_model(SONNET, &[]),
        vec!["B", "C", "A"]
    );
}

#[test]
fn best_regions_ignore_unavailable_preferences() {
    let discovery = seeded(&[("A", 50.0), ("B", 10.0)], test_config());

    assert_eq!(
        discovery.get_best_regions_for_model(SONNET, &["Z", "A", "A"]),
        vec!["A", "B"]
    );
}

#[test]
fn best_regions_put_unsampled_regions_last() {
    let discovery = seeded(&[("A", 50.0)], test_config());
    discovery
        .cache()
        .set_region_models("B", [ModelRecord::new(SONNET, "Anthropic")]);

    assert_eq!(
        discovery.get_best_regions_for_model(SONNET, &[]),
        vec!["A", "B"]
    );
}

#[test]
fn best_regions_fall_back_to_configured_preference() {
    let discovery = seeded(
        &[("A", 50.0), ("B", 10.0), ("C", 30.0)],
        test_config().preferred_regions(["A"]),
    );

    assert_eq!(
        discovery.get_best_regions_for_model(SONNET, &[]),
        vec!["A", "B", "C"]
    );
    // Explicit preference wins over configuration
    assert_eq!(
        discovery.get_best_regions_for_model(SONNET, &["C"]),
        vec!["C", "B", "A"]
    );
}

#[test]
fn best_regions_empty_for_unknown_model() {
    let discovery = seeded(&[("A", 50.0)], test_config());
    assert!(discovery
        .get_best_regions_for_model("meta.llama3-8b-instruct-v1:0", &["A"])
        .is_empty());
}

#[test]
fn inaccessible_models_are_not_available() {
    let discovery = seeded(&[("A", 50.0), ("B", 10.0)], test_config());
    discovery.cache().set_region_models(
        "B",
        [ModelRecord::new(SONNET, "Anthropic").with_accessible(false)],
    );

    assert!(discovery.is_model_available_in_region(SONNET, "A"));
    assert!(!discovery.is_model_available_in_region(SONNET, "B"));
    assert!(!discovery.is_model_available_in_region(SONNET, "nowhere"));
    // Still listed as a region where the model exists
    assert_eq!(discovery.get_model_regions(SONNET), vec!["A", "B"]);
    assert_eq!(discovery.get_best_regions_for_model(SONNET, &[]), vec!["A"]);
}

// =============================================================================
// Builder and persistence
// =============================================================================

#[tokio::test]
async fn builder_loads_persisted_cache_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("bedrock_models.json");
    let config = test_config().cache_path(&path);

    let catalog = Arc::new(MockCatalog::default().with_models("us-east-1", &[SONNET]));
    let first = ModelDiscovery::builder()
        .config(config.clone())
        .catalog(catalog)
        .build()
        .unwrap();
    first.scan_regions(&["us-east-1"], false).await;
    assert!(first.persist());

    let empty_catalog = Arc::new(MockCatalog::default());
    let second = ModelDiscovery::builder()
        .config(config)
        .catalog(Arc::clone(&empty_catalog) as Arc<dyn ModelCatalog>)
        .build()
        .unwrap();

    assert!(second.is_model_available_in_region(SONNET, "us-east-1"));
    // Loaded cache is fresh, so a scan of the same region is served from it
    let report = second.scan_regions(&["us-east-1"], false).await;
    assert!(report.from_cache());
    assert_eq!(empty_catalog.model_calls(), 0);
}

#[tokio::test]
async fn reload_of_stale_file_keeps_fresh_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bedrock_models.json");
    let stale = ModelCache::new();
    stale.set_region_models("us-east-1", [ModelRecord::new(SONNET, "Anthropic")]);
    stale.set_last_updated(
        bedrock_discovery::MODELS_CATEGORY,
        bedrock_discovery::cache::now_unix() - 10.0 * 86_400.0,
    );
    assert!(stale.save(&path));

    let discovery = ModelDiscovery::builder()
        .config(test_config().cache_path(&path))
        .catalog(Arc::new(MockCatalog::default().with_models("us-east-1", &[NOVA_LITE])))
        .load_persisted(false)
        .build()
        .unwrap();
    discovery.scan_regions(&["us-east-1"], true).await;
    assert!(!discovery.is_cache_expired());

    assert!(discovery.reload());

    assert!(!discovery.is_cache_expired());
    assert!(discovery.is_model_available_in_region(NOVA_LITE, "us-east-1"));
    assert!(discovery.get_model_regions(SONNET).is_empty());
}

#[test]
fn builder_without_persisted_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let discovery = ModelDiscovery::builder()
        .config(test_config().cache_path(dir.path().join("missing.json")))
        .catalog(Arc::new(MockCatalog::default()))
        .build()
        .unwrap();

    assert!(discovery.cache().snapshot().models.is_empty());
    assert!(!discovery.reload());
}

#[test]
fn builder_can_skip_persisted_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bedrock_models.json");
    let seeded = ModelCache::new();
    seeded.set_region_models("us-east-1", [ModelRecord::new(SONNET, "Anthropic")]);
    assert!(seeded.save(&path));

    let discovery = ModelDiscovery::builder()
        .config(test_config().cache_path(&path))
        .catalog(Arc::new(MockCatalog::default()))
        .load_persisted(false)
        .build()
        .unwrap();

    assert!(discovery.get_model_regions(SONNET).is_empty());
}
