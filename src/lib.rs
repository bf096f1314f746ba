//! bedrock-discovery - Bedrock model, region and inference-profile discovery
//!
//! This crate keeps a cache of which AWS Bedrock foundation models exist in
//! which regions, which inference profiles reference them, and how fast each
//! region answers. Request-formatting code asks it for the best region and an
//! optional inference profile before invoking a model; an empty answer means
//! "invoke on demand in the default region".
//!
//! # Example
//!
//! ```rust,no_run
//! use bedrock_discovery::{DiscoveryConfig, ModelDiscovery};
//!
//! #[tokio::main]
//! async fn main() -> bedrock_discovery::Result<()> {
//!     let discovery = ModelDiscovery::builder()
//!         .config(DiscoveryConfig::load(None)?)
//!         .build()?;
//!
//!     if discovery.is_cache_expired() {
//!         discovery.scan_default_regions(false).await;
//!         discovery.persist();
//!     }
//!
//!     let model = "anthropic.claude-3-5-sonnet-20240620-v1:0";
//!     let regions = discovery.get_best_regions_for_model(model, &["us-west-2"]);
//!     let profiles = discovery.get_inference_profile_ids(model, regions.first().map(String::as_str));
//!     println!("regions: {regions:?}, profiles: {profiles:?}");
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod telemetry;
pub mod types;
pub mod version;

pub use cache::{MODELS_CATEGORY, ModelCache, RegionCache};
pub use catalog::{BedrockHttpCatalog, FoundationModelSummary, ModelCatalog};
pub use config::{CACHE_TTL_SECONDS, DiscoveryConfig};
pub use discovery::{
    AccessIssue, AssociationReport, DiscoveryBuilder, ModelDiscovery, ModelProfileMapping,
    RegionFailure, ScanReport, SkipReason, associate_profiles_with_models,
    filter_profiles_by_model, get_model_ids_from_profile, supports_prompt_caching,
};
pub use error::{DiscoveryError, Result};
pub use types::{InferenceProfileRecord, ModelRecord, ModelReference, base_model_id};
pub use version::{PKG_VERSION, version_string};
