//! Model catalog collaborators.
//!
//! A [`ModelCatalog`] answers two per-region questions: which foundation
//! models exist, and which inference profiles exist. Discovery treats it as a
//! black box; [`BedrockHttpCatalog`] talks to the real Bedrock control plane,
//! tests plug in their own implementations.

mod bedrock;

pub use bedrock::{BEARER_TOKEN_ENV, BedrockHttpCatalog, DEFAULT_ENDPOINT_TEMPLATE};

use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;
use crate::types::{
    CAPABILITY_INFERENCE_PROFILE, CAPABILITY_ON_DEMAND, CAPABILITY_PROVISIONED,
    CAPABILITY_STREAMING, InferenceProfileRecord, ModelRecord,
};

/// Source of per-region model and inference-profile listings.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Catalog name for logs.
    fn name(&self) -> &str;

    /// List the foundation models offered in `region`.
    async fn list_foundation_models(&self, region: &str) -> Result<Vec<FoundationModelSummary>>;

    /// List the inference profiles visible in `region`.
    async fn list_inference_profiles(&self, region: &str)
    -> Result<Vec<InferenceProfileRecord>>;
}

/// One entry of a foundation-model listing (Bedrock `modelSummaries`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundationModelSummary {
    pub model_id: String,
    #[serde(default)]
    pub model_arn: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub inference_types_supported: Vec<String>,
    #[serde(default)]
    pub response_streaming_supported: Option<bool>,
    #[serde(default)]
    pub model_lifecycle: Option<ModelLifecycle>,
    /// Access flag from catalogs that can check invocation rights. Bedrock's
    /// listing does not report one.
    #[serde(default)]
    pub accessible: Option<bool>,
}

/// Lifecycle block of a model summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelLifecycle {
    #[serde(default)]
    pub status: Option<String>,
}

impl FoundationModelSummary {
    /// Minimal summary, mostly for tests and static catalogs.
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            provider_name: Some(provider.into()),
            inference_types_supported: vec!["ON_DEMAND".to_string()],
            ..Default::default()
        }
    }

    /// Replace the supported inference types.
    pub fn with_inference_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inference_types_supported = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the access flag.
    pub fn with_accessible(mut self, accessible: bool) -> Self {
        self.accessible = Some(accessible);
        self
    }

    /// Convert into a cache record.
    ///
    /// Inference types become capability strings; a model that supports
    /// `INFERENCE_PROFILE` but not `ON_DEMAND` requires a profile.
    pub fn into_model_record(self) -> ModelRecord {
        let mut record = ModelRecord::new(&self.model_id, self.provider_name.unwrap_or_default());
        record.model_name = self.model_name.unwrap_or_else(|| self.model_id.clone());

        for inference_type in &self.inference_types_supported {
            record
                .capabilities
                .insert(inference_type_capability(inference_type));
        }
        if self.response_streaming_supported == Some(true) {
            record.capabilities.insert(CAPABILITY_STREAMING.to_string());
        }

        record.requires_inference_profile = record.has_capability(CAPABILITY_INFERENCE_PROFILE)
            && !record.has_capability(CAPABILITY_ON_DEMAND);
        record.accessible = self.accessible.unwrap_or(true);
        record.lifecycle_status = self.model_lifecycle.and_then(|l| l.status);
        record.model_arn = self.model_arn;
        record
    }
}

/// Map a Bedrock inference type to a capability string.
fn inference_type_capability(inference_type: &str) -> String {
    match inference_type {
        "ON_DEMAND" => CAPABILITY_ON_DEMAND.to_string(),
        "PROVISIONED" => CAPABILITY_PROVISIONED.to_string(),
        "INFERENCE_PROFILE" => CAPABILITY_INFERENCE_PROFILE.to_string(),
        other => other.to_ascii_lowercase().replace('_', "-"),
    }
}
