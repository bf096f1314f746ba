//! Foundation model records as observed in one region.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::profile::InferenceProfileRecord;

/// Capability string for on-demand invocation.
pub const CAPABILITY_ON_DEMAND: &str = "on-demand";
/// Capability string for provisioned-throughput invocation.
pub const CAPABILITY_PROVISIONED: &str = "provisioned";
/// Capability string for invocation through an inference profile.
pub const CAPABILITY_INFERENCE_PROFILE: &str = "inference-profile";
/// Capability string for streaming responses.
pub const CAPABILITY_STREAMING: &str = "streaming";

/// One foundation model as observed in one region.
///
/// Records are replaced wholesale when a region is rescanned, and only
/// enriched (with [`referenced_by_instance_profiles`](Self::referenced_by_instance_profiles))
/// by the profile association pass before they land in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Vendor-qualified model identifier, e.g. `anthropic.claude-3-5-sonnet-20240620-v1:0`.
    #[serde(default)]
    pub model_id: String,
    /// Provider name (e.g. "Anthropic", "Amazon").
    #[serde(default)]
    pub provider: String,
    /// Human-readable model name.
    #[serde(default)]
    pub model_name: String,
    /// Capability strings such as `"on-demand"` or `"provisioned"`.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Whether the model can only be invoked through an inference profile.
    #[serde(default)]
    pub requires_inference_profile: bool,
    /// Whether the caller's identity can invoke the model. Defaults to `true`
    /// so only an explicit `false` marks an access problem.
    #[serde(default = "default_accessible")]
    pub accessible: bool,
    /// Lifecycle status reported by the catalog (e.g. "ACTIVE", "LEGACY").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<String>,
    /// Full model ARN, when the catalog reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_arn: Option<String>,
    /// Inference profiles referencing this model, unique by profile id.
    #[serde(default)]
    pub referenced_by_instance_profiles: Vec<InferenceProfileRecord>,
}

fn default_accessible() -> bool {
    true
}

impl ModelRecord {
    /// Create a record with required fields.
    pub fn new(model_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
            model_name: String::new(),
            capabilities: BTreeSet::new(),
            requires_inference_profile: false,
            accessible: true,
            lifecycle_status: None,
            model_arn: None,
            referenced_by_instance_profiles: Vec::new(),
        }
    }

    /// Set the human-readable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Add a capability string.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    /// Mark whether the model requires an inference profile.
    pub fn with_requires_inference_profile(mut self, required: bool) -> Self {
        self.requires_inference_profile = required;
        self
    }

    /// Mark whether the caller can invoke the model.
    pub fn with_accessible(mut self, accessible: bool) -> Self {
        self.accessible = accessible;
        self
    }

    /// Whether the model supports a capability.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether a profile with this id is already embedded.
    pub fn references_profile(&self, profile_id: &str) -> bool {
        self.referenced_by_instance_profiles
            .iter()
            .any(|p| p.id() == Some(profile_id))
    }

    /// Ids of the embedded inference profiles, in embedding order.
    pub fn profile_ids(&self) -> Vec<String> {
        self.referenced_by_instance_profiles
            .iter()
            .filter_map(|p| p.id().map(str::to_string))
            .collect()
    }

    /// Embed a profile unless one with the same id is already present.
    ///
    /// Returns `false` when the profile has no id or is a duplicate.
    pub fn embed_profile(&mut self, profile: &InferenceProfileRecord) -> bool {
        let Some(id) = profile.id() else {
            return false;
        };
        if self.references_profile(id) {
            return false;
        }
        self.referenced_by_instance_profiles.push(profile.clone());
        true
    }
}

/// Strip a trailing `:version` suffix from a model id.
///
/// Everything from the first `:` on is dropped, so
/// `anthropic.claude-3-haiku-20240307-v1:0:200k` becomes
/// `anthropic.claude-3-haiku-20240307-v1`.
pub fn base_model_id(model_id: &str) -> &str {
    match model_id.split_once(':') {
        Some((base, _)) => base,
        None => model_id,
    }
}
