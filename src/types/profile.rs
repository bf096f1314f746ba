//! Inference profile records.
//!
//! Field names follow the Bedrock wire format (`inferenceProfileId`,
//! `models[].modelArn`), with snake_case aliases accepted on input so that
//! hand-written cache files and fixtures also parse.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A reference from a profile to one underlying model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReference {
    #[serde(default, alias = "model_arn")]
    pub model_arn: String,
}

impl ModelReference {
    pub fn new(model_arn: impl Into<String>) -> Self {
        Self {
            model_arn: model_arn.into(),
        }
    }

    /// Model id derived from the ARN: the path segment after the last `/`.
    ///
    /// Returns `None` for ARNs without a `/` or with nothing after it.
    pub fn model_id(&self) -> Option<&str> {
        match self.model_arn.rsplit_once('/') {
            Some((_, id)) if !id.is_empty() => Some(id),
            _ => None,
        }
    }
}

/// A provisioned-throughput inference profile.
///
/// One profile may reference several models and one model may be referenced
/// by several profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceProfileRecord {
    #[serde(
        default,
        alias = "inference_profile_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub inference_profile_id: Option<String>,
    #[serde(
        default,
        alias = "inference_profile_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub inference_profile_name: Option<String>,
    #[serde(
        default,
        alias = "inference_profile_arn",
        skip_serializing_if = "Option::is_none"
    )]
    pub inference_profile_arn: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Profile type as reported by Bedrock ("SYSTEM_DEFINED" or "APPLICATION").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Direct model id, present on some hand-curated profile records.
    #[serde(default, alias = "model_id", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelReference>,
    #[serde(
        default,
        alias = "provisioned_throughput",
        skip_serializing_if = "Map::is_empty"
    )]
    pub provisioned_throughput: Map<String, Value>,
}

impl InferenceProfileRecord {
    /// Create a profile with only an id.
    pub fn new(inference_profile_id: impl Into<String>) -> Self {
        Self {
            inference_profile_id: Some(inference_profile_id.into()),
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.inference_profile_name = Some(name.into());
        self
    }

    /// Set the status string.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Set the direct model id field.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Add a model ARN reference.
    pub fn with_model_arn(mut self, model_arn: impl Into<String>) -> Self {
        self.models.push(ModelReference::new(model_arn));
        self
    }

    /// Profile id, treating an empty string as missing.
    pub fn id(&self) -> Option<&str> {
        self.inference_profile_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}
