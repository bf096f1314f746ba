//! Bedrock control-plane catalog over HTTPS.
//!
//! Uses the REST endpoints behind `ListFoundationModels` and
//! `ListInferenceProfiles`:
//!
//! - `GET {endpoint}/foundation-models`
//! - `GET {endpoint}/inference-profiles?maxResults=..&nextToken=..`
//!
//! where `{endpoint}` is the template with `{region}` substituted. Requests
//! authenticate with a Bedrock API key sent as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{FoundationModelSummary, ModelCatalog};
use crate::types::InferenceProfileRecord;
use crate::{DiscoveryError, Result};

/// Endpoint template for the Bedrock control plane.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://bedrock.{region}.amazonaws.com";

/// Environment variable holding the Bedrock API key.
pub const BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Page size for profile listings.
const PROFILE_PAGE_SIZE: u32 = 1000;

/// Upper bound on profile pages per region.
const MAX_PROFILE_PAGES: usize = 50;

/// Catalog backed by the Bedrock REST API.
#[derive(Clone)]
pub struct BedrockHttpCatalog {
    http: Client,
    token: Option<String>,
    endpoint_template: String,
}

impl BedrockHttpCatalog {
    /// Create a catalog for the public Bedrock endpoints.
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_endpoint_template(token, DEFAULT_ENDPOINT_TEMPLATE)
    }

    /// Create a catalog using the API key from [`BEARER_TOKEN_ENV`], if set.
    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var(BEARER_TOKEN_ENV).ok())
    }

    /// Create a catalog with a custom endpoint template (for testing with wiremock).
    ///
    /// `{region}` in the template is replaced by the region being listed.
    pub fn with_endpoint_template(
        token: Option<String>,
        endpoint_template: impl Into<String>,
    ) -> Result<Self> {
        // The scan applies its own per-region timeout; this one only guards
        // direct callers.
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| DiscoveryError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            token,
            endpoint_template: endpoint_template.into(),
        })
    }

    fn endpoint(&self, region: &str) -> String {
        self.endpoint_template
            .replace("{region}", region)
            .trim_end_matches('/')
            .to_string()
    }

    async fn get(&self, region: &str, url: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DiscoveryError::Http(e.to_string()))?;
        check_status(response, region).await
    }
}

#[async_trait]
impl ModelCatalog for BedrockHttpCatalog {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn list_foundation_models(&self, region: &str) -> Result<Vec<FoundationModelSummary>> {
        let url = format!("{}/foundation-models", self.endpoint(region));
        let response = self.get(region, &url, &[]).await?;
        let body: FoundationModelsResponse = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Http(e.to_string()))?;
        debug!(region, count = body.model_summaries.len(), "listed foundation models");
        Ok(body.model_summaries)
    }

    async fn list_inference_profiles(&self, region: &str) -> Result<Vec<InferenceProfileRecord>> {
        let url = format!("{}/inference-profiles", self.endpoint(region));
        let mut profiles = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PROFILE_PAGES {
            let mut query = vec![("maxResults", PROFILE_PAGE_SIZE.to_string())];
            if let Some(token) = next_token.take() {
                query.push(("nextToken", token));
            }
            let response = self.get(region, &url, &query).await?;
            let page: InferenceProfilesResponse = response
                .json()
                .await
                .map_err(|e| DiscoveryError::Http(e.to_string()))?;
            profiles.extend(page.inference_profile_summaries);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        debug!(region, count = profiles.len(), "listed inference profiles");
        Ok(profiles)
    }
}

/// Map non-success statuses onto discovery errors.
async fn check_status(response: reqwest::Response, region: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs);
    let message = error_message(response).await;

    match status.as_u16() {
        401 | 403 => Err(DiscoveryError::AccessDenied {
            region: region.to_string(),
            message,
        }),
        429 => Err(DiscoveryError::Throttled { retry_after }),
        code => Err(DiscoveryError::Api {
            status: code,
            message,
        }),
    }
}

/// Extract AWS's `{"message": ...}` error body, falling back to raw text.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("Bedrock API error: {status}")
            } else {
                body
            }
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundationModelsResponse {
    #[serde(default)]
    model_summaries: Vec<FoundationModelSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InferenceProfilesResponse {
    #[serde(default)]
    inference_profile_summaries: Vec<InferenceProfileRecord>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "Message")]
    message: Option<String>,
}
