//! Telemetry metric name constants.
//!
//! Centralised metric names for discovery operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bedrock_discovery_`. Counters end in
//! `_total`, histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `region`: AWS region name (e.g. "us-east-1")
//! - `status`: outcome, one of "ok", "error", "timeout" or "access_denied"
//! - `operation`: persistence operation, "save" or "load"

/// Total per-region model listing attempts made during scans.
///
/// Labels: `region`, `status` ("ok" | "error" | "timeout" | "access_denied").
pub const REGION_SCANS_TOTAL: &str = "bedrock_discovery_region_scans_total";

/// Per-region listing duration in seconds (successful listings only).
///
/// Labels: `region`.
pub const REGION_SCAN_DURATION_SECONDS: &str = "bedrock_discovery_region_scan_duration_seconds";

/// Scans answered entirely from the cache, without a catalog call.
pub const SCAN_CACHE_HITS_TOTAL: &str = "bedrock_discovery_scan_cache_hits_total";

/// Inference profile references skipped during association.
///
/// Labels: `reason` ("missing_profile_id" | "malformed_arn" | "unknown_model").
pub const PROFILES_SKIPPED_TOTAL: &str = "bedrock_discovery_profiles_skipped_total";

/// Cache file save/load attempts.
///
/// Labels: `operation` ("save" | "load"), `status` ("ok" | "error").
pub const CACHE_PERSIST_TOTAL: &str = "bedrock_discovery_cache_persist_total";
