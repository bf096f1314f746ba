//! Profile association: cross-reference inference profiles with model records.
//!
//! Pure functions with no stored state. Parsing is lenient: a profile without
//! an id, or a model reference whose ARN has no `/`, is skipped and recorded
//! in the returned [`AssociationReport`] instead of failing the whole pass.

use std::collections::BTreeMap;

use crate::types::{InferenceProfileRecord, ModelRecord, base_model_id};

/// Why a profile or model reference was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The profile has no `inferenceProfileId`.
    MissingProfileId,
    /// A model reference ARN has no `/`-separated model id.
    MalformedArn(String),
    /// The derived model id matches no record in the model map.
    UnknownModel(String),
}

impl SkipReason {
    /// Metric label for this reason.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingProfileId => "missing_profile_id",
            Self::MalformedArn(_) => "malformed_arn",
            Self::UnknownModel(_) => "unknown_model",
        }
    }
}

/// One skipped profile or model reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedReference {
    pub profile_id: Option<String>,
    pub reason: SkipReason,
}

/// Diagnostics from an association pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationReport {
    /// Profiles newly embedded onto model records.
    pub attached: usize,
    /// References that could not be associated.
    pub skipped: Vec<SkippedReference>,
}

impl AssociationReport {
    fn skip(&mut self, profile_id: Option<&str>, reason: SkipReason) {
        self.skipped.push(SkippedReference {
            profile_id: profile_id.map(str::to_string),
            reason,
        });
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: AssociationReport) {
        self.attached += other.attached;
        self.skipped.extend(other.skipped);
    }

    /// Count of skipped references with a malformed ARN or missing id.
    pub fn malformed(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| !matches!(s.reason, SkipReason::UnknownModel(_)))
            .count()
    }
}

/// Embed every profile onto the records its model ARNs point at.
///
/// `models` is keyed by model id. Each ARN's model id (the segment after the
/// last `/`) is matched by exact equality, and a profile is appended to a
/// record only if no profile with the same id is already there, so repeated
/// passes are idempotent.
pub fn associate_profiles_with_models(
    models: &mut BTreeMap<String, ModelRecord>,
    profiles: &[InferenceProfileRecord],
) -> AssociationReport {
    let mut report = AssociationReport::default();

    for profile in profiles {
        let Some(profile_id) = profile.id() else {
            report.skip(None, SkipReason::MissingProfileId);
            continue;
        };

        for reference in &profile.models {
            let Some(model_id) = reference.model_id() else {
                report.skip(
                    Some(profile_id),
                    SkipReason::MalformedArn(reference.model_arn.clone()),
                );
                continue;
            };
            match models.get_mut(model_id) {
                Some(record) => {
                    if record.embed_profile(profile) {
                        report.attached += 1;
                    }
                }
                None => report.skip(
                    Some(profile_id),
                    SkipReason::UnknownModel(model_id.to_string()),
                ),
            }
        }
    }

    report
}

/// Whether `candidate` names `model_id`, exactly or by its base id.
fn matches_model(candidate: &str, model_id: &str) -> bool {
    candidate == model_id || candidate == base_model_id(model_id)
}

/// Profiles that reference `model_id`.
///
/// A profile matches when its direct `model_id` field, or any model id
/// derived from its ARNs, equals `model_id` or the base id of `model_id`
/// (the part before the first `:`).
pub fn filter_profiles_by_model<'a>(
    profiles: &'a [InferenceProfileRecord],
    model_id: &str,
) -> Vec<&'a InferenceProfileRecord> {
    profiles
        .iter()
        .filter(|profile| {
            profile
                .model_id
                .as_deref()
                .is_some_and(|direct| matches_model(direct, model_id))
                || profile
                    .models
                    .iter()
                    .filter_map(|r| r.model_id())
                    .any(|derived| matches_model(derived, model_id))
        })
        .collect()
}

/// Every model id a profile names: its direct field first, then ARN-derived
/// ids, deduplicated in order of first appearance.
pub fn get_model_ids_from_profile(profile: &InferenceProfileRecord) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let candidates = profile
        .model_id
        .as_deref()
        .into_iter()
        .chain(profile.models.iter().filter_map(|r| r.model_id()));
    for id in candidates {
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOVA_LITE: &str = "amazon.nova-lite-v1:0";
    const NOVA_LITE_ARN: &str = "arn:aws:bedrock:us-east-1::foundation-model/amazon.nova-lite-v1:0";

    fn models(ids: &[&str]) -> BTreeMap<String, ModelRecord> {
        ids.iter()
            .map(|id| (id.to_string(), ModelRecord::new(*id, "test")))
            .collect()
    }

    #[test]
    fn attaches_profile_via_arn() {
        let mut map = models(&[NOVA_LITE]);
        let profile = InferenceProfileRecord::new("p1").with_model_arn(NOVA_LITE_ARN);

        let report = associate_profiles_with_models(&mut map, &[profile]);

        assert_eq!(report.attached, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(map[NOVA_LITE].profile_ids(), vec!["p1"]);
    }

    #[test]
    fn skips_missing_id_and_malformed_arn() {
        let mut map = models(&[NOVA_LITE]);
        let profiles = vec![
            InferenceProfileRecord::default().with_model_arn(NOVA_LITE_ARN),
            InferenceProfileRecord::new("p2").with_model_arn("no-slash-here"),
        ];

        let report = associate_profiles_with_models(&mut map, &profiles);

        assert_eq!(report.attached, 0);
        assert_eq!(report.malformed(), 2);
        assert_eq!(report.skipped[0].reason, SkipReason::MissingProfileId);
        assert_eq!(
            report.skipped[1].reason,
            SkipReason::MalformedArn("no-slash-here".into())
        );
        assert!(map[NOVA_LITE].referenced_by_instance_profiles.is_empty());
    }

    #[test]
    fn unknown_models_are_reported_not_malformed() {
        let mut map = models(&[NOVA_LITE]);
        let profile = InferenceProfileRecord::new("p3")
            .with_model_arn("arn:aws:bedrock:us-east-1::foundation-model/amazon.nova-pro-v1:0");

        let report = associate_profiles_with_models(&mut map, &[profile]);

        assert_eq!(report.malformed(), 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason.label(), "unknown_model");
    }

    #[test]
    fn matches_model_uses_base_id() {
        assert!(matches_model("a.b-v1:0", "a.b-v1:0"));
        assert!(matches_model("a.b-v1", "a.b-v1:0"));
        assert!(!matches_model("a.b-v1:0", "a.b-v1"));
        assert!(!matches_model("a.c-v1", "a.b-v1:0"));
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = AssociationReport {
            attached: 2,
            skipped: vec![],
        };
        a.merge(AssociationReport {
            attached: 1,
            skipped: vec![SkippedReference {
                profile_id: None,
                reason: SkipReason::MissingProfileId,
            }],
        });
        assert_eq!(a.attached, 3);
        assert_eq!(a.skipped.len(), 1);
    }
}
