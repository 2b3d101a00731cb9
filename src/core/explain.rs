use crate::models::{MatchResult, PreferenceRecord};
use crate::services::{ExplanationGenerator, ExplanationRequest};

/// Fill in explanations for the first `limit` matches
///
/// A failed or blank explanation leaves that match's text empty and the
/// remaining matches are still explained. Returns how many succeeded.
pub async fn explain_matches<G: ExplanationGenerator>(
    generator: &G,
    preferences: &PreferenceRecord,
    matches: &mut [MatchResult<'_>],
    limit: usize,
) -> usize {
    let mut explained = 0;

    for m in matches.iter_mut().take(limit) {
        let request = ExplanationRequest {
            preferences,
            community: m.community,
            tier: m.tier,
            distance_miles: m.distance_miles,
        };

        match generator.explain(&request).await {
            Ok(text) if !text.trim().is_empty() => {
                m.explanation = text.trim().to_string();
                explained += 1;
            }
            Ok(_) => {
                tracing::warn!("Empty explanation for {}", m.name());
                m.explanation.clear();
            }
            Err(e) => {
                tracing::warn!("Could not generate explanation for {}: {}", m.name(), e);
                m.explanation.clear();
            }
        }
    }

    explained
}
