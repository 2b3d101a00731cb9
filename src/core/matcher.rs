use crate::core::{
    distance::DistanceAnnotator,
    filters::{filter_eligible, Exclusion},
    priority::classify_community,
    ranker::rank,
};
use crate::models::{Catalog, MatchResult, PreferenceRecord};
use crate::services::Geocoder;

/// Result of one matching run
#[derive(Debug)]
pub struct RankedMatches<'a> {
    pub matches: Vec<MatchResult<'a>>,
    pub exclusions: Vec<Exclusion>,
    pub total_candidates: usize,
}

impl<'a> RankedMatches<'a> {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// The best `n` matches, without re-ranking
    pub fn top(&self, n: usize) -> &[MatchResult<'a>] {
        &self.matches[..n.min(self.matches.len())]
    }
}

/// Main matching orchestrator - runs the ranking pipeline over a catalog
///
/// # Pipeline Stages
/// 1. Eligibility filter (care level, enhanced/enriched, budget)
/// 2. Priority tier from the business relationship
/// 3. Distance to the closest preferred location
/// 4. Stable ranking by tier, then distance
pub struct Matcher<'g, G: Geocoder + ?Sized> {
    geocoder: &'g G,
}

impl<'g, G: Geocoder + ?Sized> Matcher<'g, G> {
    pub fn new(geocoder: &'g G) -> Self {
        Self { geocoder }
    }

    /// Rank the catalog's communities for a client
    ///
    /// # Arguments
    /// * `preferences` - The client's extracted preferences
    /// * `catalog` - Community snapshot for this session
    ///
    /// # Returns
    /// Every eligible community in ranked order, plus exclusion diagnostics.
    /// No eligible community is a valid, empty result.
    pub fn find_matches<'a>(
        &self,
        preferences: &PreferenceRecord,
        catalog: &'a Catalog,
    ) -> RankedMatches<'a> {
        let total_candidates = catalog.len();

        // Stage 1: Hard constraints
        let report = filter_eligible(preferences, catalog.communities());

        // Stage 2 & 3: Tier and distance
        let annotator = DistanceAnnotator::new(self.geocoder, &preferences.preferred_locations);
        let candidates: Vec<MatchResult<'a>> = report
            .eligible
            .iter()
            .map(|&(catalog_index, community)| {
                MatchResult::new(
                    community,
                    catalog_index,
                    classify_community(community),
                    annotator.distance_to(community),
                )
            })
            .collect();

        // Stage 4: Ranking
        let matches = rank(candidates);

        if matches.is_empty() {
            tracing::info!("No matches among {} communities", total_candidates);
        } else {
            tracing::info!(
                "Ranked {} matches from {} communities ({} excluded)",
                matches.len(),
                total_candidates,
                report.exclusions.len()
            );
        }

        RankedMatches {
            matches,
            exclusions: report.exclusions,
            total_candidates,
        }
    }
}
