use serde::Serialize;
use std::fmt;

use crate::models::{MatchResult, Tier};

/// Statistics for one priority tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierSummary {
    pub tier: Tier,
    pub count: usize,
    /// Mean over matches with a defined distance
    pub avg_distance: Option<f64>,
    /// Mean of the lower rate bound over matches with a known rate
    pub avg_rate: Option<f64>,
    pub closest: Option<String>,
}

/// Counts and averages over a ranked list, one entry per tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub total: usize,
    pub tiers: Vec<TierSummary>,
}

impl MatchSummary {
    pub fn tier(&self, tier: Tier) -> Option<&TierSummary> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn summarize(matches: &[MatchResult<'_>]) -> MatchSummary {
    let tiers = Tier::ALL
        .iter()
        .map(|&tier| {
            let in_tier: Vec<&MatchResult<'_>> = matches.iter().filter(|m| m.tier == tier).collect();

            // Ranked input puts the nearest defined distance first
            let closest = in_tier
                .iter()
                .find(|m| m.distance_miles.is_some())
                .map(|m| m.name().to_string());

            TierSummary {
                tier,
                count: in_tier.len(),
                avg_distance: mean(in_tier.iter().filter_map(|m| m.distance_miles)),
                avg_rate: mean(in_tier.iter().filter_map(|m| m.community.monthly_rate.map(|r| r.min))),
                closest,
            }
        })
        .collect();

    MatchSummary {
        total: matches.len(),
        tiers,
    }
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} matches", self.total)?;
        for t in &self.tiers {
            write!(f, "; {} ({}): {}", t.tier, t.tier.description(), t.count)?;
            if let Some(d) = t.avg_distance {
                write!(f, ", avg {:.1} mi", d)?;
            }
        }
        Ok(())
    }
}
