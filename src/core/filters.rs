use std::fmt;

use crate::models::{CareLevel, CommunityRecord, PreferenceRecord};

/// Why a community was left out of the eligible set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExclusionReason {
    MissingName,
    MissingCareLevels,
    CareLevelNotOffered(CareLevel),
    EnhancedUnavailable,
    EnrichedUnavailable,
    MissingRate,
    OverBudget { min_rate: f64, budget: f64 },
}

impl ExclusionReason {
    /// Data-quality problems with the catalog row, as opposed to a poor fit
    pub fn is_data_issue(&self) -> bool {
        matches!(
            self,
            ExclusionReason::MissingName | ExclusionReason::MissingCareLevels | ExclusionReason::MissingRate
        )
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::MissingName => f.write_str("community name is missing"),
            ExclusionReason::MissingCareLevels => f.write_str("type of service is missing"),
            ExclusionReason::CareLevelNotOffered(level) => write!(f, "does not offer {}", level),
            ExclusionReason::EnhancedUnavailable => f.write_str("enhanced care not available"),
            ExclusionReason::EnrichedUnavailable => f.write_str("enriched care not available"),
            ExclusionReason::MissingRate => f.write_str("monthly fee is missing"),
            ExclusionReason::OverBudget { min_rate, budget } => {
                write!(f, "minimum rate {:.0} exceeds budget {:.0}", min_rate, budget)
            }
        }
    }
}

/// Diagnostic for one excluded catalog row
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub catalog_index: usize,
    pub name: Option<String>,
    pub reason: ExclusionReason,
}

/// Outcome of running the eligibility filter over a catalog
#[derive(Debug, Clone)]
pub struct EligibilityReport<'a> {
    /// Eligible communities with their catalog index, in catalog order
    pub eligible: Vec<(usize, &'a CommunityRecord)>,
    pub exclusions: Vec<Exclusion>,
}

impl EligibilityReport<'_> {
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }
}

/// Check a single community against the client's hard constraints
///
/// The first failing constraint is reported. Data gaps are checked before
/// fit so a broken row is reported as broken.
pub fn check_eligibility(
    community: &CommunityRecord,
    preferences: &PreferenceRecord,
) -> Result<(), ExclusionReason> {
    if community.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        return Err(ExclusionReason::MissingName);
    }

    if community.care_levels.is_empty() {
        return Err(ExclusionReason::MissingCareLevels);
    }

    // An unspecified care level places no constraint
    if let Some(level) = preferences.care_level {
        if !community.offers(level) {
            return Err(ExclusionReason::CareLevelNotOffered(level));
        }
    }

    if preferences.enhanced_needed && !community.enhanced {
        return Err(ExclusionReason::EnhancedUnavailable);
    }

    if preferences.enriched_needed && !community.enriched {
        return Err(ExclusionReason::EnrichedUnavailable);
    }

    // Missing budget means no budget constraint
    if let Some(budget) = preferences.monthly_budget {
        let rate = community.monthly_rate.ok_or(ExclusionReason::MissingRate)?;
        if rate.min > budget {
            return Err(ExclusionReason::OverBudget {
                min_rate: rate.min,
                budget,
            });
        }
    }

    Ok(())
}

/// Split a catalog into eligible communities and exclusion diagnostics
pub fn filter_eligible<'a>(
    preferences: &PreferenceRecord,
    communities: &'a [CommunityRecord],
) -> EligibilityReport<'a> {
    let mut eligible = Vec::new();
    let mut exclusions = Vec::new();

    for (catalog_index, community) in communities.iter().enumerate() {
        match check_eligibility(community, preferences) {
            Ok(()) => eligible.push((catalog_index, community)),
            Err(reason) => {
                tracing::debug!(
                    "Excluding catalog row {} ({}): {}",
                    catalog_index,
                    community.display_name(),
                    reason
                );
                exclusions.push(Exclusion {
                    catalog_index,
                    name: community.name.clone(),
                    reason,
                });
            }
        }
    }

    let data_issues = exclusions.iter().filter(|e| e.reason.is_data_issue()).count();
    if data_issues > 0 {
        tracing::debug!("{} catalog rows excluded for missing fields", data_issues);
    }

    EligibilityReport { eligible, exclusions }
}
