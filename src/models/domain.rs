use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::community::CommunityRecord;

/// Geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Priority class derived from the business relationship with a community
///
/// Ordering follows the numeric level, so `Tier::One < Tier::Three`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::One, Tier::Two, Tier::Three];

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Tier::One => "Contracted rates",
            Tier::Two => "Placement partner",
            Tier::Three => "Other",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier {}", self.level())
    }
}

/// A community that passed eligibility, with its ranking annotations
///
/// Borrows the catalog record; nothing here mutates the catalog.
#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub community: &'a CommunityRecord,
    /// Position of the community in the catalog it was loaded from
    pub catalog_index: usize,
    pub tier: Tier,
    /// Miles to the closest preferred location, `None` when unresolvable
    pub distance_miles: Option<f64>,
    /// 1-based position inside the tier, assigned by the ranker
    pub rank_within_tier: usize,
    pub explanation: String,
}

impl<'a> MatchResult<'a> {
    pub fn new(
        community: &'a CommunityRecord,
        catalog_index: usize,
        tier: Tier,
        distance_miles: Option<f64>,
    ) -> Self {
        Self {
            community,
            catalog_index,
            tier,
            distance_miles,
            rank_within_tier: 0,
            explanation: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.community.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::One < Tier::Two);
        assert!(Tier::Two < Tier::Three);
        assert_eq!(Tier::Three.level(), 3);
        assert_eq!(Tier::One.to_string(), "Tier 1");
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(43.1566, -77.6088).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }
}
