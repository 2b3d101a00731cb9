use crate::models::{CommunityRecord, RelationshipStatus, Tier};

/// Map a relationship status to its priority tier
///
/// Unknown or missing status is Tier 3, so this never fails.
#[inline]
pub fn classify(status: Option<RelationshipStatus>) -> Tier {
    match status {
        Some(RelationshipStatus::ContractedRate) => Tier::One,
        Some(RelationshipStatus::PlacementPartner) => Tier::Two,
        Some(RelationshipStatus::Other) | None => Tier::Three,
    }
}

#[inline]
pub fn classify_community(community: &CommunityRecord) -> Tier {
    classify(community.relationship)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Some(RelationshipStatus::ContractedRate)), Tier::One);
        assert_eq!(classify(Some(RelationshipStatus::PlacementPartner)), Tier::Two);
        assert_eq!(classify(Some(RelationshipStatus::Other)), Tier::Three);
        assert_eq!(classify(None), Tier::Three);
    }

    #[test]
    fn test_classify_community_without_status() {
        assert_eq!(classify_community(&CommunityRecord::default()), Tier::Three);
    }
}
