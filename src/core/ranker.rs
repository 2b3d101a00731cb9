use std::cmp::Ordering;

use crate::models::{MatchResult, Tier};

/// Distances closer than this compare equal, leaving catalog order to decide
pub const DISTANCE_TOLERANCE_MILES: f64 = 1e-6;

/// Non-finite distances count as undefined
#[inline]
fn defined(distance: Option<f64>) -> Option<f64> {
    distance.filter(|d| d.is_finite())
}

/// Compare two raw distances, undefined sorting after every defined distance
#[inline]
pub fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (defined(a), defined(b)) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[inline]
pub fn compare_matches(a: &MatchResult<'_>, b: &MatchResult<'_>) -> Ordering {
    a.tier
        .cmp(&b.tier)
        .then_with(|| compare_distance(a.distance_miles, b.distance_miles))
        .then_with(|| a.catalog_index.cmp(&b.catalog_index))
}

/// Same tier, and both distances undefined or within tolerance of each other
fn ties_with(anchor: &MatchResult<'_>, other: &MatchResult<'_>) -> bool {
    anchor.tier == other.tier
        && match (defined(anchor.distance_miles), defined(other.distance_miles)) {
            (Some(a), Some(b)) => (b - a).abs() <= DISTANCE_TOLERANCE_MILES,
            (None, None) => true,
            _ => false,
        }
}

/// End of the tie group that starts at `start`
///
/// Groups are measured from their first member, so a group never spans more
/// than the tolerance.
fn tie_group_end(matches: &[MatchResult<'_>], start: usize) -> usize {
    let anchor = &matches[start];
    matches[start + 1..]
        .iter()
        .position(|m| !ties_with(anchor, m))
        .map_or(matches.len(), |offset| start + 1 + offset)
}

/// Order matches by (tier, distance) and number them within each tier
///
/// Matches whose distances differ by at most [`DISTANCE_TOLERANCE_MILES`] are
/// ordered by catalog index, whatever the order they arrive in.
pub fn rank(mut matches: Vec<MatchResult<'_>>) -> Vec<MatchResult<'_>> {
    matches.sort_by(compare_matches);

    let mut start = 0;
    while start < matches.len() {
        let end = tie_group_end(&matches, start);
        matches[start..end].sort_by_key(|m| m.catalog_index);
        start = end;
    }

    let mut current: Option<Tier> = None;
    let mut position = 0;
    for m in matches.iter_mut() {
        if current != Some(m.tier) {
            current = Some(m.tier);
            position = 0;
        }
        position += 1;
        m.rank_within_tier = position;
    }

    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommunityRecord;

    fn record(name: &str) -> CommunityRecord {
        CommunityRecord {
            name: Some(name.to_string()),
            ..CommunityRecord::default()
        }
    }

    fn names<'a>(ranked: &'a [MatchResult<'_>]) -> Vec<&'a str> {
        ranked.iter().map(|m| m.name()).collect()
    }

    #[test]
    fn test_tier_before_distance() {
        let a = record("A");
        let b = record("B");
        let ranked = rank(vec![
            MatchResult::new(&b, 0, Tier::Two, Some(1.0)),
            MatchResult::new(&a, 1, Tier::One, Some(5.0)),
        ]);
        assert_eq!(names(&ranked), vec!["A", "B"]);
    }

    #[test]
    fn test_undefined_distance_last_within_tier() {
        let a = record("A");
        let b = record("B");
        let c = record("C");
        let ranked = rank(vec![
            MatchResult::new(&a, 0, Tier::One, None),
            MatchResult::new(&b, 1, Tier::One, Some(12.0)),
            MatchResult::new(&c, 2, Tier::Two, Some(0.5)),
        ]);
        assert_eq!(names(&ranked), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let a = record("A");
        let b = record("B");
        let ranked = rank(vec![
            MatchResult::new(&a, 0, Tier::One, Some(3.0)),
            MatchResult::new(&b, 1, Tier::One, Some(3.0 + 4e-7)),
        ]);
        assert_eq!(names(&ranked), vec!["A", "B"]);

        let ranked = rank(vec![
            MatchResult::new(&b, 0, Tier::One, Some(3.0 + 4e-7)),
            MatchResult::new(&a, 1, Tier::One, Some(3.0)),
        ]);
        assert_eq!(names(&ranked), vec!["B", "A"]);
    }

    #[test]
    fn test_tie_across_rounding_boundary_keeps_catalog_order() {
        let first = record("First");
        let second = record("Second");
        let ranked = rank(vec![
            MatchResult::new(&first, 0, Tier::One, Some(3.0 + 5.1e-7)),
            MatchResult::new(&second, 1, Tier::One, Some(3.0 + 4.9e-7)),
        ]);
        assert_eq!(names(&ranked), vec!["First", "Second"]);
    }

    #[test]
    fn test_ties_ordered_by_catalog_index_not_input_order() {
        let a = record("A");
        let b = record("B");
        let c = record("C");
        let ranked = rank(vec![
            MatchResult::new(&c, 2, Tier::Two, Some(1.0)),
            MatchResult::new(&a, 0, Tier::Two, Some(1.0 + 1e-7)),
            MatchResult::new(&b, 1, Tier::Two, Some(1.5)),
        ]);
        assert_eq!(names(&ranked), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_tie_group_spans_at_most_tolerance() {
        let records: Vec<CommunityRecord> = (0..3).map(|i| record(&i.to_string())).collect();
        // 0.9e-6 apart pairwise; the first and last are 1.8e-6 apart
        let ranked = rank(vec![
            MatchResult::new(&records[0], 0, Tier::One, Some(2.0 + 1.8e-6)),
            MatchResult::new(&records[1], 1, Tier::One, Some(2.0 + 0.9e-6)),
            MatchResult::new(&records[2], 2, Tier::One, Some(2.0)),
        ]);
        assert_eq!(names(&ranked), vec!["1", "2", "0"]);
    }

    #[test]
    fn test_rank_within_tier() {
        let records: Vec<CommunityRecord> = (0..5).map(|i| record(&i.to_string())).collect();
        let ranked = rank(vec![
            MatchResult::new(&records[0], 0, Tier::Two, Some(2.0)),
            MatchResult::new(&records[1], 1, Tier::One, Some(9.0)),
            MatchResult::new(&records[2], 2, Tier::Three, None),
            MatchResult::new(&records[3], 3, Tier::One, Some(1.0)),
            MatchResult::new(&records[4], 4, Tier::Two, None),
        ]);

        let ranks: Vec<(Tier, usize)> = ranked.iter().map(|m| (m.tier, m.rank_within_tier)).collect();
        assert_eq!(
            ranks,
            vec![
                (Tier::One, 1),
                (Tier::One, 2),
                (Tier::Two, 1),
                (Tier::Two, 2),
                (Tier::Three, 1),
            ]
        );
    }

    #[test]
    fn test_empty() {
        assert!(rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_compare_distance() {
        assert_eq!(compare_distance(Some(1.0), Some(2.0)), Ordering::Less);
        assert_eq!(compare_distance(Some(1.0), None), Ordering::Less);
        assert_eq!(compare_distance(None, Some(0.0)), Ordering::Greater);
        assert_eq!(compare_distance(Some(f64::NAN), None), Ordering::Equal);
    }
}
