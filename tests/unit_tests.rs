// Unit tests for Placement Match

use placement_match::core::{
    export::{select, Selection},
    filters::{check_eligibility, filter_eligible, ExclusionReason},
    priority::classify_community,
    ranker::{rank, DISTANCE_TOLERANCE_MILES},
};
use placement_match::models::{
    CareLevel, CommunityRecord, MatchResult, PreferenceRecord, RateRange, RelationshipStatus, Tier,
};
use proptest::prelude::*;

fn community(name: &str, levels: &[CareLevel], relationship: RelationshipStatus, rate: Option<f64>) -> CommunityRecord {
    CommunityRecord {
        name: Some(name.to_string()),
        care_levels: levels.iter().copied().collect(),
        relationship: Some(relationship),
        monthly_rate: rate.map(RateRange::single),
        ..CommunityRecord::default()
    }
}

fn preferences(care_level: CareLevel, budget: Option<f64>) -> PreferenceRecord {
    PreferenceRecord {
        client_name: "Test Client".to_string(),
        care_level: Some(care_level),
        monthly_budget: budget,
        ..PreferenceRecord::default()
    }
}

#[test]
fn test_filter_exclusion_reasons() {
    let prefs = preferences(CareLevel::MemoryCare, Some(5000.0));

    let unnamed = CommunityRecord {
        name: None,
        ..community("", &[CareLevel::MemoryCare], RelationshipStatus::Other, Some(4000.0))
    };
    assert_eq!(check_eligibility(&unnamed, &prefs), Err(ExclusionReason::MissingName));

    let no_levels = community("A", &[], RelationshipStatus::Other, Some(4000.0));
    assert_eq!(check_eligibility(&no_levels, &prefs), Err(ExclusionReason::MissingCareLevels));

    let wrong_level = community("B", &[CareLevel::AssistedLiving], RelationshipStatus::Other, Some(4000.0));
    assert_eq!(
        check_eligibility(&wrong_level, &prefs),
        Err(ExclusionReason::CareLevelNotOffered(CareLevel::MemoryCare))
    );

    let no_rate = community("C", &[CareLevel::MemoryCare], RelationshipStatus::Other, None);
    assert_eq!(check_eligibility(&no_rate, &prefs), Err(ExclusionReason::MissingRate));

    let pricey = community("D", &[CareLevel::MemoryCare], RelationshipStatus::Other, Some(5000.01));
    assert!(matches!(
        check_eligibility(&pricey, &prefs),
        Err(ExclusionReason::OverBudget { .. })
    ));

    let at_budget = community("E", &[CareLevel::MemoryCare], RelationshipStatus::Other, Some(5000.0));
    assert_eq!(check_eligibility(&at_budget, &prefs), Ok(()));
}

#[test]
fn test_missing_budget_means_no_budget_constraint() {
    let prefs = preferences(CareLevel::AssistedLiving, None);
    let no_rate = community("A", &[CareLevel::AssistedLiving], RelationshipStatus::Other, None);
    let expensive = community("B", &[CareLevel::AssistedLiving], RelationshipStatus::Other, Some(25000.0));

    assert_eq!(check_eligibility(&no_rate, &prefs), Ok(()));
    assert_eq!(check_eligibility(&expensive, &prefs), Ok(()));
}

#[test]
fn test_priority_tiers() {
    let tier = |r| classify_community(&community("X", &[], r, None));
    assert_eq!(tier(RelationshipStatus::ContractedRate), Tier::One);
    assert_eq!(tier(RelationshipStatus::PlacementPartner), Tier::Two);
    assert_eq!(tier(RelationshipStatus::Other), Tier::Three);

    let unknown = CommunityRecord::default();
    assert_eq!(classify_community(&unknown), Tier::Three);
}

#[test]
fn test_tier_beats_distance() {
    // A: contracted, memory, 5mi; B: partner, memory, 1mi; C: contracted, assisted, 2mi
    let catalog = vec![
        community("A", &[CareLevel::MemoryCare], RelationshipStatus::ContractedRate, Some(6000.0)),
        community("B", &[CareLevel::MemoryCare], RelationshipStatus::PlacementPartner, Some(6000.0)),
        community("C", &[CareLevel::AssistedLiving], RelationshipStatus::ContractedRate, Some(6000.0)),
    ];
    let distances = [5.0, 1.0, 2.0];
    let prefs = preferences(CareLevel::MemoryCare, None);

    let report = filter_eligible(&prefs, &catalog);
    let candidates = report
        .eligible
        .iter()
        .map(|&(i, c)| MatchResult::new(c, i, classify_community(c), Some(distances[i])))
        .collect();
    let ranked = rank(candidates);

    let names: Vec<&str> = ranked.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(report.exclusions.len(), 1);
    assert_eq!(report.exclusions[0].name.as_deref(), Some("C"));
}

#[test]
fn test_tie_within_tolerance_keeps_catalog_order() {
    let first = community("First", &[], RelationshipStatus::ContractedRate, None);
    let second = community("Second", &[], RelationshipStatus::ContractedRate, None);

    let ranked = rank(vec![
        MatchResult::new(&first, 0, Tier::One, Some(3.0 + 3e-7)),
        MatchResult::new(&second, 1, Tier::One, Some(3.0)),
    ]);

    assert_eq!(ranked[0].name(), "First");
    assert_eq!(ranked[1].name(), "Second");
    assert_eq!(ranked[1].rank_within_tier, 2);
}

#[test]
fn test_zero_eligible_gives_empty_output() {
    let catalog = vec![community("A", &[CareLevel::IndependentLiving], RelationshipStatus::ContractedRate, Some(3000.0))];
    let prefs = preferences(CareLevel::MemoryCare, None);

    let report = filter_eligible(&prefs, &catalog);
    assert!(report.is_empty());

    let ranked = rank(Vec::new());
    assert!(ranked.is_empty());
    assert!(select(&ranked, Selection::All).is_empty());
    assert!(select(&ranked, Selection::TopN(5)).is_empty());
}

fn care_level_strategy() -> impl Strategy<Value = CareLevel> {
    prop_oneof![
        Just(CareLevel::IndependentLiving),
        Just(CareLevel::AssistedLiving),
        Just(CareLevel::MemoryCare),
    ]
}

fn relationship_strategy() -> impl Strategy<Value = RelationshipStatus> {
    prop_oneof![
        Just(RelationshipStatus::ContractedRate),
        Just(RelationshipStatus::PlacementPartner),
        Just(RelationshipStatus::Other),
    ]
}

fn community_strategy() -> impl Strategy<Value = CommunityRecord> {
    (
        prop::option::weighted(0.9, "[A-Z][a-z]{2,10}"),
        prop::collection::vec(care_level_strategy(), 0..4),
        prop::option::of(relationship_strategy()),
        prop::option::weighted(0.8, 1500u32..12_000),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, levels, relationship, rate, enhanced, enriched)| CommunityRecord {
            name,
            care_levels: levels.into_iter().collect(),
            relationship,
            monthly_rate: rate.map(|r| RateRange::single(f64::from(r))),
            enhanced,
            enriched,
            ..CommunityRecord::default()
        })
}

fn preferences_strategy() -> impl Strategy<Value = PreferenceRecord> {
    (
        prop::option::of(care_level_strategy()),
        prop::option::of(1000u32..10_000),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(care_level, budget, enhanced_needed, enriched_needed)| PreferenceRecord {
            care_level,
            monthly_budget: budget.map(f64::from),
            enhanced_needed,
            enriched_needed,
            ..PreferenceRecord::default()
        })
}

/// Undefined, coarse values that tie often, or arbitrary miles
fn distance_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        (0u32..8).prop_map(|d| Some(f64::from(d) * 2.5)),
        (0u32..8).prop_map(|d| Some(f64::from(d) * 2.5 + 4e-7)),
        (0.0f64..60.0).prop_map(Some),
    ]
}

/// Communities with a distance each, plus a shuffled presentation order
fn ranking_input_strategy() -> impl Strategy<Value = (Vec<(CommunityRecord, Option<f64>)>, Vec<usize>)> {
    prop::collection::vec((community_strategy(), distance_strategy()), 0..60).prop_flat_map(|entries| {
        let order: Vec<usize> = (0..entries.len()).collect();
        (Just(entries), Just(order).prop_shuffle())
    })
}

fn candidates<'a>(entries: &'a [(CommunityRecord, Option<f64>)], order: &[usize]) -> Vec<MatchResult<'a>> {
    order
        .iter()
        .map(|&i| {
            let (community, distance) = &entries[i];
            MatchResult::new(community, i, classify_community(community), *distance)
        })
        .collect()
}

proptest! {
    #[test]
    fn property_filter_is_idempotent(
        catalog in prop::collection::vec(community_strategy(), 0..80),
        prefs in preferences_strategy(),
    ) {
        let first = filter_eligible(&prefs, &catalog);
        let survivors: Vec<CommunityRecord> = first.eligible.iter().map(|(_, c)| (*c).clone()).collect();
        let second = filter_eligible(&prefs, &survivors);

        prop_assert_eq!(first.eligible.len() + first.exclusions.len(), catalog.len());
        prop_assert_eq!(second.eligible.len(), survivors.len());
        prop_assert!(second.exclusions.is_empty());
    }

    #[test]
    fn property_ranking_ignores_presentation_order((entries, order) in ranking_input_strategy()) {
        let catalog_order: Vec<usize> = (0..entries.len()).collect();

        let from_catalog: Vec<usize> = rank(candidates(&entries, &catalog_order))
            .iter()
            .map(|m| m.catalog_index)
            .collect();
        let from_shuffled: Vec<usize> = rank(candidates(&entries, &order))
            .iter()
            .map(|m| m.catalog_index)
            .collect();

        prop_assert_eq!(from_catalog, from_shuffled);
    }

    #[test]
    fn property_ranking_is_monotone((entries, order) in ranking_input_strategy()) {
        let ranked = rank(candidates(&entries, &order));
        prop_assert_eq!(ranked.len(), entries.len());

        for pair in ranked.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            prop_assert!(prev.tier <= next.tier);
            if prev.tier != next.tier {
                prop_assert_eq!(next.rank_within_tier, 1);
                continue;
            }

            prop_assert_eq!(next.rank_within_tier, prev.rank_within_tier + 1);
            match (prev.distance_miles, next.distance_miles) {
                (Some(a), Some(b)) => prop_assert!(b >= a - DISTANCE_TOLERANCE_MILES),
                (None, Some(_)) => prop_assert!(false, "undefined distance ranked before a defined one"),
                (None, None) => prop_assert!(prev.catalog_index < next.catalog_index),
                (Some(_), None) => {}
            }
        }
    }

    #[test]
    fn property_export_row_counts((entries, order) in ranking_input_strategy(), n in 0usize..80) {
        let ranked = rank(candidates(&entries, &order));

        let all = select(&ranked, Selection::All);
        let tier1 = select(&ranked, Selection::Tier1Only);
        let tier2 = select(&ranked, Selection::Tier2Only);

        prop_assert_eq!(all.len(), ranked.len());
        prop_assert!(tier1.len() <= all.len());
        prop_assert!(tier1.len() + tier2.len() <= all.len());
        prop_assert!(tier1.iter().all(|r| r.tier == 1));
        prop_assert!(tier2.iter().all(|r| r.tier == 2));
        prop_assert_eq!(select(&ranked, Selection::TopN(n)).len(), n.min(ranked.len()));
    }
}
