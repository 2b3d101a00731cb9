// Core algorithm exports
pub mod distance;
pub mod explain;
pub mod export;
pub mod filters;
pub mod matcher;
pub mod priority;
pub mod ranker;
pub mod summary;

pub use distance::{haversine_miles, min_distance, DistanceAnnotator};
pub use explain::explain_matches;
pub use export::{export_selections, select, write_csv, write_preferences, ExportError, ExportRow, Selection};
pub use filters::{check_eligibility, filter_eligible, EligibilityReport, Exclusion, ExclusionReason};
pub use matcher::{Matcher, RankedMatches};
pub use priority::{classify, classify_community};
pub use ranker::rank;
pub use summary::{summarize, MatchSummary, TierSummary};
