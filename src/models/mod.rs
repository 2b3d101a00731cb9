// Model exports
pub mod community;
pub mod domain;
pub mod extraction;
pub mod preferences;

pub use community::{Catalog, CareLevel, CommunityLocation, CommunityRecord, ContactInfo, RateRange, RelationshipStatus};
pub use domain::{Coordinates, MatchResult, Tier};
pub use extraction::ExtractedPreferences;
pub use preferences::{MoveInWindow, PreferenceRecord, PrimaryContact, NOT_SPECIFIED};
