//! Placement Match - senior-living community matching for placement consultations
//!
//! Turns a consultation (audio or transcript) into a structured preference
//! record, filters a community catalog on hard constraints, ranks the
//! survivors by business priority and distance, and exports the results as CSV.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod session;

// Re-export commonly used types
pub use crate::core::{export_selections, summarize, Matcher, RankedMatches};
pub use crate::models::{Catalog, CareLevel, CommunityRecord, MatchResult, PreferenceRecord, Tier};
pub use crate::services::{load_catalog, load_catalog_from_path, Gazetteer, Geocoder, OpenAiClient};
pub use crate::session::{Consultation, SessionError};
