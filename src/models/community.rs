use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::models::domain::Coordinates;

/// Level of care a client needs or a community provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareLevel {
    IndependentLiving,
    AssistedLiving,
    MemoryCare,
}

impl CareLevel {
    pub fn label(self) -> &'static str {
        match self {
            CareLevel::IndependentLiving => "Independent Living",
            CareLevel::AssistedLiving => "Assisted Living",
            CareLevel::MemoryCare => "Memory Care",
        }
    }

    /// Interpret a single requested care level from free text
    ///
    /// Memory care wins over assisted living when both are mentioned, since it
    /// is the stricter requirement. "Enhanced" implies assisted living.
    pub fn from_text(text: &str) -> Option<CareLevel> {
        let words = keywords(text);
        let has = |k: &str| words.iter().any(|w| w == k);

        if has("memory") || has("dementia") || has("alzheimer") || has("alzheimers") {
            Some(CareLevel::MemoryCare)
        } else if has("assisted") || has("al") || has("enhanced") || has("eal") {
            Some(CareLevel::AssistedLiving)
        } else if has("independent") || has("il") {
            Some(CareLevel::IndependentLiving)
        } else {
            None
        }
    }

    /// Every care level mentioned in a catalog "Type of Service" cell
    pub fn parse_offered(text: &str) -> BTreeSet<CareLevel> {
        let words = keywords(text);
        let has = |k: &str| words.iter().any(|w| w == k);
        let mut levels = BTreeSet::new();

        if has("memory") || has("dementia") || has("mc") {
            levels.insert(CareLevel::MemoryCare);
        }
        if has("assisted") || has("al") || has("enhanced") {
            levels.insert(CareLevel::AssistedLiving);
        }
        if has("independent") || has("il") {
            levels.insert(CareLevel::IndependentLiving);
        }

        levels
    }
}

impl fmt::Display for CareLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CareLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CareLevel::from_text(s).ok_or_else(|| {
            format!("unknown care level '{}'; expected independent, assisted or memory care", s)
        })
    }
}

fn keywords(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Business relationship between the placement agency and a community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipStatus {
    ContractedRate,
    PlacementPartner,
    Other,
}

impl RelationshipStatus {
    /// Parse an explicit relationship label such as "contracted-rate"
    pub fn from_label(label: &str) -> RelationshipStatus {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.as_str() {
            "contracted rate" | "contracted" | "contract" | "contract rate" => {
                RelationshipStatus::ContractedRate
            }
            "placement partner" | "placement" | "partner" => RelationshipStatus::PlacementPartner,
            _ => RelationshipStatus::Other,
        }
    }

    /// Derive the relationship from the spreadsheet's contract/placement columns
    ///
    /// Any contract value other than blank or "no" is a contracted rate. A
    /// community without a contract that works with placement is a partner.
    pub fn from_catalog_flags(contract: Option<&str>, placement: Option<&str>) -> RelationshipStatus {
        let contract = contract.map(|c| c.trim().to_lowercase()).unwrap_or_default();
        let placement = placement.map(|p| p.trim().to_lowercase()).unwrap_or_default();

        if !matches!(contract.as_str(), "" | "no" | "nan") {
            RelationshipStatus::ContractedRate
        } else if contract == "no" && placement == "yes" {
            RelationshipStatus::PlacementPartner
        } else {
            RelationshipStatus::Other
        }
    }
}

/// Monthly fee interval in dollars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateRange {
    pub min: f64,
    pub max: f64,
}

impl RateRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn single(amount: f64) -> Self {
        Self { min: amount, max: amount }
    }

    /// Parse a fee cell like "$4,500", "4500-6200" or "$4,500 to $6,200/mo"
    pub fn parse(text: &str) -> Option<RateRange> {
        static AMOUNT: OnceLock<Regex> = OnceLock::new();
        let re = AMOUNT.get_or_init(|| {
            Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("static rate pattern")
        });

        let amounts: Vec<f64> = re
            .find_iter(text)
            .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .take(2)
            .collect();

        match amounts.as_slice() {
            [] => None,
            [single] => Some(RateRange::single(*single)),
            [low, high, ..] => Some(RateRange::new(*low, *high)),
        }
    }
}

impl fmt::Display for RateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.max - self.min).abs() < 0.5 {
            write!(f, "{}", format_dollars(self.min))
        } else {
            write!(f, "{} - {}", format_dollars(self.min), format_dollars(self.max))
        }
    }
}

/// Render a dollar amount rounded to whole dollars with thousands separators
pub fn format_dollars(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Where a community is, in whatever detail the catalog provides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityLocation {
    pub address: Option<String>,
    pub town: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl CommunityLocation {
    /// Geocoder queries to try, most precise first
    pub fn geocode_queries(&self) -> Vec<String> {
        let mut queries = Vec::new();

        if let Some(zip) = self.zip.as_deref().and_then(normalize_zip) {
            queries.push(zip);
        }

        let parts: Vec<&str> = [&self.address, &self.town, &self.state]
            .iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() {
            queries.push(parts.join(", "));
        }

        if self.address.is_some() {
            if let Some(town) = self.town.as_deref() {
                match self.state.as_deref() {
                    Some(state) => queries.push(format!("{}, {}", town, state)),
                    None => queries.push(town.to_string()),
                }
            }
        }

        queries
    }
}

/// Zero-pad numeric ZIP codes, which spreadsheets often export as "4618.0"
pub fn normalize_zip(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(format!("{:05}", v as u64)),
        _ => Some(trimmed.to_string()),
    }
}

/// Operational details shown alongside a match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub community_id: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub apartment_type: Option<String>,
    pub waitlist: Option<String>,
}

/// One row of the community catalog
///
/// Fields are optional because the spreadsheet is edited by hand; the
/// eligibility filter decides which gaps disqualify a community.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityRecord {
    pub name: Option<String>,
    pub location: CommunityLocation,
    pub care_levels: BTreeSet<CareLevel>,
    pub enhanced: bool,
    pub enriched: bool,
    pub monthly_rate: Option<RateRange>,
    pub relationship: Option<RelationshipStatus>,
    pub contact: ContactInfo,
}

impl CommunityRecord {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed community")
    }

    pub fn offers(&self, level: CareLevel) -> bool {
        self.care_levels.contains(&level)
    }

    /// "Town, ST" when either part is known
    pub fn town_state(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.location.town, &self.location.state]
            .iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    /// Labelled detail lines for a match listing; unknown fields are left out
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut push = |label: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                lines.push(format!("{}: {}", label, value));
            }
        };

        push("Location", self.town_state());
        push("Monthly fee", self.monthly_rate.map(|r| r.to_string()));
        if !self.care_levels.is_empty() {
            let levels: Vec<&str> = self.care_levels.iter().map(|l| l.label()).collect();
            push("Care levels", Some(levels.join(", ")));
        }
        push("Enhanced", Some(yes_no(self.enhanced).to_string()));
        push("Enriched", Some(yes_no(self.enriched).to_string()));
        push("Apartment type", self.contact.apartment_type.clone());
        push("Est. waitlist", self.contact.waitlist.clone());
        push("Community ID", self.contact.community_id.clone());

        let contact: Vec<&str> = [&self.contact.contact_name, &self.contact.phone, &self.contact.email]
            .iter()
            .filter_map(|c| c.as_deref())
            .collect();
        if !contact.is_empty() {
            push("Contact", Some(contact.join(", ")));
        }

        lines
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// In-memory snapshot of every community loaded for one session
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    communities: Vec<CommunityRecord>,
}

impl Catalog {
    pub fn new(communities: Vec<CommunityRecord>) -> Self {
        Self { communities }
    }

    pub fn communities(&self) -> &[CommunityRecord] {
        &self.communities
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }
}

impl From<Vec<CommunityRecord>> for Catalog {
    fn from(communities: Vec<CommunityRecord>) -> Self {
        Self::new(communities)
    }
}
