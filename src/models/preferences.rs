use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use validator::Validate;

use crate::models::community::{format_dollars, CareLevel};

/// Placeholder for text fields the extraction left empty
pub const NOT_SPECIFIED: &str = "Not specified";

/// When the client intends to move
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveInWindow {
    Range { start: NaiveDate, end: NaiveDate },
    Text { text: String },
    #[default]
    NotSpecified,
}

impl MoveInWindow {
    /// Read ISO dates out of free text; anything else is kept verbatim
    pub fn parse(text: &str) -> MoveInWindow {
        static DATE: OnceLock<Regex> = OnceLock::new();
        let re = DATE.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static date pattern"));

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return MoveInWindow::NotSpecified;
        }

        let dates: Vec<NaiveDate> = re
            .find_iter(trimmed)
            .filter_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
            .collect();

        match dates.as_slice() {
            [single] => MoveInWindow::Range { start: *single, end: *single },
            [a, b, ..] => MoveInWindow::Range {
                start: (*a).min(*b),
                end: (*a).max(*b),
            },
            [] => MoveInWindow::Text { text: trimmed.to_string() },
        }
    }
}

impl fmt::Display for MoveInWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveInWindow::Range { start, end } if start == end => write!(f, "{}", start),
            MoveInWindow::Range { start, end } => write!(f, "{} to {}", start, end),
            MoveInWindow::Text { text } => f.write_str(text),
            MoveInWindow::NotSpecified => f.write_str(NOT_SPECIFIED),
        }
    }
}

/// Family member or referrer to reach about the placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl Default for PrimaryContact {
    fn default() -> Self {
        Self {
            name: NOT_SPECIFIED.to_string(),
            phone: NOT_SPECIFIED.to_string(),
            email: NOT_SPECIFIED.to_string(),
        }
    }
}

/// Normalized client needs extracted from one consultation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PreferenceRecord {
    #[validate(length(min = 1))]
    pub client_name: String,
    #[validate(range(max = 130))]
    pub age: Option<u8>,
    /// `None` when the consultation never named a care level
    pub care_level: Option<CareLevel>,
    #[serde(default = "not_specified")]
    pub cognitive_condition: String,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[validate(range(min = 0.0))]
    pub monthly_budget: Option<f64>,
    #[serde(default)]
    pub enhanced_needed: bool,
    #[serde(default)]
    pub enriched_needed: bool,
    #[serde(default)]
    pub move_in_window: MoveInWindow,
    #[serde(default = "not_specified")]
    pub notes: String,
    #[serde(default = "not_specified")]
    pub placement_reason: String,
    #[serde(default)]
    pub primary_contact: PrimaryContact,
    #[serde(default)]
    pub pet_friendly: bool,
    #[serde(default)]
    pub tour_availability: Vec<String>,
}

fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

impl Default for PreferenceRecord {
    fn default() -> Self {
        Self {
            client_name: not_specified(),
            age: None,
            care_level: None,
            cognitive_condition: not_specified(),
            preferred_locations: Vec::new(),
            monthly_budget: None,
            enhanced_needed: false,
            enriched_needed: false,
            move_in_window: MoveInWindow::NotSpecified,
            notes: not_specified(),
            placement_reason: not_specified(),
            primary_contact: PrimaryContact::default(),
            pet_friendly: false,
            tour_availability: Vec::new(),
        }
    }
}

impl PreferenceRecord {
    pub fn care_level_label(&self) -> &'static str {
        self.care_level.map(CareLevel::label).unwrap_or(NOT_SPECIFIED)
    }

    pub fn budget_label(&self) -> String {
        self.monthly_budget
            .map(format_dollars)
            .unwrap_or_else(not_specified)
    }

    pub fn locations_label(&self) -> String {
        if self.preferred_locations.is_empty() {
            not_specified()
        } else {
            self.preferred_locations.join("; ")
        }
    }

    /// Client summary shown before matching, one "Label: value" per line
    pub fn summary_lines(&self) -> Vec<String> {
        let age = self
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(not_specified);
        let mut lines = vec![
            format!("Client: {}", self.client_name),
            format!("Age: {}", age),
            format!("Care level: {}", self.care_level_label()),
            format!("Max budget: {}", self.budget_label()),
            format!("Preferred areas: {}", self.locations_label()),
        ];
        if self.enhanced_needed {
            lines.push("Needs enhanced care".to_string());
        }
        if self.move_in_window != MoveInWindow::NotSpecified {
            lines.push(format!("Move-in: {}", self.move_in_window));
        }
        lines
    }

    /// File-name-safe version of the client name, "client" when unknown
    pub fn file_stem(&self) -> String {
        let name = self.client_name.trim();
        if name.is_empty() || name == NOT_SPECIFIED {
            return "client".to_string();
        }
        let stem: String = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        if stem.is_empty() {
            "client".to_string()
        } else {
            stem
        }
    }
}
