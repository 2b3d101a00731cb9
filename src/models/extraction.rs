use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

use crate::models::community::CareLevel;
use crate::models::preferences::{MoveInWindow, PreferenceRecord, PrimaryContact, NOT_SPECIFIED};

/// JSON object the language model is asked to produce from a transcript
///
/// Every field is a raw JSON value because the model is inconsistent about
/// types: budgets arrive as `4000`, `"4000"` or `"$4,000/month"`, booleans as
/// `true` or `"Yes"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedPreferences {
    pub name_of_patient: Option<Value>,
    pub age_of_patient: Option<Value>,
    pub injury_or_reason: Option<Value>,
    pub primary_contact_information: Option<Value>,
    pub mentally: Option<Value>,
    pub care_level: Option<Value>,
    pub preferred_location: Option<Value>,
    pub enhanced: Option<Value>,
    pub enriched: Option<Value>,
    pub move_in_window: Option<Value>,
    pub max_budget: Option<Value>,
    pub pet_friendly: Option<Value>,
    pub tour_availability: Option<Value>,
    pub other_keywords: Option<Value>,
}

impl ExtractedPreferences {
    /// Normalize into a preference record
    ///
    /// Missing fields become the "Not specified" sentinel. When no budget was
    /// extracted, the transcript (if given) is scanned for dollar amounts.
    pub fn into_record(self, transcript: Option<&str>) -> PreferenceRecord {
        let care_text = self.care_level.as_ref().and_then(value_text);
        let care_level = care_text.as_deref().and_then(CareLevel::from_text);
        let care_implies_enhanced = care_text
            .as_deref()
            .map(|t| t.to_lowercase().contains("enhanced"))
            .unwrap_or(false);

        let mut monthly_budget = self
            .max_budget
            .as_ref()
            .and_then(value_number)
            .filter(|b| *b >= 0.0);
        if monthly_budget.is_none() {
            if let Some(transcript) = transcript {
                monthly_budget = budget_from_transcript(transcript);
                if let Some(budget) = monthly_budget {
                    tracing::info!("Budget recovered from transcript: {}", budget);
                }
            }
        }

        let age = self
            .age_of_patient
            .as_ref()
            .and_then(value_number)
            .filter(|a| (0.0..=130.0).contains(a))
            .map(|a| a.round() as u8);

        PreferenceRecord {
            client_name: text_or_sentinel(self.name_of_patient.as_ref()),
            age,
            care_level,
            cognitive_condition: text_or_sentinel(self.mentally.as_ref()),
            preferred_locations: self.preferred_location.as_ref().map(value_list).unwrap_or_default(),
            monthly_budget,
            enhanced_needed: care_implies_enhanced
                || self.enhanced.as_ref().map(value_flag).unwrap_or(false),
            enriched_needed: self.enriched.as_ref().map(value_flag).unwrap_or(false),
            move_in_window: self
                .move_in_window
                .as_ref()
                .and_then(value_text)
                .map(|t| MoveInWindow::parse(&t))
                .unwrap_or_default(),
            notes: self
                .other_keywords
                .as_ref()
                .and_then(keywords_text)
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            placement_reason: text_or_sentinel(self.injury_or_reason.as_ref()),
            primary_contact: self
                .primary_contact_information
                .as_ref()
                .map(contact_from_value)
                .unwrap_or_default(),
            pet_friendly: self.pet_friendly.as_ref().map(value_flag).unwrap_or(false),
            tour_availability: self.tour_availability.as_ref().map(value_list).unwrap_or_default(),
        }
    }
}

/// Remove a surrounding Markdown code fence from a model response
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // drop an info string such as "json"
        let body = match after.find('\n') {
            Some(nl) if !after[..nl].trim().contains(char::is_whitespace) => &after[nl + 1..],
            _ => after,
        };
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }
    trimmed
}

/// Smallest amount read as a monthly budget; lower numbers are durations, ages and the like
pub const MIN_PLAUSIBLE_BUDGET: f64 = 500.0;

/// Highest plausible dollar amount mentioned in a transcript, if any
pub fn budget_from_transcript(transcript: &str) -> Option<f64> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"\$\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?",
            r"(?i)(\d{1,3}(?:,\d{3})+|\d+)\s*(?:dollars?|per\s*month|/\s*month|a\s*month)",
            r"(?i)(?:budget|maximum|max|up\s*to)\s*(?:is|of)?\s*\$?\s*(\d{1,3}(?:,\d{3})+|\d+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static budget pattern"))
        .collect()
    });

    for re in patterns {
        let best = re
            .captures_iter(transcript)
            .filter_map(|c| c.get(1))
            .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
            .filter(|v| *v >= MIN_PLAUSIBLE_BUDGET)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
        if best.is_some() {
            return best;
        }
    }
    None
}

fn is_placeholder(text: &str) -> bool {
    matches!(
        text.trim().to_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "na" | "unknown" | "not specified" | "not mentioned"
    )
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !is_placeholder(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_or_sentinel(value: Option<&Value>) -> String {
    value
        .and_then(value_text)
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

fn value_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn value_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "yes" | "true" | "y" | "required"),
        _ => false,
    }
}

fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        other => value_text(other).into_iter().collect(),
    }
}

fn keywords_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(k, v)| match v {
                    Value::Array(_) => {
                        let items = value_list(v);
                        (!items.is_empty()).then(|| format!("{}: {}", k, items.join(", ")))
                    }
                    other => value_text(other).map(|t| format!("{}: {}", k, t)),
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Array(_) => {
            let items = value_list(value);
            (!items.is_empty()).then(|| items.join(", "))
        }
        other => value_text(other),
    }
}

fn contact_from_value(value: &Value) -> PrimaryContact {
    let field = |key: &str| text_or_sentinel(value.get(key));
    PrimaryContact {
        name: field("name"),
        phone: field("phone_number"),
        email: field("email"),
    }
}
