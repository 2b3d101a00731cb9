use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::{MatchResult, PreferenceRecord, Tier};

/// Errors that can occur while writing exports
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to encode preferences: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which ranked matches go into an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Tier1Only,
    Tier2Only,
    All,
    TopN(usize),
}

impl Selection {
    /// File name for this selection, e.g. `priority1_Ruth_Miller.csv`
    pub fn file_name(&self, client: &str) -> String {
        match self {
            Selection::Tier1Only => format!("priority1_{}.csv", client),
            Selection::Tier2Only => format!("priority2_{}.csv", client),
            Selection::All => format!("all_matches_{}.csv", client),
            Selection::TopN(n) => format!("top{}_{}.csv", n, client),
        }
    }
}

/// One exported line; field order is the CSV column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Community Name")]
    pub community_name: String,
    #[serde(rename = "Tier")]
    pub tier: u8,
    #[serde(rename = "Distance (mi)")]
    pub distance: String,
    #[serde(rename = "Monthly Rate")]
    pub monthly_rate: String,
    #[serde(rename = "Explanation")]
    pub explanation: String,
}

impl ExportRow {
    pub fn from_match(m: &MatchResult<'_>) -> Self {
        Self {
            community_name: m.name().to_string(),
            tier: m.tier.level(),
            distance: m.distance_miles.map(|d| format!("{:.1}", d)).unwrap_or_default(),
            monthly_rate: m.community.monthly_rate.map(|r| r.to_string()).unwrap_or_default(),
            explanation: m.explanation.clone(),
        }
    }
}

/// Rows for a selection, in ranked order
pub fn select(matches: &[MatchResult<'_>], selection: Selection) -> Vec<ExportRow> {
    let by_tier = |tier: Tier| -> Vec<ExportRow> {
        matches
            .iter()
            .filter(|m| m.tier == tier)
            .map(ExportRow::from_match)
            .collect()
    };

    match selection {
        Selection::Tier1Only => by_tier(Tier::One),
        Selection::Tier2Only => by_tier(Tier::Two),
        Selection::All => matches.iter().map(ExportRow::from_match).collect(),
        Selection::TopN(n) => matches.iter().take(n).map(ExportRow::from_match).collect(),
    }
}

/// Write rows as CSV with a header line, even when there are no rows
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    if rows.is_empty() {
        csv_writer.write_record(["Community Name", "Tier", "Distance (mi)", "Monthly Rate", "Explanation"])?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_string(rows: &[ExportRow]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Write the four standard selections into `dir`
///
/// Returns the paths written, in Tier 1, Tier 2, all, top-N order.
pub fn export_selections(
    matches: &[MatchResult<'_>],
    dir: &Path,
    client: &str,
    top_n: usize,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;

    let selections = [
        Selection::Tier1Only,
        Selection::Tier2Only,
        Selection::All,
        Selection::TopN(top_n),
    ];

    let mut written = Vec::with_capacity(selections.len());
    for selection in selections {
        let rows = select(matches, selection);
        let path = dir.join(selection.file_name(client));
        let file = std::fs::File::create(&path)?;
        write_csv(&rows, file)?;

        tracing::info!("Exported {} rows to {}", rows.len(), path.display());
        written.push(path);
    }

    Ok(written)
}

/// Save the reviewed preferences as `preferences_<client>.json` in `dir`
///
/// The file can be passed back with `--preferences` to rerun the match.
pub fn write_preferences(dir: &Path, preferences: &PreferenceRecord) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("preferences_{}.json", preferences.file_stem()));
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, preferences)?;

    tracing::info!("Saved preferences to {}", path.display());
    Ok(path)
}
