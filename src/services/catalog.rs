use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::{
    Catalog, CareLevel, CommunityLocation, CommunityRecord, ContactInfo, Coordinates, RateRange,
    RelationshipStatus,
};

/// Errors that prevent a catalog from being loaded at all
///
/// Individual bad rows are not errors; they are skipped or left for the
/// eligibility filter to exclude.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed catalog: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required column \"{0}\"")]
    MissingColumn(&'static str),

    #[error("catalog contains no communities")]
    Empty,
}

const SERVICE_COLUMN: &str = "Type of Service";

/// Load the community catalog from a spreadsheet CSV export
pub fn load_catalog<R: Read>(reader: R) -> Result<Catalog, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if !headers.iter().any(|h| h == SERVICE_COLUMN) {
        return Err(CatalogError::MissingColumn(SERVICE_COLUMN));
    }

    let mut communities = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        match row {
            Ok(row) => communities.push(row.into_record()),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping unreadable catalog row {}: {}", line + 2, e);
            }
        }
    }

    if communities.is_empty() {
        return Err(CatalogError::Empty);
    }

    tracing::info!(
        "Loaded {} communities ({} unreadable rows skipped)",
        communities.len(),
        skipped
    );

    Ok(Catalog::new(communities))
}

pub fn load_catalog_from_path<P: AsRef<Path>>(path: P) -> Result<Catalog, CatalogError> {
    let file = std::fs::File::open(path)?;
    load_catalog(file)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Community Name", alias = "Name", default, deserialize_with = "empty_string_as_none")]
    name: Option<String>,
    #[serde(rename = "Address", default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(rename = "Town", default, deserialize_with = "empty_string_as_none")]
    town: Option<String>,
    #[serde(rename = "State", default, deserialize_with = "empty_string_as_none")]
    state: Option<String>,
    #[serde(rename = "Zip", alias = "Zip Code", alias = "ZIP", default, deserialize_with = "empty_string_as_none")]
    zip: Option<String>,
    #[serde(rename = "Latitude", default, deserialize_with = "empty_string_as_none")]
    latitude: Option<String>,
    #[serde(rename = "Longitude", default, deserialize_with = "empty_string_as_none")]
    longitude: Option<String>,
    #[serde(rename = "Type of Service", default, deserialize_with = "empty_string_as_none")]
    service_type: Option<String>,
    #[serde(rename = "Enhanced", default, deserialize_with = "empty_string_as_none")]
    enhanced: Option<String>,
    #[serde(rename = "Enriched", default, deserialize_with = "empty_string_as_none")]
    enriched: Option<String>,
    #[serde(rename = "Monthly Fee", default, deserialize_with = "empty_string_as_none")]
    monthly_fee: Option<String>,
    #[serde(rename = "Contract (w rate)?", default, deserialize_with = "empty_string_as_none")]
    contract: Option<String>,
    #[serde(rename = "Work with Placement?", default, deserialize_with = "empty_string_as_none")]
    placement: Option<String>,
    #[serde(rename = "Relationship", default, deserialize_with = "empty_string_as_none")]
    relationship: Option<String>,
    #[serde(rename = "CommunityID", default, deserialize_with = "empty_string_as_none")]
    community_id: Option<String>,
    #[serde(rename = "Contact Name", default, deserialize_with = "empty_string_as_none")]
    contact_name: Option<String>,
    #[serde(rename = "Contact Phone", default, deserialize_with = "empty_string_as_none")]
    contact_phone: Option<String>,
    #[serde(rename = "Contact Email", default, deserialize_with = "empty_string_as_none")]
    contact_email: Option<String>,
    #[serde(rename = "Apartment Type", default, deserialize_with = "empty_string_as_none")]
    apartment_type: Option<String>,
    #[serde(rename = "Est. Waitlist Length", default, deserialize_with = "empty_string_as_none")]
    waitlist: Option<String>,
}

impl CatalogRow {
    fn into_record(self) -> CommunityRecord {
        let service_text = self.service_type.as_deref().unwrap_or_default();
        let care_levels = CareLevel::parse_offered(service_text);
        let enhanced = is_yes(self.enhanced.as_deref())
            || service_text.to_lowercase().contains("enhanced");

        let relationship = Some(match self.relationship.as_deref() {
            Some(label) => RelationshipStatus::from_label(label),
            None => RelationshipStatus::from_catalog_flags(
                self.contract.as_deref(),
                self.placement.as_deref(),
            ),
        });

        let coordinates = match (self.latitude.as_deref(), self.longitude.as_deref()) {
            (Some(lat), Some(lon)) => match (lat.parse::<f64>(), lon.parse::<f64>()) {
                (Ok(lat), Ok(lon)) => Some(Coordinates::new(lat, lon)).filter(Coordinates::is_valid),
                _ => None,
            },
            _ => None,
        };

        CommunityRecord {
            name: self.name,
            location: CommunityLocation {
                address: self.address,
                town: self.town,
                state: self.state,
                zip: self.zip,
                coordinates,
            },
            care_levels,
            enhanced,
            enriched: is_yes(self.enriched.as_deref()),
            monthly_rate: self.monthly_fee.as_deref().and_then(RateRange::parse),
            relationship,
            contact: ContactInfo {
                community_id: self.community_id,
                contact_name: self.contact_name,
                phone: self.contact_phone,
                email: self.contact_email,
                apartment_type: self.apartment_type,
                waitlist: self.waitlist,
            },
        }
    }
}

fn is_yes(value: Option<&str>) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "yes" | "y" | "true"))
        .unwrap_or(false)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}
