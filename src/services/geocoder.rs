use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::models::Coordinates;

/// Errors that can occur when resolving or loading locations
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("location could not be resolved: {0}")]
    Unresolvable(String),

    #[error("failed to read gazetteer: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed gazetteer: {0}")]
    Csv(#[from] csv::Error),
}

/// Resolves place text to coordinates
///
/// Implementations must be pure: the same query always gives the same answer,
/// so ranking stays reproducible.
pub trait Geocoder {
    fn locate(&self, query: &str) -> Result<Coordinates, GeocodeError>;
}

impl<F> Geocoder for F
where
    F: Fn(&str) -> Result<Coordinates, GeocodeError>,
{
    fn locate(&self, query: &str) -> Result<Coordinates, GeocodeError> {
        self(query)
    }
}

/// Offline lookup table of place names and postal codes
///
/// Literal "lat, lon" queries are parsed directly without a table entry.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: HashMap<String, Coordinates>,
}

#[derive(Debug, Deserialize)]
struct GazetteerRow {
    place: String,
    latitude: f64,
    longitude: f64,
}

impl Gazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinates)>,
        S: AsRef<str>,
    {
        let mut gazetteer = Self::new();
        for (place, coordinates) in entries {
            gazetteer.insert(place.as_ref(), coordinates);
        }
        gazetteer
    }

    /// Load a `place,latitude,longitude` CSV
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GeocodeError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut gazetteer = Self::new();

        for row in csv_reader.deserialize::<GazetteerRow>() {
            let row = row?;
            let coordinates = Coordinates::new(row.latitude, row.longitude);
            if coordinates.is_valid() {
                gazetteer.insert(&row.place, coordinates);
            } else {
                tracing::warn!("Skipping gazetteer entry with invalid coordinates: {}", row.place);
            }
        }

        tracing::debug!("Loaded {} gazetteer entries", gazetteer.len());
        Ok(gazetteer)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, GeocodeError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn insert(&mut self, place: &str, coordinates: Coordinates) {
        self.entries.insert(normalize_place(place), coordinates);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Geocoder for Gazetteer {
    fn locate(&self, query: &str) -> Result<Coordinates, GeocodeError> {
        if let Some(coordinates) = parse_coordinates(query) {
            return Ok(coordinates);
        }

        let key = normalize_place(query);
        if let Some(coordinates) = self.entries.get(&key) {
            return Ok(*coordinates);
        }

        // "Pittsford, NY" falls back to "Pittsford"
        if let Some((head, _)) = query.split_once(',') {
            if let Some(coordinates) = self.entries.get(&normalize_place(head)) {
                return Ok(*coordinates);
            }
        }

        Err(GeocodeError::Unresolvable(query.trim().to_string()))
    }
}

/// Lowercase, drop punctuation and collapse whitespace
pub fn normalize_place(place: &str) -> String {
    place
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a literal "lat, lon" pair
pub fn parse_coordinates(text: &str) -> Option<Coordinates> {
    let (lat, lon) = text.split_once(',')?;
    let coordinates = Coordinates::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?);
    coordinates.is_valid().then_some(coordinates)
}
