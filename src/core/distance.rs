use geo::{point, HaversineDistance};

use crate::models::{CommunityRecord, Coordinates};
use crate::services::Geocoder;

const METERS_PER_MILE: f64 = 1609.344;

/// Great-circle distance between two points in miles
#[inline]
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
    let a = point!(x: from.longitude, y: from.latitude);
    let b = point!(x: to.longitude, y: to.latitude);
    a.haversine_distance(&b) / METERS_PER_MILE
}

/// Distance from `point` to the closest origin, `None` when there are no origins
pub fn min_distance(origins: &[Coordinates], point: Coordinates) -> Option<f64> {
    origins
        .iter()
        .map(|origin| haversine_miles(*origin, point))
        .filter(|d| d.is_finite())
        .min_by(|a, b| a.total_cmp(b))
}

/// Computes each community's distance to the client's preferred locations
///
/// Preferred locations are geocoded once up front; the ones that cannot be
/// resolved are dropped. With no resolved origin every distance is undefined.
pub struct DistanceAnnotator<'g, G: Geocoder + ?Sized> {
    geocoder: &'g G,
    origins: Vec<Coordinates>,
}

impl<'g, G: Geocoder + ?Sized> DistanceAnnotator<'g, G> {
    pub fn new(geocoder: &'g G, preferred_locations: &[String]) -> Self {
        let origins = preferred_locations
            .iter()
            .filter_map(|place| match geocoder.locate(place) {
                Ok(coordinates) => Some(coordinates),
                Err(e) => {
                    tracing::warn!("Ignoring preferred location: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        if origins.is_empty() && !preferred_locations.is_empty() {
            tracing::warn!("No preferred location could be resolved; ranking by tier only");
        }

        Self { geocoder, origins }
    }

    pub fn origins(&self) -> &[Coordinates] {
        &self.origins
    }

    /// Coordinates from the record itself, else from geocoding its ZIP or address
    pub fn locate_community(&self, community: &CommunityRecord) -> Option<Coordinates> {
        if let Some(coordinates) = community.location.coordinates {
            return Some(coordinates);
        }

        community
            .location
            .geocode_queries()
            .iter()
            .find_map(|query| self.geocoder.locate(query).ok())
    }

    /// Miles to the closest preferred location, `None` when undefined
    pub fn distance_to(&self, community: &CommunityRecord) -> Option<f64> {
        if self.origins.is_empty() {
            return None;
        }

        match self.locate_community(community) {
            Some(point) => min_distance(&self.origins, point),
            None => {
                tracing::debug!("Could not locate {}", community.display_name());
                None
            }
        }
    }
}
