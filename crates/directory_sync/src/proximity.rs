//! Proximity gate over directory entries.
//!
//! Fail-closed: without a reference location nobody is nearby.

use contracts::{Coordinate, DirectoryEntry, DEFAULT_RADIUS_METERS};
use tracing::trace;

use crate::geo::haversine_distance;

/// Keeps entries within `radius_meters` of a reference coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityFilter {
    radius_meters: f64,
}

impl ProximityFilter {
    pub fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Whether `entry` lies within the radius (closed interval)
    ///
    /// Entries without a coordinate are never in range.
    pub fn contains(&self, reference: Coordinate, entry: &DirectoryEntry) -> bool {
        match entry.coordinate() {
            Some(position) => {
                let distance = haversine_distance(reference, position);
                trace!(entry_id = %entry.id, distance_m = distance, "distance computed");
                distance <= self.radius_meters
            }
            None => {
                trace!(entry_id = %entry.id, "skipping entry without location");
                false
            }
        }
    }

    /// Filter `entries`, preserving their relative order
    ///
    /// Returns nothing when `reference` is `None`.
    pub fn filter<I>(&self, entries: I, reference: Option<Coordinate>) -> Vec<DirectoryEntry>
    where
        I: IntoIterator<Item = DirectoryEntry>,
    {
        let Some(reference) = reference else {
            trace!("no reference location, proximity view is empty");
            return Vec::new();
        };

        entries
            .into_iter()
            .filter(|entry| self.contains(reference, entry))
            .collect()
    }
}

impl Default for ProximityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_METERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_METERS;

    fn at(id: &str, lat: f64, lon: f64) -> DirectoryEntry {
        DirectoryEntry::new(id, id, id).with_coordinate(Coordinate::new(lat, lon))
    }

    #[test]
    fn test_no_reference_is_empty() {
        let filter = ProximityFilter::default();
        let entries = vec![at("a", 0.0, 0.0), at("b", 0.001, 0.0)];
        assert!(filter.filter(entries, None).is_empty());
    }

    #[test]
    fn test_missing_coordinates_skipped() {
        let filter = ProximityFilter::default();
        let entries = vec![DirectoryEntry::new("x", "x", "x"), at("a", 0.0, 0.0)];
        let kept = filter.filter(entries, Some(Coordinate::new(0.0, 0.0)));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
    }

    #[test]
    fn test_radius_is_closed_interval() {
        let origin = Coordinate::new(0.0, 0.0);
        // 10 km due north along the meridian
        let lat = (10_000.0 / EARTH_RADIUS_METERS).to_degrees();
        let entry = at("edge", lat, 0.0);
        let exact = haversine_distance(origin, entry.coordinate().unwrap());
        assert!((exact - 10_000.0).abs() < 1e-6);

        let on_edge = ProximityFilter::new(exact);
        assert_eq!(on_edge.filter(vec![entry.clone()], Some(origin)).len(), 1);

        let just_inside = ProximityFilter::new(exact - 1e-6);
        assert!(just_inside.filter(vec![entry.clone()], Some(origin)).is_empty());

        // Default 10 km radius keeps an entry exactly 10 km away
        let default = ProximityFilter::default();
        assert_eq!(default.radius_meters(), 10_000.0);
        let kept = default.filter(vec![entry], Some(origin));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "edge");
    }

    #[test]
    fn test_preserves_input_order() {
        let filter = ProximityFilter::new(50_000.0);
        let entries = vec![at("far", 0.3, 0.0), at("near", 0.01, 0.0), at("mid", 0.2, 0.0), at("out", 5.0, 0.0)];
        let ids: Vec<_> = filter
            .filter(entries, Some(Coordinate::new(0.0, 0.0)))
            .into_iter()
            .map(|e| e.id.to_string())
            .collect();
        assert_eq!(ids, vec!["far", "near", "mid"]);
    }
}
