//! Great-circle distance.

use contracts::Coordinate;

/// Mean Earth radius (IUGG), meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Haversine distance between two coordinates, in meters
#[inline]
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = Coordinate::new(51.0447, -114.0719);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_distance(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        let expected = EARTH_RADIUS_METERS * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-6, "d={d}");
    }

    #[test]
    fn test_symmetric() {
        let a = Coordinate::new(51.0447, -114.0719);
        let b = Coordinate::new(49.2827, -123.1207);
        assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_known_city_pair() {
        // Calgary -> Vancouver is roughly 675 km
        let calgary = Coordinate::new(51.0447, -114.0719);
        let vancouver = Coordinate::new(49.2827, -123.1207);
        let km = haversine_distance(calgary, vancouver) / 1000.0;
        assert!((670.0..680.0).contains(&km), "km={km}");
    }

    #[test]
    fn test_antipodal_is_finite() {
        let d = haversine_distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_METERS).abs() < 1.0);
    }
}
