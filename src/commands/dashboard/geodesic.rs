use geo::{Distance, Geodesic, Point};

use super::models::Coordinate;

/// Ellipsoidal (WGS84) surface distance in kilometres.
pub fn geodesic_km(a: Coordinate, b: Coordinate) -> f64 {
    Geodesic::distance(Point::new(a.lon, a.lat), Point::new(b.lon, b.lat)) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        let p = Coordinate::new(18.52, 73.85);
        assert!(geodesic_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude_at_equator() {
        let d = geodesic_km(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((d - 110.574).abs() < 0.01, "{}", d);
    }

    #[test]
    fn test_symmetric() {
        let a = Coordinate::new(19.07, 72.87);
        let b = Coordinate::new(28.61, 77.20);
        assert!((geodesic_km(a, b) - geodesic_km(b, a)).abs() < 1e-6);
        assert!(geodesic_km(a, b) > 1100.0 && geodesic_km(a, b) < 1200.0);
    }
}
