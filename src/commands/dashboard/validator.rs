use std::fmt;

use super::assigner::ClusterAssignment;
use super::geodesic::geodesic_km;
use super::models::ClusterId;

#[derive(Clone, Debug, PartialEq)]
pub struct RadiusWarning {
    pub cluster: ClusterId,
    pub city: String,
    pub distance_km: f64,
    pub threshold_km: f64,
}

impl fmt::Display for RadiusWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cluster {} exceeds {} km: {} - {:.2} km",
            self.cluster.0, self.threshold_km, self.city, self.distance_km
        )
    }
}

/// Cities farther than `threshold_km` from their own cluster's center.
/// Clusters are visited in order of first appearance, cities in row order.
pub fn radius_warnings(
    assignment: &ClusterAssignment,
    threshold_km: f64,
) -> impl Iterator<Item = RadiusWarning> + '_ {
    assignment.ids_in_row_order().into_iter().flat_map(move |id| {
        let center = assignment.center(id);
        assignment.members(id).filter_map(move |city| {
            let distance_km = geodesic_km(city.position, center);
            (distance_km > threshold_km).then(|| RadiusWarning {
                cluster: id,
                city: city.name.clone(),
                distance_km,
                threshold_km,
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::dashboard::models::{City, Coordinate};

    fn city(name: &str, lat: f64, lon: f64, cluster: usize) -> City {
        City { name: name.to_string(), position: Coordinate::new(lat, lon), cluster: ClusterId(cluster) }
    }

    fn assignment() -> ClusterAssignment {
        ClusterAssignment {
            cities: vec![
                city("Far", 3.0, 0.0, 1),
                city("Near", 0.5, 0.0, 0),
                city("Edge", -2.0, 0.0, 0),
                city("Close", 0.2, 0.0, 1),
            ],
            centers: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.0)],
            inertia: 0.0,
        }
    }

    #[test]
    fn test_only_cities_beyond_threshold_warn() {
        let a = assignment();
        let warnings: Vec<RadiusWarning> = radius_warnings(&a, 150.0).collect();
        let names: Vec<&str> = warnings.iter().map(|w| w.city.as_str()).collect();
        // cluster 1 appears first in the rows
        assert_eq!(names, vec!["Far", "Edge"]);
        assert!(warnings.iter().all(|w| w.distance_km > 150.0));
    }

    #[test]
    fn test_nothing_beyond_a_large_threshold() {
        let a = assignment();
        assert_eq!(radius_warnings(&a, 1000.0).count(), 0);
    }

    #[test]
    fn test_display_format() {
        let w = RadiusWarning {
            cluster: ClusterId(2),
            city: "Nagpur".to_string(),
            distance_km: 163.456,
            threshold_km: 150.0,
        };
        assert_eq!(w.to_string(), "Cluster 2 exceeds 150 km: Nagpur - 163.46 km");
    }
}
