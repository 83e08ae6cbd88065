use std::fmt;

use super::assigner::ClusterAssignment;
use super::geodesic::geodesic_km;
use super::models::ClusterId;

#[derive(Clone, Debug, PartialEq)]
pub struct NearestEntry {
    pub city: String,
    pub distance_km: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NearestSummary {
    pub cluster: ClusterId,
    pub nearest: Vec<NearestEntry>,
}

impl NearestSummary {
    pub fn cities_line(&self) -> String {
        self.nearest
            .iter()
            .map(|e| format!("{} ({:.1} km)", e.city, e.distance_km))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for NearestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster {}: {}", self.cluster.ordinal(), self.cities_line())
    }
}

/// Up to `count` members of every populated cluster, nearest to its center first.
pub fn nearest_to_center(assignment: &ClusterAssignment, count: usize) -> Vec<NearestSummary> {
    assignment
        .ids_sorted()
        .into_iter()
        .map(|id| {
            let center = assignment.center(id);
            let mut nearest: Vec<NearestEntry> = assignment
                .members(id)
                .map(|c| NearestEntry { city: c.name.clone(), distance_km: geodesic_km(c.position, center) })
                .collect();
            nearest.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
            nearest.truncate(count);
            NearestSummary { cluster: id, nearest }
        })
        .collect()
}
