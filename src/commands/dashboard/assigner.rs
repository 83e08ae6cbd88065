use anyhow::{Context, Result};
use log::info;

use super::config::Config;
use super::kmeans::KMeans;
use super::models::{City, CityRow, ClusterId, Coordinate};
use super::scaler::StandardScaler;

#[derive(Clone, Debug)]
pub struct ClusterAssignment {
    /// Same order as the input rows.
    pub cities: Vec<City>,
    /// Indexed by cluster id, in degrees.
    pub centers: Vec<Coordinate>,
    pub inertia: f64,
}

impl ClusterAssignment {
    pub fn center(&self, id: ClusterId) -> Coordinate {
        self.centers[id.0]
    }

    pub fn members(&self, id: ClusterId) -> impl Iterator<Item = &City> + '_ {
        self.cities.iter().filter(move |c| c.cluster == id)
    }

    /// Distinct ids in order of first appearance in the rows.
    pub fn ids_in_row_order(&self) -> Vec<ClusterId> {
        let mut seen = Vec::new();
        for c in &self.cities {
            if !seen.contains(&c.cluster) {
                seen.push(c.cluster);
            }
        }
        seen
    }

    /// Distinct ids that have members, ascending.
    pub fn ids_sorted(&self) -> Vec<ClusterId> {
        let mut ids = self.ids_in_row_order();
        ids.sort_unstable();
        ids
    }

    pub fn cluster_count(&self) -> usize {
        self.centers.len()
    }
}

/// Standardise (lat, lon), run k-means, and map the centers back to degrees.
pub fn assign_clusters(rows: &[CityRow], cfg: &Config) -> Result<ClusterAssignment> {
    let coords: Vec<[f64; 2]> = rows.iter().map(|r| [r.position.lat, r.position.lon]).collect();
    let (scaler, scaled) = StandardScaler::fit_transform(&coords);

    let fit = KMeans::from_config(cfg)
        .fit(&scaled)
        .context("Cluster city coordinates")?;

    let centers = scaler
        .inverse_transform(&fit.centers)
        .into_iter()
        .map(|c| Coordinate::new(c[0], c[1]))
        .collect::<Vec<_>>();

    let cities = rows
        .iter()
        .zip(fit.labels.iter())
        .map(|(r, &l)| City { name: r.name.clone(), position: r.position, cluster: ClusterId(l) })
        .collect::<Vec<_>>();

    let assignment = ClusterAssignment { cities, centers, inertia: fit.inertia };
    for id in assignment.ids_sorted() {
        let c = assignment.center(id);
        info!(
            "Cluster {}: {} cities, center ({:.4}, {:.4})",
            id.ordinal(),
            assignment.members(id).count(),
            c.lat,
            c.lon
        );
    }
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, lat: f64, lon: f64) -> CityRow {
        CityRow { name: name.to_string(), position: Coordinate::new(lat, lon) }
    }

    fn cities() -> Vec<CityRow> {
        vec![
            row("Pune", 18.52, 73.85),
            row("Mumbai", 19.07, 72.87),
            row("Nashik", 20.00, 73.78),
            row("Delhi", 28.61, 77.20),
            row("Gurgaon", 28.46, 77.03),
            row("Noida", 28.53, 77.39),
            row("Bengaluru", 12.97, 77.59),
            row("Mysuru", 12.29, 76.64),
            row("Chennai", 13.08, 80.27),
            row("Kolkata", 22.57, 88.36),
            row("Howrah", 22.59, 88.26),
            row("Guwahati", 26.14, 91.73),
        ]
    }

    #[test]
    fn test_every_city_gets_an_id_below_k() {
        let cfg = Config::default();
        let a = assign_clusters(&cities(), &cfg).unwrap();
        assert_eq!(a.cities.len(), 12);
        assert_eq!(a.cluster_count(), 5);
        assert!(a.cities.iter().all(|c| c.cluster.0 < 5));
        let total: usize = a.ids_sorted().iter().map(|&id| a.members(id).count()).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_centers_match_member_means_in_degrees() {
        let cfg = Config::default();
        let a = assign_clusters(&cities(), &cfg).unwrap();
        for id in a.ids_sorted() {
            let members: Vec<&City> = a.members(id).collect();
            let n = members.len() as f64;
            let lat = members.iter().map(|c| c.position.lat).sum::<f64>() / n;
            let lon = members.iter().map(|c| c.position.lon).sum::<f64>() / n;
            let center = a.center(id);
            assert!((center.lat - lat).abs() < 1e-6);
            assert!((center.lon - lon).abs() < 1e-6);
        }
    }

    #[test]
    fn test_row_order_ids_follow_first_appearance() {
        let cfg = Config::default();
        let a = assign_clusters(&cities(), &cfg).unwrap();
        let ids = a.ids_in_row_order();
        assert_eq!(ids[0], a.cities[0].cluster);
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, a.ids_sorted());
    }

    #[test]
    fn test_too_few_cities_is_an_error() {
        let cfg = Config::default();
        let rows = vec![row("A", 1.0, 1.0), row("B", 2.0, 2.0)];
        assert!(assign_clusters(&rows, &cfg).is_err());
    }
}
