use log::{debug, warn};
use std::thread;

use super::assigner::ClusterAssignment;
use super::config::Config;
use super::geodesic::geodesic_km;
use super::models::{City, ClusterId, Marker, RouteSegment, SegmentOutcome};
use super::routing::RouteProvider;

#[derive(Clone, Debug)]
pub struct ClusterRoutes {
    pub cluster: ClusterId,
    pub color: String,
    /// Visiting order with each city's distance from the reference city.
    pub order: Vec<(City, f64)>,
    pub segments: Vec<RouteSegment>,
    pub markers: Vec<Marker>,
}

impl ClusterRoutes {
    pub fn failures(&self) -> impl Iterator<Item = (&RouteSegment, &str)> {
        self.segments.iter().filter_map(|s| match &s.outcome {
            SegmentOutcome::Failed(reason) => Some((s, reason.as_str())),
            SegmentOutcome::Drawn(_) => None,
        })
    }
}

/// Members sorted by geodesic distance from the first member in row order.
/// A proximity heuristic, not a shortest tour.
pub fn visiting_order<'a>(members: impl IntoIterator<Item = &'a City>) -> Vec<(City, f64)> {
    let members: Vec<&City> = members.into_iter().collect();
    let Some(reference) = members.first().map(|c| c.position) else {
        return Vec::new();
    };
    let mut order: Vec<(City, f64)> = members
        .into_iter()
        .map(|c| (c.clone(), geodesic_km(reference, c.position)))
        .collect();
    // stable: equal distances keep row order
    order.sort_by(|a, b| a.1.total_cmp(&b.1));
    order
}

/// Requests one route per consecutive pair of every cluster's visiting order.
/// A failed request is recorded on its segment and the loop moves on; the
/// configured pause follows every request. Without a provider no requests
/// are made and only markers are produced.
pub fn build_routes(
    assignment: &ClusterAssignment,
    provider: Option<&dyn RouteProvider>,
    cfg: &Config,
) -> Vec<ClusterRoutes> {
    let mut out = Vec::new();
    for id in assignment.ids_sorted() {
        let color = cfg.color_for(id.0).to_string();
        let order = visiting_order(assignment.members(id));

        let mut segments = Vec::new();
        if let Some(provider) = provider {
            for pair in order.windows(2) {
                let (from, to) = (&pair[0].0, &pair[1].0);
                let outcome = match provider.directions(from.position, to.position) {
                    Ok(geometry) => {
                        debug!(
                            "Cluster {}: {} -> {} ({} points)",
                            id.ordinal(),
                            from.name,
                            to.name,
                            geometry.path.len()
                        );
                        SegmentOutcome::Drawn(geometry)
                    }
                    Err(e) => {
                        warn!("Routing error in cluster {} ({} -> {}): {}", id.0, from.name, to.name, e);
                        SegmentOutcome::Failed(e.to_string())
                    }
                };
                segments.push(RouteSegment {
                    cluster: id,
                    from: from.name.clone(),
                    to: to.name.clone(),
                    start: from.position,
                    end: to.position,
                    outcome,
                });
                if !cfg.throttle.is_zero() {
                    thread::sleep(cfg.throttle);
                }
            }
        }

        let markers = order
            .iter()
            .map(|(c, _)| Marker {
                cluster: id,
                name: c.name.clone(),
                position: c.position,
                color: color.clone(),
                popup: format!("{} (Cluster {})", c.name, id.ordinal()),
            })
            .collect();

        out.push(ClusterRoutes { cluster: id, color, order, segments, markers });
    }
    out
}
