use anyhow::Result;
use log::{info, warn};

use super::assigner::{self, ClusterAssignment};
use super::config::Config;
use super::models::CityRow;
use super::render::Dashboard;
use super::reporter::{self, NearestSummary};
use super::route_builder::{self, ClusterRoutes};
use super::routing::RouteProvider;
use super::validator::{self, RadiusWarning};

pub const ROUTING_DISABLED: &str = "Routing disabled: set ORS_API_KEY to draw driving routes";

#[derive(Clone, Debug, Default)]
pub struct ExecStats {
    pub cities: usize,
    pub clusters: usize,
    pub warnings: usize,
    pub segments_drawn: usize,
    pub segments_failed: usize,
    pub markers: usize,
}

#[derive(Clone, Debug)]
pub struct RunOutput {
    pub assignment: ClusterAssignment,
    pub warnings: Vec<RadiusWarning>,
    pub nearest: Vec<NearestSummary>,
    pub routes: Vec<ClusterRoutes>,
    pub dashboard: Dashboard,
    pub stats: ExecStats,
}

/// One full pass over the loaded rows: cluster, validate, report, route, lay out the page.
/// Only clustering can fail; route failures end up on their segments.
pub fn run_pipeline(rows: &[CityRow], cfg: &Config, provider: Option<&dyn RouteProvider>) -> Result<RunOutput> {
    let mut stats = ExecStats { cities: rows.len(), ..ExecStats::default() };

    let assignment = assigner::assign_clusters(rows, cfg)?;
    stats.clusters = assignment.ids_sorted().len();

    let warnings: Vec<RadiusWarning> = validator::radius_warnings(&assignment, cfg.radius_km)
        .inspect(|w| warn!("{}", w))
        .collect();
    stats.warnings = warnings.len();

    let nearest = reporter::nearest_to_center(&assignment, cfg.nearest_count);
    for s in &nearest {
        info!("{}", s);
    }

    let mut notices = Vec::new();
    let provider = if cfg.skip_routes { None } else { provider };
    if provider.is_none() && !cfg.skip_routes {
        warn!("{}", ROUTING_DISABLED);
        notices.push(ROUTING_DISABLED.to_string());
    }
    let routes = route_builder::build_routes(&assignment, provider, cfg);
    for r in &routes {
        stats.segments_drawn += r.segments.iter().filter(|s| s.is_drawn()).count();
        stats.segments_failed += r.failures().count();
        stats.markers += r.markers.len();
    }

    let dashboard = Dashboard::build(&assignment, &warnings, nearest.clone(), &routes, notices, cfg);
    info!(
        "Done: {} cities, {} clusters, {} warnings, {} routes drawn, {} failed, {} markers",
        stats.cities, stats.clusters, stats.warnings, stats.segments_drawn, stats.segments_failed, stats.markers
    );
    Ok(RunOutput { assignment, warnings, nearest, routes, dashboard, stats })
}
