use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use super::assigner::ClusterAssignment;
use super::config::Config;
use super::models::{Marker, SegmentOutcome};
use super::reporter::NearestSummary;
use super::route_builder::ClusterRoutes;
use super::validator::RadiusWarning;

pub const TITLE: &str = "City Clustering and Route Mapping";

#[derive(Clone, Debug, Serialize)]
pub struct RouteLayer {
    pub name: String,
    pub color: String,
    pub weight: u32,
    pub opacity: f64,
    /// (lat, lon) pairs, Leaflet order.
    pub path: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MapSpec {
    pub center: [f64; 2],
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub routes: Vec<RouteLayer>,
    pub markers: Vec<Marker>,
}

#[derive(Clone, Debug)]
pub struct Dashboard {
    pub title: String,
    pub radius_km: f64,
    pub warnings: Vec<String>,
    pub nearest: Vec<NearestSummary>,
    pub route_errors: Vec<String>,
    pub map: MapSpec,
}

impl Dashboard {
    pub fn build(
        assignment: &ClusterAssignment,
        warnings: &[RadiusWarning],
        nearest: Vec<NearestSummary>,
        routes: &[ClusterRoutes],
        notices: Vec<String>,
        cfg: &Config,
    ) -> Self {
        let mut layers = Vec::new();
        let mut markers = Vec::new();
        let mut route_errors = notices;
        for r in routes {
            for seg in &r.segments {
                match &seg.outcome {
                    SegmentOutcome::Drawn(g) => layers.push(RouteLayer {
                        name: format!("Route Cluster {}", r.cluster.ordinal()),
                        color: r.color.clone(),
                        weight: 3,
                        opacity: 0.8,
                        path: g.path.iter().map(|c| [c.lat, c.lon]).collect(),
                    }),
                    SegmentOutcome::Failed(reason) => {
                        route_errors.push(format!("Routing error in cluster {}: {}", r.cluster.0, reason))
                    }
                }
            }
            markers.extend(r.markers.iter().cloned());
        }

        Self {
            title: TITLE.to_string(),
            radius_km: cfg.radius_km,
            warnings: warnings.iter().map(|w| w.to_string()).collect(),
            nearest,
            route_errors,
            map: MapSpec {
                center: map_center(assignment),
                zoom: cfg.zoom_start,
                width: cfg.map_width,
                height: cfg.map_height,
                routes: layers,
                markers,
            },
        }
    }

    pub fn render_html(&self) -> Result<String> {
        let map_json = serde_json::to_string(&self.map).context("Serialize map data")?;
        // keep "</script>" out of the inline script
        let map_json = map_json.replace("</", "<\\/");

        let mut body = String::new();
        let _ = writeln!(body, "<h1>{}</h1>", escape(&self.title));

        let _ = writeln!(body, "<h2>Cluster Radius Validation ({} km max)</h2>", self.radius_km);
        for w in &self.warnings {
            let _ = writeln!(body, "<div class=\"banner warning\">{}</div>", escape(w));
        }

        let _ = writeln!(body, "<h2>Closest 3 Cities to Each Cluster Center</h2>");
        for s in &self.nearest {
            let _ = writeln!(
                body,
                "<p><strong>Cluster {}</strong>: {}</p>",
                s.cluster.ordinal(),
                escape(&s.cities_line())
            );
        }

        let _ = writeln!(body, "<h2>Cluster Route Map</h2>");
        for e in &self.route_errors {
            let _ = writeln!(body, "<div class=\"banner error\">{}</div>", escape(e));
        }
        let _ = writeln!(
            body,
            "<div id=\"map\" style=\"width: {}px; height: {}px;\"></div>",
            self.map.width, self.map.height
        );

        Ok(page(&self.title, &body, Some(&map_json)))
    }
}

/// The only content shown when loading fails.
pub fn render_error_page(message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<div class=\"banner error\">Error loading file: {}</div>\n",
        escape(TITLE),
        escape(message)
    );
    page(TITLE, &body, None)
}

pub fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Create {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("Write {}", path.display()))
}

fn map_center(assignment: &ClusterAssignment) -> [f64; 2] {
    let n = assignment.cities.len();
    if n == 0 {
        return [0.0, 0.0];
    }
    let lat = assignment.cities.iter().map(|c| c.position.lat).sum::<f64>() / n as f64;
    let lon = assignment.cities.iter().map(|c| c.position.lon).sum::<f64>() / n as f64;
    [lat, lon]
}

fn page(title: &str, body: &str, map_json: Option<&str>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(title));
    if map_json.is_some() {
        html.push_str(concat!(
            "<link rel=\"stylesheet\" href=\"https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css\" crossorigin=\"anonymous\" referrerpolicy=\"no-referrer\" />\n",
            "<script src=\"https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js\" crossorigin=\"anonymous\" referrerpolicy=\"no-referrer\"></script>\n",
        ));
    }
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n<main>\n");
    html.push_str(body);
    html.push_str("</main>\n");
    if let Some(json) = map_json {
        let _ = writeln!(html, "<script>\nconst MAP = {};\n{}</script>", json, MAP_SCRIPT);
    }
    html.push_str("</body>\n</html>\n");
    html
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"<style>
  body { margin: 0; font-family: sans-serif; }
  main { width: 100%; box-sizing: border-box; padding: 1rem 2rem; }
  .banner { padding: .6rem 1rem; margin: .4rem 0; border-radius: 6px; }
  .warning { background: #fff4d6; color: #6b4e00; }
  .error { background: #fde2e1; color: #8a1c14; }
</style>
"#;

const MAP_SCRIPT: &str = r#"const map = L.map('map').setView(MAP.center, MAP.zoom);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  maxZoom: 18,
  attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);
for (const r of MAP.routes) {
  L.polyline(r.path, { color: r.color, weight: r.weight, opacity: r.opacity }).bindTooltip(document.createTextNode(r.name)).addTo(map);
}
for (const m of MAP.markers) {
  L.circleMarker([m.position.lat, m.position.lon], { radius: 8, color: m.color, fillColor: m.color, fillOpacity: 0.9 })
    .bindPopup(document.createTextNode(m.popup))
    .addTo(map);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::dashboard::models::{City, ClusterId, Coordinate, RouteGeometry, RouteSegment};
    use crate::commands::dashboard::reporter::NearestEntry;

    fn sample() -> Dashboard {
        let a = ClusterAssignment {
            cities: vec![
                City { name: "A".into(), position: Coordinate::new(10.0, 20.0), cluster: ClusterId(0) },
                City { name: "B".into(), position: Coordinate::new(12.0, 22.0), cluster: ClusterId(0) },
            ],
            centers: vec![Coordinate::new(11.0, 21.0)],
            inertia: 0.0,
        };
        let seg = |outcome| RouteSegment {
            cluster: ClusterId(0),
            from: "A".into(),
            to: "B".into(),
            start: Coordinate::new(10.0, 20.0),
            end: Coordinate::new(12.0, 22.0),
            outcome,
        };
        let routes = vec![ClusterRoutes {
            cluster: ClusterId(0),
            color: "red".into(),
            order: Vec::new(),
            segments: vec![
                seg(SegmentOutcome::Drawn(RouteGeometry { path: vec![Coordinate::new(10.0, 20.0), Coordinate::new(12.0, 22.0)] })),
                seg(SegmentOutcome::Failed("HTTP 429: Quota exceeded".into())),
            ],
            markers: vec![Marker {
                cluster: ClusterId(0),
                name: "A".into(),
                position: Coordinate::new(10.0, 20.0),
                color: "red".into(),
                popup: "A (Cluster 1)".into(),
            }],
        }];
        let warnings = vec![RadiusWarning {
            cluster: ClusterId(0),
            city: "<B>".into(),
            distance_km: 160.0,
            threshold_km: 150.0,
        }];
        let nearest = vec![NearestSummary {
            cluster: ClusterId(0),
            nearest: vec![NearestEntry { city: "A".into(), distance_km: 1.24 }],
        }];
        Dashboard::build(&a, &warnings, nearest, &routes, Vec::new(), &Config::default())
    }

    #[test]
    fn test_build_splits_drawn_and_failed_segments() {
        let d = sample();
        assert_eq!(d.map.routes.len(), 1);
        assert_eq!(d.map.routes[0].path[0], [10.0, 20.0]);
        assert_eq!(d.route_errors, vec!["Routing error in cluster 0: HTTP 429: Quota exceeded".to_string()]);
        assert_eq!(d.map.markers.len(), 1);
        assert_eq!(d.map.center, [11.0, 21.0]);
        assert_eq!((d.map.width, d.map.height), (1000, 600));
    }

    #[test]
    fn test_html_contains_sections_and_escapes_text() {
        let html = sample().render_html().unwrap();
        assert!(html.contains("<h1>City Clustering and Route Mapping</h1>"));
        assert!(html.contains("Cluster 0 exceeds 150 km: &lt;B&gt; - 160.00 km"));
        assert!(html.contains("<strong>Cluster 1</strong>: A (1.2 km)"));
        assert!(html.contains("width: 1000px; height: 600px;"));
        assert!(html.contains("const MAP = "));
        assert_eq!(html.matches("class=\"banner error\"").count(), 1);
    }

    #[test]
    fn test_error_page_has_only_the_error() {
        let html = render_error_page("XLSX file not found: x.xlsx");
        assert!(html.contains("Error loading file: XLSX file not found: x.xlsx"));
        assert!(!html.contains("id=\"map\""));
        assert!(!html.contains("leaflet"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
    }
}
