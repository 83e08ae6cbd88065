use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use super::config::Config;
use super::models::{Coordinate, RouteGeometry};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid routing URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Body(#[from] serde_json::Error),
    #[error("response contains no route geometry")]
    NoGeometry,
}

/// Something that can produce a drivable path between two points.
pub trait RouteProvider {
    fn directions(&self, start: Coordinate, end: Coordinate) -> Result<RouteGeometry, RouteError>;
}

/// Blocking client for the openrouteservice directions endpoint.
pub struct OrsClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl OrsClient {
    pub fn new(base_url: &str, profile: &str, api_key: &str) -> Result<Self, RouteError> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, endpoint: directions_url(base_url, profile)?, api_key: api_key.to_string() })
    }

    /// `None` when no API key is configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>, RouteError> {
        match cfg.api_key.as_deref() {
            Some(key) => Ok(Some(Self::new(&cfg.routing_url, &cfg.profile, key)?)),
            None => Ok(None),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl RouteProvider for OrsClient {
    fn directions(&self, start: Coordinate, end: Coordinate) -> Result<RouteGeometry, RouteError> {
        let body = json!({ "coordinates": [start.lon_lat(), end.lon_lat()] });
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/geo+json, application/json")
            .body(body.to_string())
            .send()?;
        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            return Err(RouteError::Status { status: status.as_u16(), body: error_message(&text) });
        }
        parse_geojson(&text)
    }
}

pub fn directions_url(base_url: &str, profile: &str) -> Result<Url, RouteError> {
    let base = Url::parse(base_url.trim_end_matches('/'))?;
    let path = format!("{}/v2/directions/{}/geojson", base.path().trim_end_matches('/'), profile);
    let mut url = base;
    url.set_path(&path);
    Ok(url)
}

/// Concatenates the LineString coordinates of every feature in a
/// FeatureCollection (or a bare Feature / geometry).
pub fn parse_geojson(text: &str) -> Result<RouteGeometry, RouteError> {
    let doc: Value = serde_json::from_str(text)?;
    let mut path = Vec::new();
    collect_lines(&doc, &mut path);
    if path.is_empty() {
        return Err(RouteError::NoGeometry);
    }
    Ok(RouteGeometry { path })
}

fn collect_lines(v: &Value, out: &mut Vec<Coordinate>) {
    match v.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => {
            if let Some(features) = v.get("features").and_then(Value::as_array) {
                for f in features {
                    collect_lines(f, out);
                }
            }
        }
        Some("Feature") => {
            if let Some(g) = v.get("geometry") {
                collect_lines(g, out);
            }
        }
        Some("LineString") => {
            if let Some(coords) = v.get("coordinates").and_then(Value::as_array) {
                out.extend(coords.iter().filter_map(lon_lat));
            }
        }
        Some("MultiLineString") => {
            if let Some(lines) = v.get("coordinates").and_then(Value::as_array) {
                for line in lines.iter().filter_map(Value::as_array) {
                    out.extend(line.iter().filter_map(lon_lat));
                }
            }
        }
        _ => {}
    }
}

fn lon_lat(v: &Value) -> Option<Coordinate> {
    let pair = v.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    Some(Coordinate::new(lat, lon))
}

/// openrouteservice wraps errors as `{"error": {"message": ..}}` or `{"error": ".."}`.
fn error_message(text: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(text).ok();
    let msg = parsed.as_ref().and_then(|v| {
        let e = v.get("error")?;
        e.get("message").and_then(Value::as_str).or_else(|| e.as_str()).map(str::to_string)
    });
    msg.unwrap_or_else(|| text.trim().chars().take(200).collect())
}
