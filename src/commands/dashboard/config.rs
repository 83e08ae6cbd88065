use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_ROUTING_URL: &str = "https://api.openrouteservice.org";

#[derive(Clone, Debug)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub cities_sheet: String,
    pub secondary_sheet: String,
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
    pub radius_km: f64,
    pub nearest_count: usize,
    pub api_key: Option<String>,
    pub routing_url: String,
    pub profile: String,
    pub throttle: Duration,
    pub skip_routes: bool,
    pub palette: Vec<String>,
    pub map_width: u32,
    pub map_height: u32,
    pub zoom_start: u8,
    pub threads: Option<usize>,
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            cities_sheet: "Sheet1".to_string(),
            secondary_sheet: "Sheet2".to_string(),
            n_clusters: 5,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
            radius_km: 150.0,
            nearest_count: 3,
            api_key: None,
            routing_url: DEFAULT_ROUTING_URL.to_string(),
            profile: "driving-car".to_string(),
            throttle: Duration::from_secs(1),
            skip_routes: false,
            palette: [
                "red", "blue", "green", "purple", "orange", "darkred", "cadetblue", "black",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            map_width: 1000,
            map_height: 600,
            zoom_start: 6,
            threads: None,
            log_level: None,
        }
    }
}

impl Config {
    /// Only the fields that may come from the environment are populated;
    /// everything else keeps its default.
    pub fn from_env_defaults() -> Self {
        let input = env::var("CITYMAP_INPUT").ok().map(PathBuf::from);
        let output = env::var("CITYMAP_OUTPUT").ok().map(PathBuf::from);
        let threads = env::var("CITYMAP_THREADS").ok().and_then(|s| s.parse::<usize>().ok());
        let skip_routes = env::var("CITYMAP_SKIP_ROUTES").ok().map(|v| parse_flag(&v)).unwrap_or(false);
        let routing_url = env::var("CITYMAP_ROUTING_URL").ok().filter(|s| !s.trim().is_empty());
        let log_level = env::var("CITYMAP_LOG_LEVEL").ok();
        let api_key = env::var("ORS_API_KEY").ok().filter(|s| !s.trim().is_empty());
        Self {
            input,
            output,
            threads,
            skip_routes,
            routing_url: routing_url.unwrap_or_else(|| DEFAULT_ROUTING_URL.to_string()),
            log_level,
            api_key,
            ..Self::default()
        }
    }

    /// Colour for a cluster id, cycling through the palette.
    pub fn color_for(&self, cluster: usize) -> &str {
        if self.palette.is_empty() {
            return "blue";
        }
        &self.palette[cluster % self.palette.len()]
    }
}

fn parse_flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
