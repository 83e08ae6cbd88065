use anyhow::Result;
use clap::{Args, Subcommand};
use log::{error, info};
use std::path::PathBuf;

pub mod config;
pub mod logging;
pub mod models;
pub mod loader;
pub mod scaler;
pub mod kmeans;
pub mod geodesic;
pub mod assigner;
pub mod validator;
pub mod reporter;
pub mod routing;
pub mod route_builder;
pub mod render;
pub mod executor;

#[derive(Args, Debug, Clone, Default)]
pub struct CommonOpts {
    /// Workbook with the city sheet (default: ClusterLatlong.xlsx or CITYMAP_INPUT)
    #[arg(long = "input")]
    pub input: Option<PathBuf>,
    /// Where to write the HTML dashboard (default: cluster_map.html or CITYMAP_OUTPUT)
    #[arg(long = "output")]
    pub output: Option<PathBuf>,
    /// Number of worker threads for clustering restarts (rayon)
    #[arg(long = "threads")]
    pub threads: Option<usize>,
    /// Draw markers only; make no routing requests
    #[arg(long = "skip-routes")]
    pub skip_routes: bool,
    /// Base URL of the routing service
    #[arg(long = "routing-url")]
    pub routing_url: Option<String>,
    /// Log level (trace|debug|info|warn|error)
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DashboardCommand {
    /// Print cities farther than the radius threshold from their cluster center
    #[command(name = "validate")]
    Validate,
    /// Print the cities closest to each cluster center
    #[command(name = "nearest")]
    Nearest,
    /// Run the whole pipeline and write the HTML dashboard
    #[command(name = "render")]
    Render,
}

/// CLI first, then environment on top (env wins when set).
pub fn resolve_config(common: &CommonOpts) -> config::Config {
    let mut cfg = config::Config {
        input: common.input.clone(),
        output: common.output.clone(),
        threads: common.threads,
        skip_routes: common.skip_routes,
        log_level: common.log_level.clone(),
        ..config::Config::default()
    };
    if let Some(url) = &common.routing_url {
        cfg.routing_url = url.clone();
    }

    let env_cfg = config::Config::from_env_defaults();
    if env_cfg.input.is_some() { cfg.input = env_cfg.input; }
    if env_cfg.output.is_some() { cfg.output = env_cfg.output; }
    if env_cfg.threads.is_some() { cfg.threads = env_cfg.threads; }
    if env_cfg.skip_routes { cfg.skip_routes = true; }
    if env_cfg.routing_url != config::DEFAULT_ROUTING_URL { cfg.routing_url = env_cfg.routing_url; }
    if env_cfg.log_level.is_some() { cfg.log_level = env_cfg.log_level; }
    cfg.api_key = env_cfg.api_key;
    cfg
}

pub fn cmd_dashboard(common: CommonOpts, sub: DashboardCommand) -> Result<()> {
    let cfg = resolve_config(&common);

    logging::init(cfg.log_level.as_deref());
    if let Some(n) = cfg.threads {
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    }

    let (def_input, def_output) = crate::util::default_paths();
    let input = cfg.input.clone().unwrap_or(def_input);
    let output = cfg.output.clone().unwrap_or(def_output);

    let workbook = match loader::load_workbook(&input, &cfg) {
        Ok(wb) => wb,
        Err(e) => {
            error!("Error loading file: {:#}", e);
            if matches!(sub, DashboardCommand::Render) {
                render::write_page(&output, &render::render_error_page(&format!("{:#}", e)))?;
            }
            return Err(e);
        }
    };

    match sub {
        DashboardCommand::Validate => {
            let assignment = assigner::assign_clusters(&workbook.cities, &cfg)?;
            let mut n = 0usize;
            for w in validator::radius_warnings(&assignment, cfg.radius_km) {
                println!("{}", w);
                n += 1;
            }
            println!("{} cit{} beyond {} km", n, if n == 1 { "y" } else { "ies" }, cfg.radius_km);
            Ok(())
        }
        DashboardCommand::Nearest => {
            let assignment = assigner::assign_clusters(&workbook.cities, &cfg)?;
            for s in reporter::nearest_to_center(&assignment, cfg.nearest_count) {
                println!("{}", s);
            }
            Ok(())
        }
        DashboardCommand::Render => {
            let client = if cfg.skip_routes { None } else { routing::OrsClient::from_config(&cfg)? };
            let provider = client.as_ref().map(|c| c as &dyn routing::RouteProvider);
            let run = executor::run_pipeline(&workbook.cities, &cfg, provider)?;
            let html = run.dashboard.render_html()?;
            render::write_page(&output, &html)?;
            info!("Dashboard written to {}", output.display());
            println!("Dashboard written to {}", output.display());
            Ok(())
        }
    }
}
