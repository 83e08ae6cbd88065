use anyhow::Result;
use clap::{Parser, Subcommand};

use city_cluster_map::commands::dashboard::{self, CommonOpts, DashboardCommand};

#[derive(Parser, Debug)]
#[command(name = "city_cluster_map", version, about = "Cluster cities from a spreadsheet and map driving routes per cluster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cluster the city sheet and validate, report or render the result
    Dashboard {
        #[command(flatten)]
        common: CommonOpts,
        #[command(subcommand)]
        sub: DashboardCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Dashboard { common, sub } => dashboard::cmd_dashboard(common, sub),
    }
}
