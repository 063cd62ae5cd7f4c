pub mod types;
pub mod config;
pub mod data;
pub mod matching;
pub mod viewport;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the choropleth figures and table data for the dashboard
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the generated dashboard and the data API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            println!("Generating dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let dataset = data::load_dataset(&app_config.input.analysis_json)?;
            render::generate_site(&app_config, &dataset)?;

            println!("Generation complete!");
        }
        Commands::Serve { config } => {
            println!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let dataset = data::load_dataset(&app_config.input.analysis_json)?;
            server::start_server(app_config, dataset).await?;
        }
    }

    Ok(())
}
