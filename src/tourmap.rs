use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::backend::Backend;
use crate::config::Config;
use crate::gui::TourMapApp;

mod backend;
mod camera;
mod config;
mod feed;
mod geometry;
mod gui;
mod markers;
mod position;
mod route;

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("APP_GIT_HASH"), ")"),
    about = "Shows the live position and travelled path of a tour on a map.",
    long_about = None
)]
struct Cli {
    /// Tour identifier used in the API paths
    tour_id: String,

    /// Map backend to start with
    #[arg(long, value_enum, default_value_t = Backend::HostedTile)]
    backend: Backend,

    /// Config file (default: tourmap.conf in the user config dir)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides api_base_url from the config
    #[arg(long, value_name = "URL")]
    api_base_url: Option<String>,
}

impl Cli {
    fn validate(&self) -> Result<(), String> {
        if self.tour_id.trim().is_empty() {
            return Err("Tour id must not be empty".to_string());
        }
        if self.tour_id.contains('/') {
            return Err(format!("Invalid tour id '{}'", self.tour_id));
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let mut config = Config::load_or_create(&config_path)
        .with_context(|| format!("Loading config {:?}", config_path))?;
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }

    tracing::info!("tour #{} with {} backend, config {:?}", cli.tour_id, cli.backend, config_path);

    TourMapApp::run(config, cli.tour_id, cli.backend)
        .map_err(|e| anyhow::anyhow!("GUI failed: {}", e))
}
