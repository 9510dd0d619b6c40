use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod constants;
mod feed;
mod html_template;
mod mapper;
mod processing;
mod server;
mod settings;
mod utils;

use feed::{build_client, fetch_feed};
use html_template::export_map_page;
use processing::build_markers;
use server::{bind_listener, start_server, AppState};
use settings::Settings;

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("quakemap=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    info!("QuakeMap v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = Settings::config_path();
    let settings = Settings::load().context("Failed to load settings")?;
    if !config_path.exists() {
        match settings.save() {
            Ok(()) => info!("Wrote default config to {}", config_path.display()),
            Err(e) => warn!("Could not write default config: {:#}", e),
        }
    }

    let client = build_client(settings.request_timeout_secs)?;
    let collection = fetch_feed(&client, &settings.feed_url)
        .await
        .context("Failed to fetch earthquake feed")?;

    let marker_set = build_markers(&collection, settings.min_radius);
    for band in &marker_set.summary.bands {
        info!("  {:>7} km  {:<12} {}", band.label, band.color.css_name(), band.count);
    }

    if let Some(export_path) = &settings.export_path {
        export_map_page(&settings, &marker_set.markers, Path::new(export_path))?;
        info!("Standalone map written to {}", export_path);
    }

    let listener = bind_listener(settings.port).await?;

    if settings.auto_open_browser {
        let url = settings.server_url();
        if let Err(e) = utils::open_browser(&url) {
            warn!("Could not open browser at {}: {}", url, e);
        }
    }

    start_server(listener, AppState::new(marker_set, settings)).await?;

    Ok(())
}
