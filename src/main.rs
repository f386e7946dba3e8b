// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::row_source::RowSource;
use crate::infrastructure::config::{load_source_config, load_widgets_config, SourceSettings};
use crate::infrastructure::csv_source::CsvRowSource;
use crate::infrastructure::sheets_source::SheetsRowSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_dashboard, get_table, health_check};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG wins over the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let source_config = load_source_config()?;
    let widgets_config = load_widgets_config()?;

    // Create row source (infrastructure layer)
    let source: Arc<dyn RowSource> = match source_config.source {
        SourceSettings::Sheets(settings) => {
            if source_config.credentials.access_token.is_none()
                && source_config.credentials.api_key.is_none()
            {
                tracing::warn!("No Sheets credentials configured, requests will be anonymous");
            }
            Arc::new(SheetsRowSource::new(settings, source_config.credentials))
        }
        SourceSettings::Csv(settings) => Arc::new(CsvRowSource::new(settings.path)),
    };
    tracing::info!("Reading rows from {}", source.describe());

    // Create services (application layer)
    let dashboard_service = DashboardService::new(source, widgets_config);
    let state = Arc::new(AppState { dashboard_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/table", get(get_table))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = source_config.server.bind.parse()?;
    tracing::info!("Starting gpc-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
