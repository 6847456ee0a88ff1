/// ToO request portal and observatory dashboard service
mod chart;
mod clients;
mod config;
mod coords;
mod domain;
mod errors;
mod handlers;
mod routes;
mod services;
mod utils;
mod views;

use crate::clients::ObservatoryClient;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::{AccessService, DashboardService, FormService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded, backend at {}", config.upstream_url);

    // One shared client for every view
    let client = Arc::new(ObservatoryClient::new(
        config.upstream_url.clone(),
        &config.http,
    )?);
    info!("Observatory client ready for {}", client.base_url());

    // Initialize services
    let state = AppState {
        dashboard_service: Arc::new(DashboardService::new(client.clone())),
        form_service: Arc::new(FormService::new(client.clone())),
        access_service: Arc::new(AccessService::new(client)),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("too_portal listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
