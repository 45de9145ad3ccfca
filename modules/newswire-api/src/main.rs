use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use newswire_common::Config;
use newswire_store::Store;

mod rest;

pub struct AppState {
    pub store: Store,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match Config::api_from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Missing required configuration");
            std::process::exit(1);
        }
    };

    let store = match Store::connect(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Failed to connect to Postgres");
            std::process::exit(1);
        }
    };
    store.migrate().await?;

    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/scrape-article", post(rest::scrape_article))
        .route("/scrape-source", post(rest::scrape_source))
        .route("/process-sources", post(rest::process_sources))
        .route("/scrape-multiple-sources", post(rest::scrape_multiple_sources))
        .route("/jobs/{id}", get(rest::get_job))
        .route("/health", get(rest::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(addr, "Newswire API listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
