use std::sync::Arc;

use mockable::DefaultClock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use homeservice::config::AppConfig;
use homeservice::db::{self, SqliteStore};
use homeservice::handlers;
use homeservice::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        allowed = ?config.transitions.allowed_targets,
        enforce_graph = config.transitions.enforce_graph,
        "booking status policy"
    );

    let conn = db::init_db(&config.database_url)?;
    let store = Arc::new(SqliteStore::new(conn));
    let port = config.port;

    let state = Arc::new(AppState::new(config, store, Arc::new(DefaultClock)));

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
