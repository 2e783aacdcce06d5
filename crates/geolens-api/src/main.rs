use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use geolens_core::config::GeoLensConfig;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geolens_api::router::create_router;
use geolens_api::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geolens_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = env::var("GEOLENS_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3001);

    let config_path = env::var("GEOLENS_CONFIG").ok().map(PathBuf::from);
    let config = match GeoLensConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        port = port,
        region = %config.region.name,
        data_dir = %config.data_dir.display(),
        "Starting GeoLens API server"
    );

    // All signal sources are wired exactly once, before the first request
    let state = match AppState::initialize(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to initialize: {:#}", e);
            tracing::error!(
                "Remediation:\n\
                1. Check GEOLENS_DATA_DIR points at the intended data directory\n\
                2. Rebuild the index artifacts with `geolens build` if they are inconsistent\n\
                3. Verify GEOLENS_INFERENCE_URL and GEOLENS_OVERPASS_URL are reachable"
            );
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = create_router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
