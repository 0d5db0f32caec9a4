mod error;
mod middleware;
mod routes;
mod state;

use anyhow::Context;
use http::{header, HeaderValue, Method};
use std::{sync::Arc, time::Duration};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ce_adapters::{simulated_service, FixtureEventRepository};
use ce_config::Config;
use ce_storage::{DurableStorage, FileStorage};
use ce_store::{AdminEvents, BookingStore};
use state::AppState;

/// CORS for the browser portal
fn build_cors_layer(config: &Config) -> CorsLayer {
    let portal_origin = config.portal_origin.clone();

    let origin_pred = AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
        middleware::cors::origin_allowed(origin, portal_origin.as_deref())
    });

    CorsLayer::new()
        .allow_origin(origin_pred)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
        .allow_credentials(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing (JSON logs)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .init();

    let config = Config::load()?;
    info!("Starting ce-api on {}", config.bind_addr);

    let storage: Arc<dyn DurableStorage> = Arc::new(FileStorage::open(&config.data_dir)?);

    let timeout = (config.booking_timeout_ms > 0).then(|| Duration::from_millis(config.booking_timeout_ms));
    let service = simulated_service(
        Duration::from_millis(config.booking_latency_ms),
        config.booking_failure_rate,
        timeout,
    );

    let store = Arc::new(BookingStore::with_service(Arc::clone(&storage), service));
    let admin = Arc::new(AdminEvents::new(Arc::clone(&storage)));
    let repository = Arc::new(FixtureEventRepository::new(&config.events_fixture, storage));
    let state = AppState::new(store, admin, repository, config.admin_enabled);

    // Serve bookings even if the catalog is missing; clients can retry via /events/refresh.
    if let Err(e) = state.refresh().await {
        warn!(error = %e, "initial catalog load failed");
    }

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    Ok(())
}
