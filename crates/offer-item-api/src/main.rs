//! Offer item API server entry point.

use std::sync::Arc;

use offer_item_api::config::Config;
use offer_item_api::error::AppError;
use offer_item_api::routes;
use offer_item_api::state::AppState;
use offer_item_api::telemetry;
use offer_item_core::clock::SystemClock;
use offer_item_core::id::RandomIdGenerator;
use offer_item_lifecycle::application::offer_item_handlers::ValidationSettings;
use offer_item_store::{PgCatalogAdapter, PgStore};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    let tracer_provider = telemetry::init_tracing(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting offer item API server");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let app_state = AppState::new(
        pool.clone(),
        Arc::new(SystemClock),
        Arc::new(RandomIdGenerator),
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(PgCatalogAdapter::new(pool)),
        ValidationSettings {
            max_input_assignee_list_num: config.max_input_assignee_list_num,
        },
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::api_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "failed to flush spans");
        }
    }

    Ok(())
}
