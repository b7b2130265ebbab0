//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use offer_item_api::routes;
use offer_item_api::state::AppState;
use offer_item_lifecycle::application::offer_item_handlers::ValidationSettings;
use offer_item_store::{PgCatalogAdapter, PgStore};
use offer_item_test_support::fixtures::{catalog_df_item, catalog_item};
use offer_item_test_support::{FixedClock, SequenceIdGenerator};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

/// Build the full app router over a real `PgStore` with a deterministic
/// clock and id sequence. The catalog mirror is seeded with the fixture
/// item and DF item.
pub async fn build_test_app(pool: PgPool) -> Router {
    let catalog = PgCatalogAdapter::new(pool.clone());
    catalog.put_item(&catalog_item()).await.unwrap();
    catalog.put_df_item(&catalog_df_item()).await.unwrap();

    let app_state = AppState::new(
        pool.clone(),
        Arc::new(FixedClock::standard()),
        Arc::new(SequenceIdGenerator::new()),
        Arc::new(PgStore::new(pool)),
        Arc::new(catalog),
        ValidationSettings::default(),
    );
    routes::api_router().with_state(app_state)
}

/// A valid creation body for the fixture catalog item.
pub fn save_body() -> Value {
    json!({
        "name": "Spring serum campaign",
        "item_id": "item-1",
        "post_target": "ameba",
        "texts": {
            "product_features": "Lightweight serum",
            "cautionary_points": "No competitor products",
            "reference_info": "https://shop.example/serum",
            "other_info": "Show the bottle"
        },
        "schedules": [
            {
                "schedule_type": "invitation",
                "start_date": "2026-01-01T10:00:00Z",
                "end_date": "2026-01-10T10:00:00Z"
            },
            {
                "schedule_type": "article_posting",
                "start_date": "2026-01-11T10:00:00Z",
                "end_date": "2026-01-20T10:00:00Z"
            },
            { "schedule_type": "payment", "end_date": "2026-01-31T10:00:00Z" }
        ],
        "drafted_item_info": {
            "name": "Hydrating Serum",
            "content_name": "Acme Cosmetics",
            "image_url": "https://img.example/serum.png",
            "url": "https://shop.example/serum",
            "min_commission": { "commission_type": "fixed_rate", "calculated_rate": 5.0 },
            "max_commission": { "commission_type": "fixed_rate", "calculated_rate": 8.0 }
        }
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}
