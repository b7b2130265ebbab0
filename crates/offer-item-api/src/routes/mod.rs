//! Route modules, one per operation family.

use axum::Router;

use crate::state::AppState;

pub mod assignees;
pub mod examinations;
pub mod health;
pub mod offer_items;

/// Every route of the service, ready for state.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest(
            "/api/v1/offer-items",
            offer_items::router()
                .merge(assignees::offer_item_router())
                .merge(examinations::router()),
        )
        .nest("/api/v1/assignees", assignees::blogger_router())
}

/// Acknowledgement returned by command endpoints without a payload.
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
