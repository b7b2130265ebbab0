//! Shared application state.

use std::sync::Arc;

use offer_item_core::clock::Clock;
use offer_item_core::id::IdGenerator;
use offer_item_lifecycle::application::offer_item_handlers::{SaveContext, ValidationSettings};
use offer_item_lifecycle::domain::catalog::CatalogAdapter;
use offer_item_lifecycle::domain::repository::Store;
use sqlx::PgPool;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub store: Arc<dyn Store>,
    pub catalog: Arc<dyn CatalogAdapter>,
    pub settings: ValidationSettings,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        db_pool: PgPool,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        store: Arc<dyn Store>,
        catalog: Arc<dyn CatalogAdapter>,
        settings: ValidationSettings,
    ) -> Self {
        Self {
            db_pool,
            clock,
            ids,
            store,
            catalog,
            settings,
        }
    }

    /// Collaborators for the save handler, borrowed from this state.
    #[must_use]
    pub fn save_context(&self) -> SaveContext<'_> {
        SaveContext {
            settings: &self.settings,
            clock: self.clock.as_ref(),
            ids: self.ids.as_ref(),
            catalog: self.catalog.as_ref(),
        }
    }
}
