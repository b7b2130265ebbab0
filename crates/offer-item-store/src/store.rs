//! Transaction management.

use async_trait::async_trait;
use offer_item_core::error::DomainError;
use offer_item_lifecycle::domain::repository::{Store, UnitOfWork};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::error::map_sqlx;

/// PostgreSQL-backed store. Every unit of work is one serializable
/// transaction.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// One open transaction. Dropping it without [`UnitOfWork::commit`] rolls
/// back.
pub struct PgUnitOfWork {
    pub(crate) tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let Self { tx } = *self;
        tx.commit().await.map_err(map_sqlx)?;
        debug!("transaction committed");
        Ok(())
    }
}

/// Appends a row lock clause when requested.
pub(crate) fn lock_clause(with_lock: bool) -> &'static str {
    if with_lock { " FOR UPDATE" } else { "" }
}
