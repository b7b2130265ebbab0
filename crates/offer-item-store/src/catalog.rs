//! A catalog adapter reading product snapshots from the `catalog_item`
//! table.
//!
//! Rows are JSON documents keyed by kind (`item` or `df_item`) and id, kept
//! in sync by whatever feeds the catalog. Missing DF variants fall back to an
//! id-only placeholder so a campaign can still be saved.

use std::collections::HashMap;

use async_trait::async_trait;
use offer_item_core::error::DomainError;
use offer_item_lifecycle::domain::catalog::{CatalogAdapter, CatalogItems};
use offer_item_lifecycle::domain::ids::{DfItemId, ItemId};
use offer_item_lifecycle::domain::item::{DfItem, Item, ItemIdentifier};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::error::{corrupt, map_sqlx};

const ITEM: &str = "item";
const DF_ITEM: &str = "df_item";

/// Catalog lookups against `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgCatalogAdapter {
    pool: PgPool,
}

impl PgCatalogAdapter {
    /// Creates a new `PgCatalogAdapter`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces one item snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    pub async fn put_item(&self, item: &Item) -> Result<(), DomainError> {
        self.put(ITEM, item.id.as_str(), item).await
    }

    /// Inserts or replaces one DF item snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    pub async fn put_df_item(&self, df_item: &DfItem) -> Result<(), DomainError> {
        self.put(DF_ITEM, df_item.id.as_str(), df_item).await
    }

    async fn put<T: Serialize + Sync>(
        &self,
        kind: &str,
        id: &str,
        payload: &T,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO catalog_item (kind, id, payload) VALUES ($1, $2, $3) \
             ON CONFLICT (kind, id) DO UPDATE SET payload = EXCLUDED.payload",
        )
        .bind(kind)
        .bind(id)
        .bind(Json(payload))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch<T: DeserializeOwned + Send>(
        &self,
        kind: &str,
        ids: Vec<String>,
    ) -> Result<Vec<T>, DomainError> {
        let payloads: Vec<Json<serde_json::Value>> =
            sqlx::query_scalar("SELECT payload FROM catalog_item WHERE kind = $1 AND id = ANY($2)")
                .bind(kind)
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx)?;
        payloads
            .into_iter()
            .map(|Json(value)| {
                serde_json::from_value(value).map_err(|e| corrupt("catalog_item.payload", e))
            })
            .collect()
    }
}

#[async_trait]
impl CatalogAdapter for PgCatalogAdapter {
    async fn get_items(
        &self,
        identifier: &ItemIdentifier,
    ) -> Result<(Item, Option<DfItem>), DomainError> {
        let item: Item = self
            .fetch(ITEM, vec![identifier.item_id.as_str().to_owned()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("item {}", identifier.item_id)))?;

        let df_item = match identifier.df_item_id.as_ref().filter(|id| !id.is_empty()) {
            Some(df_item_id) => {
                let found: Option<DfItem> = self
                    .fetch(DF_ITEM, vec![df_item_id.as_str().to_owned()])
                    .await?
                    .into_iter()
                    .next();
                Some(found.unwrap_or_else(|| DfItem::from_id(df_item_id.clone())))
            }
            None => None,
        };
        Ok((item, df_item))
    }

    async fn bulk_get_items(
        &self,
        identifiers: &[ItemIdentifier],
    ) -> Result<CatalogItems, DomainError> {
        let item_ids = identifiers
            .iter()
            .map(|identifier| identifier.item_id.as_str().to_owned())
            .collect();
        let df_item_ids = identifiers
            .iter()
            .filter_map(|identifier| identifier.df_item_id.as_ref())
            .map(|id| id.as_str().to_owned())
            .collect();

        let items: HashMap<ItemId, Item> = self
            .fetch::<Item>(ITEM, item_ids)
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        let df_items: HashMap<DfItemId, DfItem> = self
            .fetch::<DfItem>(DF_ITEM, df_item_ids)
            .await?
            .into_iter()
            .map(|df_item| (df_item.id.clone(), df_item))
            .collect();
        Ok(CatalogItems { items, df_items })
    }
}
