//! Test catalogs: in-memory `CatalogAdapter` implementations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use offer_item_core::error::DomainError;
use offer_item_lifecycle::domain::catalog::{CatalogAdapter, CatalogItems};
use offer_item_lifecycle::domain::ids::{DfItemId, ItemId};
use offer_item_lifecycle::domain::item::{DfItem, Item, ItemIdentifier};

/// A catalog backed by maps. Items can be replaced between calls to
/// simulate catalog edits.
#[derive(Debug, Default)]
pub struct StubCatalog {
    items: Mutex<HashMap<ItemId, Item>>,
    df_items: Mutex<HashMap<DfItemId, DfItem>>,
}

impl StubCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_item(self, item: Item) -> Self {
        self.put_item(item);
        self
    }

    /// Adds or replaces a DF item.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_df_item(self, df_item: DfItem) -> Self {
        self.df_items
            .lock()
            .unwrap()
            .insert(df_item.id.clone(), df_item);
        self
    }

    /// Adds or replaces an item in place.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn put_item(&self, item: Item) {
        self.items.lock().unwrap().insert(item.id.clone(), item);
    }
}

#[async_trait]
impl CatalogAdapter for StubCatalog {
    async fn get_items(
        &self,
        identifier: &ItemIdentifier,
    ) -> Result<(Item, Option<DfItem>), DomainError> {
        let item = self
            .items
            .lock()
            .unwrap()
            .get(&identifier.item_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("item {}", identifier.item_id)))?;
        let df_item = identifier
            .df_item_id
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| {
                self.df_items
                    .lock()
                    .unwrap()
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| DfItem::from_id(id.clone()))
            });
        Ok((item, df_item))
    }

    async fn bulk_get_items(
        &self,
        identifiers: &[ItemIdentifier],
    ) -> Result<CatalogItems, DomainError> {
        let items = self.items.lock().unwrap();
        let df_items = self.df_items.lock().unwrap();
        let mut found = CatalogItems::default();
        for identifier in identifiers {
            if let Some(item) = items.get(&identifier.item_id) {
                found.items.insert(item.id.clone(), item.clone());
            }
            if let Some(df_item) = identifier
                .df_item_id
                .as_ref()
                .and_then(|id| df_items.get(id))
            {
                found.df_items.insert(df_item.id.clone(), df_item.clone());
            }
        }
        Ok(found)
    }
}

/// A catalog whose every call fails with an infrastructure error.
#[derive(Debug)]
pub struct FailingCatalog;

#[async_trait]
impl CatalogAdapter for FailingCatalog {
    async fn get_items(
        &self,
        _identifier: &ItemIdentifier,
    ) -> Result<(Item, Option<DfItem>), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn bulk_get_items(
        &self,
        _identifiers: &[ItemIdentifier],
    ) -> Result<CatalogItems, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
