//! Outbound port to the product catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use offer_item_core::error::DomainError;

use super::ids::{DfItemId, ItemId};
use super::item::{DfItem, Item, ItemIdentifier};

/// Products returned by a bulk catalog lookup.
#[derive(Debug, Clone, Default)]
pub struct CatalogItems {
    pub items: HashMap<ItemId, Item>,
    pub df_items: HashMap<DfItemId, DfItem>,
}

/// Looks up product name, image, commission and URLs.
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Fetches one item and, when requested, its DF variant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the item is unknown to the catalog.
    async fn get_items(
        &self,
        identifier: &ItemIdentifier,
    ) -> Result<(Item, Option<DfItem>), DomainError>;

    /// Fetches many items at once. Unknown identifiers are omitted.
    async fn bulk_get_items(
        &self,
        identifiers: &[ItemIdentifier],
    ) -> Result<CatalogItems, DomainError>;
}
