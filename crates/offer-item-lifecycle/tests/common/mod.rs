//! Shared harness for lifecycle handler tests.

#![allow(dead_code)]

use offer_item_core::error::DomainError;
use offer_item_lifecycle::application::offer_item_handlers::{
    SaveContext, ValidationSettings, handle_save_offer_item,
};
use offer_item_lifecycle::domain::commands::SaveOfferItem;
use offer_item_lifecycle::domain::ids::OfferItemId;
use offer_item_test_support::fixtures::{catalog_df_item, catalog_item};
use offer_item_test_support::{FixedClock, InMemoryStore, SequenceIdGenerator, StubCatalog};

pub struct Harness {
    pub store: InMemoryStore,
    pub catalog: StubCatalog,
    pub clock: FixedClock,
    pub ids: SequenceIdGenerator,
    pub settings: ValidationSettings,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            catalog: StubCatalog::new()
                .with_item(catalog_item())
                .with_df_item(catalog_df_item()),
            clock: FixedClock::standard(),
            ids: SequenceIdGenerator::new(),
            settings: ValidationSettings::default(),
        }
    }

    pub fn ctx(&self) -> SaveContext<'_> {
        SaveContext {
            settings: &self.settings,
            clock: &self.clock,
            ids: &self.ids,
            catalog: &self.catalog,
        }
    }

    pub async fn save(&self, command: &SaveOfferItem) -> Result<OfferItemId, DomainError> {
        handle_save_offer_item(command, self.ctx(), &self.store).await
    }
}
