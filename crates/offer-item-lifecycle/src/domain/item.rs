//! Catalog product snapshots and the values derived from them.

use offer_item_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::commission::Commission;
use super::ids::{BannerId, DfItemId, ItemId};

/// Device platform a product URL targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    All,
    Android,
    Ios,
}

/// A product URL for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformUrl {
    pub platform: PlatformType,
    pub url: String,
}

/// A catalog product as reported by the catalog adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub image_url: String,
    pub name: String,
    pub min_commission: Commission,
    pub max_commission: Commission,
    pub urls: Vec<PlatformUrl>,
    pub has_tieup: bool,
    pub content_name: String,
    pub enabled_self_back: bool,
    pub is_df: bool,
}

impl Item {
    /// An item known only by its identifier, used before the catalog has
    /// been consulted.
    #[must_use]
    pub fn from_id(id: ItemId) -> Self {
        Self {
            id,
            image_url: String::new(),
            name: String::new(),
            min_commission: Commission::default(),
            max_commission: Commission::default(),
            urls: Vec::new(),
            has_tieup: false,
            content_name: String::new(),
            enabled_self_back: false,
            is_df: false,
        }
    }

    /// Whether the catalog actually returned this item.
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }
}

/// A "DF" variant of a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DfItem {
    pub id: DfItemId,
    pub image_url: String,
    pub name: String,
    pub min_commission: Commission,
    pub max_commission: Commission,
    pub urls: Vec<PlatformUrl>,
}

impl DfItem {
    #[must_use]
    pub fn from_id(id: DfItemId) -> Self {
        Self {
            id,
            image_url: String::new(),
            name: String::new(),
            min_commission: Commission::default(),
            max_commission: Commission::default(),
            urls: Vec::new(),
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }
}

/// Catalog lookup key: an item and optionally its DF variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentifier {
    pub item_id: ItemId,
    pub df_item_id: Option<DfItemId>,
}

/// Product data cached on the campaign so later catalog deletions do not
/// corrupt historical display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftedItemInfo {
    name: String,
    content_name: String,
    image_url: String,
    url: String,
    min_commission: Commission,
    max_commission: Commission,
}

impl DraftedItemInfo {
    /// Validates and builds a product snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a text field is blank, either
    /// commission is inconsistent, or the minimum rate exceeds the maximum.
    pub fn new(
        name: String,
        content_name: String,
        image_url: String,
        url: String,
        min_commission: Commission,
        max_commission: Commission,
    ) -> Result<Self, DomainError> {
        for (field, value) in [
            ("name", &name),
            ("content name", &content_name),
            ("image url", &image_url),
            ("url", &url),
        ] {
            if value.is_empty() {
                return Err(DomainError::validation(format!(
                    "drafted item info {field} is required"
                )));
            }
        }
        if !min_commission.is_valid() {
            return Err(DomainError::validation(
                "drafted item info min commission is invalid",
            ));
        }
        if !max_commission.is_valid() {
            return Err(DomainError::validation(
                "drafted item info max commission is invalid",
            ));
        }
        if min_commission.calculated_rate > max_commission.calculated_rate {
            return Err(DomainError::validation(
                "drafted item info min commission must not exceed max commission",
            ));
        }
        Ok(Self {
            name,
            content_name,
            image_url,
            url,
            min_commission,
            max_commission,
        })
    }

    /// Rebuilds a snapshot from persisted state without validation.
    #[must_use]
    pub fn restore(
        name: String,
        content_name: String,
        image_url: String,
        url: String,
        min_commission: Commission,
        max_commission: Commission,
    ) -> Self {
        Self {
            name,
            content_name,
            image_url,
            url,
            min_commission,
            max_commission,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn content_name(&self) -> &str {
        &self.content_name
    }

    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn min_commission(&self) -> Commission {
        self.min_commission
    }

    #[must_use]
    pub fn max_commission(&self) -> Commission {
        self.max_commission
    }
}

/// Catalog references derived from the campaign's item, DF item and coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickInfo {
    pub item_id: ItemId,
    pub df_item_id: Option<DfItemId>,
    pub banner_ids: Vec<BannerId>,
}

impl PickInfo {
    /// Derives pick info, dropping a blank DF item id or banner id.
    #[must_use]
    pub fn derive(item: &Item, df_item: Option<&DfItem>, banner: Option<&BannerId>) -> Self {
        Self {
            item_id: item.id.clone(),
            df_item_id: df_item
                .filter(|df| !df.id.is_empty())
                .map(|df| df.id.clone()),
            banner_ids: banner.filter(|b| !b.is_empty()).cloned().into_iter().collect(),
        }
    }
}
