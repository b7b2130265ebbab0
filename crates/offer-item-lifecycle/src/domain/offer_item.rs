//! The offer campaign aggregate.
//!
//! An `OfferItem` owns its schedules by value and carries a cached copy of
//! the catalog product so that later catalog deletions do not affect how a
//! campaign is displayed. Setters re-validate only the invariant they touch,
//! which lets an update apply field by field.

use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::commission::CommissionType;
use super::ids::{BannerId, OfferItemId};
use super::item::{DfItem, DraftedItemInfo, Item, ItemIdentifier, PickInfo};
use super::schedule::{Schedule, validate_schedule_set};

/// Service the assignee posts the article to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostTarget {
    #[default]
    Undefined,
    Ameba,
    X,
    Instagram,
}

impl PostTarget {
    /// Stable storage code.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            PostTarget::Undefined => 0,
            PostTarget::Ameba => 1,
            PostTarget::X => 2,
            PostTarget::Instagram => 3,
        }
    }

    /// Decodes a storage code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown code.
    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            0 => Ok(PostTarget::Undefined),
            1 => Ok(PostTarget::Ameba),
            2 => Ok(PostTarget::X),
            3 => Ok(PostTarget::Instagram),
            _ => Err(DomainError::validation(format!("post target {code} is unknown"))),
        }
    }
}

/// Flags that decide which stages an assignee passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowFlags {
    pub has_sample: bool,
    pub needs_preliminary_review: bool,
    pub needs_after_review: bool,
    pub needs_pr_mark: bool,
    pub post_required: bool,
    pub has_lottery: bool,
}

/// Notification toggles. Stored and echoed only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MailToggles {
    pub invitation: bool,
    pub offer_detail: bool,
    pub passed_preliminary_review: bool,
    pub failed_preliminary_review: bool,
    pub article_post: bool,
    pub passed_after_review: bool,
    pub failed_after_review: bool,
}

/// Mandatory free-text fields shown to assignees.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OfferTexts {
    pub product_features: String,
    pub cautionary_points: String,
    pub reference_info: String,
    pub other_info: String,
}

impl OfferTexts {
    fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("product features", &self.product_features),
            ("cautionary points", &self.cautionary_points),
            ("reference info", &self.reference_info),
            ("other info", &self.other_info),
        ] {
            if value.is_empty() {
                return Err(DomainError::validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

/// Campaign-specific commission overriding the catalog one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecialCommission {
    pub enabled: bool,
    pub rate: f64,
    pub amount: i64,
}

impl SpecialCommission {
    /// Checks sign, mutual exclusion, and agreement with the catalog
    /// commission kind.
    fn validate(&self, commission_type: CommissionType) -> Result<(), DomainError> {
        if self.rate < 0.0 {
            return Err(DomainError::validation("special rate must not be negative"));
        }
        if self.amount < 0 {
            return Err(DomainError::validation("special amount must not be negative"));
        }
        let has_rate = self.rate > 0.0;
        let has_amount = self.amount > 0;
        if !self.enabled {
            if has_rate || has_amount {
                return Err(DomainError::validation(
                    "special rate and special amount must be zero without a special commission",
                ));
            }
            return Ok(());
        }
        if !has_rate && !has_amount {
            return Err(DomainError::validation(
                "special rate or special amount is required",
            ));
        }
        if has_rate && has_amount {
            return Err(DomainError::validation(
                "special rate and special amount cannot be set at the same time",
            ));
        }
        match commission_type {
            CommissionType::FixedRate if has_amount => Err(DomainError::validation(
                "special amount cannot be set for a fixed rate commission",
            )),
            CommissionType::FixedAmount if has_rate => Err(DomainError::validation(
                "special rate cannot be set for a fixed amount commission",
            )),
            _ => Ok(()),
        }
    }
}

/// Everything needed to create a campaign.
#[derive(Debug, Clone)]
pub struct NewOfferItem {
    pub name: String,
    pub item: Item,
    pub df_item: Option<DfItem>,
    pub has_coupon: bool,
    pub coupon_banner_id: Option<BannerId>,
    pub special_commission: SpecialCommission,
    pub flags: WorkflowFlags,
    pub post_target: PostTarget,
    pub texts: OfferTexts,
    pub mail: MailToggles,
    pub is_closed: bool,
    pub schedules: Vec<Schedule>,
    pub drafted_item_info: DraftedItemInfo,
}

/// Persisted state of a campaign, as loaded by a repository.
#[derive(Debug, Clone)]
pub struct OfferItemRecord {
    pub id: OfferItemId,
    pub fields: NewOfferItem,
    pub created_at: DateTime<Utc>,
}

/// The campaign aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferItem {
    id: OfferItemId,
    name: String,
    item: Item,
    df_item: Option<DfItem>,
    has_coupon: bool,
    coupon_banner_id: Option<BannerId>,
    special_commission: SpecialCommission,
    flags: WorkflowFlags,
    post_target: PostTarget,
    texts: OfferTexts,
    mail: MailToggles,
    is_closed: bool,
    created_at: DateTime<Utc>,
    schedules: Vec<Schedule>,
    drafted_item_info: DraftedItemInfo,
    pick_info: PickInfo,
}

impl OfferItem {
    /// Validates every aggregate invariant and builds a new campaign.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first violated rule.
    pub fn create(
        id: OfferItemId,
        new: NewOfferItem,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_name(&new.name)?;
        new.texts.validate()?;
        if new.item.id.is_empty() {
            return Err(DomainError::validation("item id is required"));
        }
        validate_coupon(new.has_coupon, new.coupon_banner_id.as_ref())?;
        new.special_commission
            .validate(new.item.min_commission.commission_type)?;
        validate_schedule_set(&new.schedules)?;

        Ok(Self::from_parts(id, new, created_at))
    }

    /// Rebuilds a campaign from persisted state without validation.
    #[must_use]
    pub fn restore(record: OfferItemRecord) -> Self {
        Self::from_parts(record.id, record.fields, record.created_at)
    }

    fn from_parts(id: OfferItemId, new: NewOfferItem, created_at: DateTime<Utc>) -> Self {
        let pick_info = PickInfo::derive(
            &new.item,
            new.df_item.as_ref(),
            new.coupon_banner_id.as_ref(),
        );
        Self {
            id,
            name: new.name,
            item: new.item,
            df_item: new.df_item,
            has_coupon: new.has_coupon,
            coupon_banner_id: new.coupon_banner_id,
            special_commission: new.special_commission,
            flags: new.flags,
            post_target: new.post_target,
            texts: new.texts,
            mail: new.mail,
            is_closed: new.is_closed,
            created_at,
            schedules: new.schedules,
            drafted_item_info: new.drafted_item_info,
            pick_info,
        }
    }

    fn refresh_pick_info(&mut self) {
        self.pick_info = PickInfo::derive(
            &self.item,
            self.df_item.as_ref(),
            self.coupon_banner_id.as_ref(),
        );
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `name` is blank.
    pub fn set_name(&mut self, name: String) -> Result<(), DomainError> {
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    /// Replaces the catalog item snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the item has no identifier.
    pub fn set_item(&mut self, item: Item) -> Result<(), DomainError> {
        if item.id.is_empty() {
            return Err(DomainError::validation("item id is required"));
        }
        self.item = item;
        self.refresh_pick_info();
        Ok(())
    }

    /// Replaces or clears the DF item snapshot.
    pub fn set_df_item(&mut self, df_item: Option<DfItem>) {
        self.df_item = df_item;
        self.refresh_pick_info();
    }

    /// Replaces the special commission, checking it against the minimum
    /// commission kind of the current catalog item.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the combination is malformed.
    pub fn set_special_commission(
        &mut self,
        special_commission: SpecialCommission,
    ) -> Result<(), DomainError> {
        special_commission.validate(self.item.min_commission.commission_type)?;
        self.special_commission = special_commission;
        Ok(())
    }

    /// Sets the coupon flag and banner together.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a banner is given without the
    /// coupon flag, or the banner id is blank.
    pub fn set_coupon(
        &mut self,
        has_coupon: bool,
        coupon_banner_id: Option<BannerId>,
    ) -> Result<(), DomainError> {
        validate_coupon(has_coupon, coupon_banner_id.as_ref())?;
        self.has_coupon = has_coupon;
        self.coupon_banner_id = coupon_banner_id;
        self.refresh_pick_info();
        Ok(())
    }

    /// Replaces the whole schedule set.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` on a duplicate or missing required
    /// type.
    pub fn set_schedules(&mut self, schedules: Vec<Schedule>) -> Result<(), DomainError> {
        validate_schedule_set(&schedules)?;
        self.schedules = schedules;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any text is blank.
    pub fn set_texts(&mut self, texts: OfferTexts) -> Result<(), DomainError> {
        texts.validate()?;
        self.texts = texts;
        Ok(())
    }

    pub fn set_flags(&mut self, flags: WorkflowFlags) {
        self.flags = flags;
    }

    pub fn set_post_target(&mut self, post_target: PostTarget) {
        self.post_target = post_target;
    }

    pub fn set_mail_toggles(&mut self, mail: MailToggles) {
        self.mail = mail;
    }

    pub fn set_drafted_item_info(&mut self, drafted_item_info: DraftedItemInfo) {
        self.drafted_item_info = drafted_item_info;
    }

    pub fn set_is_closed(&mut self, is_closed: bool) {
        self.is_closed = is_closed;
    }

    #[must_use]
    pub fn id(&self) -> &OfferItemId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn item(&self) -> &Item {
        &self.item
    }

    #[must_use]
    pub fn df_item(&self) -> Option<&DfItem> {
        self.df_item.as_ref()
    }

    /// Catalog lookup key for this campaign.
    #[must_use]
    pub fn item_identifier(&self) -> ItemIdentifier {
        ItemIdentifier {
            item_id: self.item.id.clone(),
            df_item_id: self.df_item.as_ref().map(|df| df.id.clone()),
        }
    }

    #[must_use]
    pub fn has_coupon(&self) -> bool {
        self.has_coupon
    }

    #[must_use]
    pub fn coupon_banner_id(&self) -> Option<&BannerId> {
        self.coupon_banner_id.as_ref()
    }

    #[must_use]
    pub fn special_commission(&self) -> SpecialCommission {
        self.special_commission
    }

    #[must_use]
    pub fn flags(&self) -> WorkflowFlags {
        self.flags
    }

    #[must_use]
    pub fn has_lottery(&self) -> bool {
        self.flags.has_lottery
    }

    #[must_use]
    pub fn has_sample(&self) -> bool {
        self.flags.has_sample
    }

    #[must_use]
    pub fn needs_preliminary_review(&self) -> bool {
        self.flags.needs_preliminary_review
    }

    #[must_use]
    pub fn needs_after_review(&self) -> bool {
        self.flags.needs_after_review
    }

    #[must_use]
    pub fn post_target(&self) -> PostTarget {
        self.post_target
    }

    #[must_use]
    pub fn texts(&self) -> &OfferTexts {
        &self.texts
    }

    #[must_use]
    pub fn mail_toggles(&self) -> MailToggles {
        self.mail
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    #[must_use]
    pub fn drafted_item_info(&self) -> &DraftedItemInfo {
        &self.drafted_item_info
    }

    #[must_use]
    pub fn pick_info(&self) -> &PickInfo {
        &self.pick_info
    }
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation("name is required"));
    }
    Ok(())
}

fn validate_coupon(has_coupon: bool, banner: Option<&BannerId>) -> Result<(), DomainError> {
    match banner {
        Some(_) if !has_coupon => Err(DomainError::validation(
            "coupon banner id requires has_coupon",
        )),
        Some(b) if b.is_empty() => Err(DomainError::validation(
            "coupon banner id must not be empty",
        )),
        _ => Ok(()),
    }
}
