//! Commands for the offer item lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::assignee::{LotteryResult, Stage};
use super::commission::Commission;
use super::examination::{EntryType, ExaminationVerdict};
use super::ids::{AmebaId, BannerId, DfItemId, EntryId, ItemId, OfferItemId, QuestionId, ScheduleId};
use super::offer_item::{MailToggles, OfferTexts, PostTarget, SpecialCommission, WorkflowFlags};
use super::questionnaire::QuestionInput;
use super::schedule::ScheduleType;

/// Schedule as supplied by a save request. Updates must carry the id.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleInput {
    #[serde(default)]
    pub id: Option<ScheduleId>,
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

/// Assignee as supplied by a save request.
#[derive(Debug, Clone, Deserialize)]
pub struct AssigneeInput {
    pub ameba_id: AmebaId,
    pub stage: Stage,
    #[serde(default)]
    pub writing_fee: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionnaireInput {
    pub description: String,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftedItemInfoInput {
    pub name: String,
    pub content_name: String,
    pub image_url: String,
    pub url: String,
    pub min_commission: Commission,
    pub max_commission: Commission,
}

/// Command to create a campaign, or update it when `offer_item_id` is set.
#[derive(Debug, Clone)]
pub struct SaveOfferItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: Option<OfferItemId>,
    pub name: String,
    pub item_id: ItemId,
    pub df_item_id: Option<DfItemId>,
    pub has_coupon: bool,
    pub coupon_banner_id: Option<BannerId>,
    pub special_commission: SpecialCommission,
    pub flags: WorkflowFlags,
    pub post_target: PostTarget,
    pub texts: OfferTexts,
    pub mail: MailToggles,
    pub is_closed: bool,
    pub schedules: Vec<ScheduleInput>,
    pub assignees: Vec<AssigneeInput>,
    pub questionnaire: Option<QuestionnaireInput>,
    pub drafted_item_info: DraftedItemInfoInput,
}

/// Command to soft-delete a campaign and everything it owns.
#[derive(Debug, Clone)]
pub struct DeleteOfferItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
}

/// Command to invite every assignee still before invitation.
#[derive(Debug, Clone)]
pub struct InviteOffer {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
}

/// Command to accept or refuse an invitation.
#[derive(Debug, Clone)]
pub struct Invitation {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
    pub ameba_id: AmebaId,
    pub accepted: bool,
    /// Questionnaire answers, keyed by question.
    pub answers: HashMap<QuestionId, String>,
}

/// Command to withdraw an assignee from a campaign.
#[derive(Debug, Clone)]
pub struct Decline {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
    pub ameba_id: AmebaId,
    pub reason: String,
}

/// Command to apply lottery outcomes to assignees in the lottery stage.
#[derive(Debug, Clone)]
pub struct UploadLotteryResults {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
    pub results: HashMap<AmebaId, LotteryResult>,
}

/// Command to mark samples as delivered.
#[derive(Debug, Clone)]
pub struct FinishedShipment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
}

/// Command recording a draft or article submission.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
    pub ameba_id: AmebaId,
    pub entry_type: EntryType,
    pub entry_id: Option<EntryId>,
}

/// Command applying examiner verdicts.
#[derive(Debug, Clone)]
pub struct UploadExaminationResults {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
    pub entry_type: EntryType,
    pub verdicts: HashMap<AmebaId, ExaminationVerdict>,
}

/// Command to mark payment as completed for some paying assignees.
#[derive(Debug, Clone)]
pub struct PaymentCompleted {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
    pub ameba_ids: Vec<AmebaId>,
}

/// Command to close a campaign and finish every assignee.
#[derive(Debug, Clone)]
pub struct CompletedOfferItem {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    pub offer_item_id: OfferItemId,
}
