//! Assignee aggregate and its stage state machine.
//!
//! Every transition is a guarded method: it checks the current stage, fails
//! with a validation error naming the required stage, and otherwise computes
//! the next stage from the campaign configuration. A failed transition leaves
//! the assignee untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use super::ids::{AmebaId, AssigneeId, OfferItemId};
use super::offer_item::OfferItem;

/// Maximum decline reason length, in grapheme clusters.
pub const MAX_DECLINE_REASON_GRAPHEMES: usize = 128;

/// Position of an assignee in the campaign workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BeforeInvitation,
    Invitation,
    Lottery,
    LotteryLost,
    Shipment,
    DraftSubmission,
    PreExamination,
    PreReexamination,
    ArticlePosting,
    Examination,
    Reexamination,
    Paying,
    PaymentCompleted,
    Done,
}

impl Stage {
    /// Every stage, in workflow order.
    pub const ALL: [Stage; 14] = [
        Stage::BeforeInvitation,
        Stage::Invitation,
        Stage::Lottery,
        Stage::LotteryLost,
        Stage::Shipment,
        Stage::DraftSubmission,
        Stage::PreExamination,
        Stage::PreReexamination,
        Stage::ArticlePosting,
        Stage::Examination,
        Stage::Reexamination,
        Stage::Paying,
        Stage::PaymentCompleted,
        Stage::Done,
    ];

    /// Stable storage code, starting at 1.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            Stage::BeforeInvitation => 1,
            Stage::Invitation => 2,
            Stage::Lottery => 3,
            Stage::LotteryLost => 4,
            Stage::Shipment => 5,
            Stage::DraftSubmission => 6,
            Stage::PreExamination => 7,
            Stage::PreReexamination => 8,
            Stage::ArticlePosting => 9,
            Stage::Examination => 10,
            Stage::Reexamination => 11,
            Stage::Paying => 12,
            Stage::PaymentCompleted => 13,
            Stage::Done => 14,
        }
    }

    /// Decodes a storage code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown code.
    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| DomainError::validation(format!("stage {code} is unknown")))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of the lottery for one blogger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LotteryResult {
    pub is_passed_lottery: bool,
    #[serde(default)]
    pub shipping_data: Vec<String>,
    #[serde(default)]
    pub jan_code: Option<String>,
}

/// Number of assignees of one campaign in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssigneeCount {
    pub stage: Stage,
    pub count: u64,
}

/// Persisted state of an assignee, as loaded by a repository.
#[derive(Debug, Clone)]
pub struct AssigneeRecord {
    pub id: AssigneeId,
    pub offer_item_id: OfferItemId,
    pub ameba_id: AmebaId,
    pub writing_fee: i64,
    pub stage: Stage,
    pub decline_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub shipping_data: Vec<String>,
    pub jan_code: Option<String>,
}

/// A blogger's participation in one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignee {
    id: AssigneeId,
    offer_item_id: OfferItemId,
    ameba_id: AmebaId,
    writing_fee: i64,
    stage: Stage,
    decline_reason: Option<String>,
    created_at: DateTime<Utc>,
    shipping_data: Vec<String>,
    jan_code: Option<String>,
}

impl Assignee {
    /// Creates an assignee in the requested stage.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the blogger id is blank or the
    /// writing fee is negative.
    pub fn new(
        id: AssigneeId,
        offer_item_id: OfferItemId,
        ameba_id: AmebaId,
        writing_fee: i64,
        stage: Stage,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if ameba_id.is_empty() {
            return Err(DomainError::validation("ameba id is required"));
        }
        validate_writing_fee(writing_fee)?;
        Ok(Self {
            id,
            offer_item_id,
            ameba_id,
            writing_fee,
            stage,
            decline_reason: None,
            created_at,
            shipping_data: Vec::new(),
            jan_code: None,
        })
    }

    /// Rebuilds an assignee from persisted state without validation.
    #[must_use]
    pub fn restore(record: AssigneeRecord) -> Self {
        Self {
            id: record.id,
            offer_item_id: record.offer_item_id,
            ameba_id: record.ameba_id,
            writing_fee: record.writing_fee,
            stage: record.stage,
            decline_reason: record.decline_reason,
            created_at: record.created_at,
            shipping_data: record.shipping_data,
            jan_code: record.jan_code,
        }
    }

    fn require(&self, allowed: &[Stage]) -> Result<(), DomainError> {
        if allowed.contains(&self.stage) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(DomainError::validation(format!(
            "assignee stage must be {expected}, got {}",
            self.stage
        )))
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `writing_fee` is negative.
    pub fn set_writing_fee(&mut self, writing_fee: i64) -> Result<(), DomainError> {
        validate_writing_fee(writing_fee)?;
        self.writing_fee = writing_fee;
        Ok(())
    }

    /// `BeforeInvitation` to `Invitation`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` from any other stage.
    pub fn set_stage_invitation(&mut self) -> Result<(), DomainError> {
        self.require(&[Stage::BeforeInvitation])?;
        self.stage = Stage::Invitation;
        Ok(())
    }

    /// Accepts the invitation, moving to the first stage the campaign
    /// configuration calls for.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Invitation`.
    pub fn invitation(&mut self, offer_item: &OfferItem) -> Result<(), DomainError> {
        self.require(&[Stage::Invitation])?;
        self.stage = if offer_item.has_lottery() {
            Stage::Lottery
        } else if offer_item.has_sample() {
            Stage::Shipment
        } else if offer_item.needs_preliminary_review() {
            Stage::DraftSubmission
        } else {
            Stage::ArticlePosting
        };
        Ok(())
    }

    /// Refuses the invitation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Invitation`.
    pub fn set_stage_done_from_invitation(&mut self) -> Result<(), DomainError> {
        self.require(&[Stage::Invitation])?;
        self.stage = Stage::Done;
        Ok(())
    }

    /// Applies a won lottery. Shipping data and JAN code are kept only when
    /// the campaign ships a sample.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Lottery`.
    pub fn change_stage_by_lottery_result(
        &mut self,
        offer_item: &OfferItem,
        shipping_data: Vec<String>,
        jan_code: Option<String>,
    ) -> Result<(), DomainError> {
        self.require(&[Stage::Lottery])?;
        if offer_item.has_sample() {
            self.stage = Stage::Shipment;
            self.shipping_data = shipping_data;
            self.jan_code = jan_code;
        } else if offer_item.needs_preliminary_review() {
            self.stage = Stage::DraftSubmission;
        } else {
            self.stage = Stage::ArticlePosting;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Lottery`.
    pub fn set_stage_lottery_lost(&mut self) -> Result<(), DomainError> {
        self.require(&[Stage::Lottery])?;
        self.stage = Stage::LotteryLost;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Shipment`.
    pub fn finished_shipment(&mut self, needs_preliminary_review: bool) -> Result<(), DomainError> {
        self.require(&[Stage::Shipment])?;
        self.stage = if needs_preliminary_review {
            Stage::DraftSubmission
        } else {
            Stage::ArticlePosting
        };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is
    /// `DraftSubmission` or `PreReexamination`.
    pub fn change_stage_by_draft_submission(&mut self) -> Result<(), DomainError> {
        self.require(&[Stage::DraftSubmission, Stage::PreReexamination])?;
        self.stage = Stage::PreExamination;
        Ok(())
    }

    /// Applies the draft verdict.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `PreExamination`.
    pub fn pre_examination(&mut self, is_passed: bool) -> Result<(), DomainError> {
        self.require(&[Stage::PreExamination])?;
        self.stage = if is_passed {
            Stage::ArticlePosting
        } else {
            Stage::PreReexamination
        };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is
    /// `ArticlePosting` or `Reexamination`.
    pub fn change_stage_by_entry_submission(
        &mut self,
        needs_after_review: bool,
    ) -> Result<(), DomainError> {
        self.require(&[Stage::ArticlePosting, Stage::Reexamination])?;
        self.stage = if needs_after_review {
            Stage::Examination
        } else {
            Stage::Paying
        };
        Ok(())
    }

    /// Applies the article verdict.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Examination`.
    pub fn examination(&mut self, is_passed: bool) -> Result<(), DomainError> {
        self.require(&[Stage::Examination])?;
        self.stage = if is_passed {
            Stage::Paying
        } else {
            Stage::Reexamination
        };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` unless the stage is `Paying`.
    pub fn set_stage_payment_completed(&mut self) -> Result<(), DomainError> {
        self.require(&[Stage::Paying])?;
        self.stage = Stage::PaymentCompleted;
        Ok(())
    }

    /// Declines from any stage, recording the reason.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the reason is empty or longer
    /// than [`MAX_DECLINE_REASON_GRAPHEMES`] grapheme clusters.
    pub fn set_stage_done_by_decline(&mut self, reason: String) -> Result<(), DomainError> {
        if reason.is_empty() {
            return Err(DomainError::validation("decline reason is required"));
        }
        if reason.graphemes(true).count() > MAX_DECLINE_REASON_GRAPHEMES {
            return Err(DomainError::validation(format!(
                "decline reason must be at most {MAX_DECLINE_REASON_GRAPHEMES} characters"
            )));
        }
        self.decline_reason = Some(reason);
        self.set_stage_done();
        Ok(())
    }

    /// Unconditional move to `Done`, used for bulk completion.
    pub fn set_stage_done(&mut self) {
        self.stage = Stage::Done;
    }

    #[must_use]
    pub fn id(&self) -> &AssigneeId {
        &self.id
    }

    #[must_use]
    pub fn offer_item_id(&self) -> &OfferItemId {
        &self.offer_item_id
    }

    #[must_use]
    pub fn ameba_id(&self) -> &AmebaId {
        &self.ameba_id
    }

    #[must_use]
    pub fn writing_fee(&self) -> i64 {
        self.writing_fee
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn decline_reason(&self) -> Option<&str> {
        self.decline_reason.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn shipping_data(&self) -> &[String] {
        &self.shipping_data
    }

    #[must_use]
    pub fn jan_code(&self) -> Option<&str> {
        self.jan_code.as_deref()
    }
}

/// Administrative stage override that bypasses every transition guard.
///
/// Kept out of the inherent API so callers must import it explicitly.
pub trait StageOverride {
    /// Forces the stage to `stage` regardless of the current one.
    fn override_stage(&mut self, stage: Stage);
}

impl StageOverride for Assignee {
    fn override_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }
}

fn validate_writing_fee(writing_fee: i64) -> Result<(), DomainError> {
    if writing_fee < 0 {
        return Err(DomainError::validation("writing fee must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::offer_item::WorkflowFlags;
    use crate::domain::offer_item::tests::offer_item;
    use crate::domain::schedule::tests::at;

    fn assignee_in(stage: Stage) -> Assignee {
        Assignee::new(
            "assignee-1".into(),
            "offer-1".into(),
            "blogger-1".into(),
            3000,
            stage,
            at(1),
        )
        .unwrap()
    }

    fn flags(has_lottery: bool, has_sample: bool, needs_preliminary_review: bool) -> WorkflowFlags {
        WorkflowFlags {
            has_lottery,
            has_sample,
            needs_preliminary_review,
            ..WorkflowFlags::default()
        }
    }

    type Transition = fn(&mut Assignee) -> Result<(), DomainError>;

    /// Every guarded transition with the stages it may start from.
    fn guarded_transitions() -> [(&'static str, &'static [Stage], Transition); 11] {
        [
            ("set_stage_invitation", &[Stage::BeforeInvitation], |a| {
                a.set_stage_invitation()
            }),
            ("invitation", &[Stage::Invitation], |a| {
                a.invitation(&offer_item(WorkflowFlags::default()))
            }),
            ("set_stage_done_from_invitation", &[Stage::Invitation], |a| {
                a.set_stage_done_from_invitation()
            }),
            ("change_stage_by_lottery_result", &[Stage::Lottery], |a| {
                a.change_stage_by_lottery_result(&offer_item(WorkflowFlags::default()), vec![], None)
            }),
            ("set_stage_lottery_lost", &[Stage::Lottery], |a| {
                a.set_stage_lottery_lost()
            }),
            ("finished_shipment", &[Stage::Shipment], |a| {
                a.finished_shipment(false)
            }),
            (
                "change_stage_by_draft_submission",
                &[Stage::DraftSubmission, Stage::PreReexamination],
                |a| a.change_stage_by_draft_submission(),
            ),
            ("pre_examination", &[Stage::PreExamination], |a| {
                a.pre_examination(true)
            }),
            (
                "change_stage_by_entry_submission",
                &[Stage::ArticlePosting, Stage::Reexamination],
                |a| a.change_stage_by_entry_submission(true),
            ),
            ("examination", &[Stage::Examination], |a| a.examination(true)),
            ("set_stage_payment_completed", &[Stage::Paying], |a| {
                a.set_stage_payment_completed()
            }),
        ]
    }

    // --- guards ---

    #[test]
    fn test_guarded_transitions_fail_outside_source_stage_and_keep_stage() {
        for (name, allowed, transition) in guarded_transitions() {
            for stage in Stage::ALL {
                let mut assignee = assignee_in(stage);

                let result = transition(&mut assignee);

                if allowed.contains(&stage) {
                    assert!(result.is_ok(), "{name} from {stage} should succeed");
                } else {
                    assert!(
                        matches!(result, Err(DomainError::Validation(_))),
                        "{name} from {stage} should fail"
                    );
                    assert_eq!(assignee.stage(), stage, "{name} changed stage from {stage}");
                }
            }
        }
    }

    #[test]
    fn test_guard_error_names_required_stage() {
        let mut assignee = assignee_in(Stage::Invitation);

        let err = assignee.set_stage_lottery_lost().unwrap_err();

        assert_eq!(
            err.to_string(),
            "validation error: assignee stage must be Lottery, got Invitation"
        );
    }

    // --- invitation branching ---

    #[test]
    fn test_invitation_with_lottery_goes_to_lottery_regardless_of_other_flags() {
        for (sample, review) in [(false, false), (true, false), (false, true), (true, true)] {
            let mut assignee = assignee_in(Stage::Invitation);

            assignee
                .invitation(&offer_item(flags(true, sample, review)))
                .unwrap();

            assert_eq!(assignee.stage(), Stage::Lottery);
        }
    }

    #[test]
    fn test_invitation_with_sample_goes_to_shipment() {
        let mut assignee = assignee_in(Stage::Invitation);

        assignee.invitation(&offer_item(flags(false, true, true))).unwrap();

        assert_eq!(assignee.stage(), Stage::Shipment);
    }

    #[test]
    fn test_invitation_with_preliminary_review_goes_to_draft_submission() {
        let mut assignee = assignee_in(Stage::Invitation);

        assignee.invitation(&offer_item(flags(false, false, true))).unwrap();

        assert_eq!(assignee.stage(), Stage::DraftSubmission);
    }

    #[test]
    fn test_invitation_without_flags_goes_to_article_posting() {
        let mut assignee = assignee_in(Stage::Invitation);

        assignee.invitation(&offer_item(flags(false, false, false))).unwrap();

        assert_eq!(assignee.stage(), Stage::ArticlePosting);
    }

    // --- lottery ---

    #[test]
    fn test_lottery_result_with_sample_stores_shipping_data() {
        let mut assignee = assignee_in(Stage::Lottery);

        assignee
            .change_stage_by_lottery_result(
                &offer_item(flags(true, true, false)),
                vec!["Serum 30ml".into()],
                Some("4901234567894".into()),
            )
            .unwrap();

        assert_eq!(assignee.stage(), Stage::Shipment);
        assert_eq!(assignee.shipping_data(), ["Serum 30ml".to_owned()]);
        assert_eq!(assignee.jan_code(), Some("4901234567894"));
    }

    #[test]
    fn test_lottery_result_without_sample_discards_shipping_data() {
        let mut assignee = assignee_in(Stage::Lottery);

        assignee
            .change_stage_by_lottery_result(
                &offer_item(flags(true, false, true)),
                vec!["Serum 30ml".into()],
                Some("4901234567894".into()),
            )
            .unwrap();

        assert_eq!(assignee.stage(), Stage::DraftSubmission);
        assert!(assignee.shipping_data().is_empty());
        assert_eq!(assignee.jan_code(), None);
    }

    #[test]
    fn test_lottery_result_without_sample_or_review_goes_to_article_posting() {
        let mut assignee = assignee_in(Stage::Lottery);

        assignee
            .change_stage_by_lottery_result(&offer_item(flags(true, false, false)), vec![], None)
            .unwrap();

        assert_eq!(assignee.stage(), Stage::ArticlePosting);
    }

    // --- shipment, submission and examination ---

    #[test]
    fn test_finished_shipment_branches_on_preliminary_review() {
        let mut with_review = assignee_in(Stage::Shipment);
        let mut without_review = assignee_in(Stage::Shipment);

        with_review.finished_shipment(true).unwrap();
        without_review.finished_shipment(false).unwrap();

        assert_eq!(with_review.stage(), Stage::DraftSubmission);
        assert_eq!(without_review.stage(), Stage::ArticlePosting);
    }

    #[test]
    fn test_draft_submission_lands_on_pre_examination() {
        for from in [Stage::DraftSubmission, Stage::PreReexamination] {
            let mut assignee = assignee_in(from);

            assignee.change_stage_by_draft_submission().unwrap();

            assert_eq!(assignee.stage(), Stage::PreExamination);
        }
    }

    #[test]
    fn test_entry_submission_branches_on_after_review() {
        for from in [Stage::ArticlePosting, Stage::Reexamination] {
            let mut reviewed = assignee_in(from);
            let mut unreviewed = assignee_in(from);

            reviewed.change_stage_by_entry_submission(true).unwrap();
            unreviewed.change_stage_by_entry_submission(false).unwrap();

            assert_eq!(reviewed.stage(), Stage::Examination);
            assert_eq!(unreviewed.stage(), Stage::Paying);
        }
    }

    #[test]
    fn test_pre_examination_verdicts() {
        let mut passed = assignee_in(Stage::PreExamination);
        let mut failed = assignee_in(Stage::PreExamination);

        passed.pre_examination(true).unwrap();
        failed.pre_examination(false).unwrap();

        assert_eq!(passed.stage(), Stage::ArticlePosting);
        assert_eq!(failed.stage(), Stage::PreReexamination);
    }

    #[test]
    fn test_examination_verdicts() {
        let mut passed = assignee_in(Stage::Examination);
        let mut failed = assignee_in(Stage::Examination);

        passed.examination(true).unwrap();
        failed.examination(false).unwrap();

        assert_eq!(passed.stage(), Stage::Paying);
        assert_eq!(failed.stage(), Stage::Reexamination);
    }

    // --- decline ---

    #[test]
    fn test_decline_with_empty_reason_fails() {
        let mut assignee = assignee_in(Stage::ArticlePosting);

        let result = assignee.set_stage_done_by_decline(String::new());

        assert!(result.is_err());
        assert_eq!(assignee.stage(), Stage::ArticlePosting);
    }

    #[test]
    fn test_decline_reason_limit_on_ascii() {
        let mut ok = assignee_in(Stage::Shipment);
        let mut too_long = assignee_in(Stage::Shipment);

        ok.set_stage_done_by_decline("a".repeat(128)).unwrap();
        let result = too_long.set_stage_done_by_decline("a".repeat(129));

        assert_eq!(ok.stage(), Stage::Done);
        assert_eq!(ok.decline_reason().map(str::len), Some(128));
        assert!(result.is_err());
        assert_eq!(too_long.stage(), Stage::Shipment);
    }

    #[test]
    fn test_decline_reason_limit_counts_grapheme_clusters() {
        let family = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}\u{200D}\u{1F466}";
        let mut ok = assignee_in(Stage::Invitation);
        let mut too_long = assignee_in(Stage::Invitation);

        ok.set_stage_done_by_decline(family.repeat(128)).unwrap();
        let result = too_long.set_stage_done_by_decline(family.repeat(129));

        assert_eq!(ok.stage(), Stage::Done);
        assert!(result.is_err());
    }

    // --- unconditional moves ---

    #[test]
    fn test_set_stage_done_from_any_stage() {
        for stage in Stage::ALL {
            let mut assignee = assignee_in(stage);
            assignee.set_stage_done();
            assert_eq!(assignee.stage(), Stage::Done);
        }
    }

    #[test]
    fn test_override_stage_bypasses_guards() {
        let mut assignee = assignee_in(Stage::BeforeInvitation);

        assignee.override_stage(Stage::Paying);

        assert_eq!(assignee.stage(), Stage::Paying);
    }

    // --- construction ---

    #[test]
    fn test_new_rejects_negative_writing_fee_and_blank_ameba_id() {
        let negative = Assignee::new(
            "a".into(),
            "o".into(),
            "blogger".into(),
            -1,
            Stage::BeforeInvitation,
            at(1),
        );
        let blank = Assignee::new(
            "a".into(),
            "o".into(),
            AmebaId::new(""),
            0,
            Stage::BeforeInvitation,
            at(1),
        );

        assert!(negative.is_err());
        assert!(blank.is_err());
    }

    #[test]
    fn test_set_writing_fee_is_independent_of_stage() {
        let mut assignee = assignee_in(Stage::Done);

        assignee.set_writing_fee(5000).unwrap();
        let result = assignee.set_writing_fee(-10);

        assert_eq!(assignee.writing_fee(), 5000);
        assert!(result.is_err());
    }
}
