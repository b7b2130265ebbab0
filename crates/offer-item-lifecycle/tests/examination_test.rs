//! Tests for submissions and examination verdicts.

mod common;

use std::collections::HashMap;

use common::Harness;
use offer_item_core::error::DomainError;
use offer_item_lifecycle::application::examination_handlers::{
    handle_submission, handle_upload_examination_results,
};
use offer_item_lifecycle::application::query_handlers::get_examination;
use offer_item_lifecycle::domain::assignee::Stage;
use offer_item_lifecycle::domain::commands::{Submission, UploadExaminationResults};
use offer_item_lifecycle::domain::examination::{EntryType, ExaminationVerdict};
use offer_item_lifecycle::domain::ids::{AmebaId, EntryId, OfferItemId};
use offer_item_lifecycle::domain::offer_item::WorkflowFlags;
use offer_item_test_support::fixtures::{assignee_input, save_offer_item};
use uuid::Uuid;

async fn campaign(harness: &Harness, flags: WorkflowFlags, stage: Stage) -> OfferItemId {
    let mut command = save_offer_item(flags);
    command.assignees = vec![assignee_input("blogger-a", stage)];
    harness.save(&command).await.unwrap()
}

fn submission(id: &OfferItemId, entry_type: EntryType, entry_id: &str) -> Submission {
    Submission {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id.clone(),
        ameba_id: AmebaId::new("blogger-a"),
        entry_type,
        entry_id: Some(EntryId::new(entry_id)),
    }
}

fn verdict(id: &OfferItemId, entry_type: EntryType, is_passed: bool) -> UploadExaminationResults {
    UploadExaminationResults {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id.clone(),
        entry_type,
        verdicts: HashMap::from([(
            AmebaId::new("blogger-a"),
            ExaminationVerdict {
                is_passed,
                examiner_name: "Sato".into(),
                reason: (!is_passed).then(|| "logo is missing".to_owned()),
            },
        )]),
    }
}

fn stage_of(harness: &Harness, id: &OfferItemId) -> Stage {
    harness
        .store
        .assignee(id, &AmebaId::new("blogger-a"))
        .unwrap()
        .stage()
}

#[tokio::test]
async fn test_draft_submission_creates_examination_and_moves_to_pre_examination() {
    // Arrange
    let harness = Harness::new();
    let flags = WorkflowFlags {
        needs_preliminary_review: true,
        ..WorkflowFlags::default()
    };
    let id = campaign(&harness, flags, Stage::DraftSubmission).await;

    // Act
    let examination = handle_submission(
        &submission(&id, EntryType::Draft, "draft-1"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(examination.entry_type(), EntryType::Draft);
    assert_eq!(examination.created_at(), harness.clock.0);
    assert_eq!(harness.store.examinations().len(), 1);
    assert_eq!(stage_of(&harness, &id), Stage::PreExamination);
}

#[tokio::test]
async fn test_entry_submission_skips_review_when_not_required() {
    // Arrange
    let harness = Harness::new();
    let id = campaign(&harness, WorkflowFlags::default(), Stage::ArticlePosting).await;

    // Act
    handle_submission(
        &submission(&id, EntryType::Entry, "entry-1"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(stage_of(&harness, &id), Stage::Paying);
}

#[tokio::test]
async fn test_submission_without_entry_id_fails() {
    // Arrange
    let harness = Harness::new();
    let id = campaign(&harness, WorkflowFlags::default(), Stage::ArticlePosting).await;
    let mut command = submission(&id, EntryType::Entry, "entry-1");
    command.entry_id = None;

    // Act
    let result = handle_submission(&command, &harness.clock, &harness.ids, &harness.store).await;

    // Assert
    match result {
        Err(DomainError::Validation(msg)) => assert_eq!(msg, "entry id is required"),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(harness.store.examinations().is_empty());
}

#[tokio::test]
async fn test_submission_in_wrong_stage_records_nothing() {
    // Arrange
    let harness = Harness::new();
    let id = campaign(&harness, WorkflowFlags::default(), Stage::Invitation).await;

    // Act
    let result = handle_submission(
        &submission(&id, EntryType::Draft, "draft-1"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert!(harness.store.examinations().is_empty());
    assert_eq!(stage_of(&harness, &id), Stage::Invitation);
}

#[tokio::test]
async fn test_rejected_article_then_resubmission_then_pass() {
    // Arrange
    let harness = Harness::new();
    let flags = WorkflowFlags {
        needs_after_review: true,
        ..WorkflowFlags::default()
    };
    let id = campaign(&harness, flags, Stage::ArticlePosting).await;
    handle_submission(
        &submission(&id, EntryType::Entry, "entry-1"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await
    .unwrap();

    // Act
    handle_upload_examination_results(&verdict(&id, EntryType::Entry, false), &harness.store)
        .await
        .unwrap();
    let after_reject = stage_of(&harness, &id);
    handle_submission(
        &submission(&id, EntryType::Entry, "entry-2"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await
    .unwrap();
    handle_upload_examination_results(&verdict(&id, EntryType::Entry, true), &harness.store)
        .await
        .unwrap();

    // Assert
    assert_eq!(after_reject, Stage::Reexamination);
    assert_eq!(stage_of(&harness, &id), Stage::Paying);
    let assignee = harness
        .store
        .assignee(&id, &AmebaId::new("blogger-a"))
        .unwrap();
    let latest = get_examination(&id, assignee.id(), EntryType::Entry, &harness.store)
        .await
        .unwrap();
    assert_eq!(latest.entry_id(), Some(&EntryId::new("entry-2")));
    assert_eq!(latest.is_passed(), Some(true));
    assert_eq!(latest.entry_submission_count(), 2);
}

#[tokio::test]
async fn test_rejection_without_reason_fails() {
    // Arrange
    let harness = Harness::new();
    let flags = WorkflowFlags {
        needs_preliminary_review: true,
        ..WorkflowFlags::default()
    };
    let id = campaign(&harness, flags, Stage::DraftSubmission).await;
    handle_submission(
        &submission(&id, EntryType::Draft, "draft-1"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await
    .unwrap();
    let mut command = verdict(&id, EntryType::Draft, false);
    for v in command.verdicts.values_mut() {
        v.reason = None;
    }

    // Act
    let result = handle_upload_examination_results(&command, &harness.store).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert_eq!(stage_of(&harness, &id), Stage::PreExamination);
}

#[tokio::test]
async fn test_assignees_without_verdict_are_skipped() {
    // Arrange
    let harness = Harness::new();
    let flags = WorkflowFlags {
        needs_preliminary_review: true,
        ..WorkflowFlags::default()
    };
    let id = campaign(&harness, flags, Stage::DraftSubmission).await;
    handle_submission(
        &submission(&id, EntryType::Draft, "draft-1"),
        &harness.clock,
        &harness.ids,
        &harness.store,
    )
    .await
    .unwrap();
    let mut command = verdict(&id, EntryType::Draft, true);
    command.verdicts.clear();

    // Act
    let report = handle_upload_examination_results(&command, &harness.store)
        .await
        .unwrap();

    // Assert
    assert_eq!(report.transitioned, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(stage_of(&harness, &id), Stage::PreExamination);
}

#[tokio::test]
async fn test_failed_verdict_rolls_back_the_whole_batch() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags {
        needs_preliminary_review: true,
        ..WorkflowFlags::default()
    });
    command.assignees = vec![
        assignee_input("blogger-a", Stage::DraftSubmission),
        assignee_input("blogger-b", Stage::DraftSubmission),
    ];
    let id = harness.save(&command).await.unwrap();
    for ameba_id in ["blogger-a", "blogger-b"] {
        let mut draft = submission(&id, EntryType::Draft, "draft-1");
        draft.ameba_id = AmebaId::new(ameba_id);
        handle_submission(&draft, &harness.clock, &harness.ids, &harness.store)
            .await
            .unwrap();
    }
    let upload = UploadExaminationResults {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id.clone(),
        entry_type: EntryType::Draft,
        verdicts: HashMap::from([
            (
                AmebaId::new("blogger-a"),
                ExaminationVerdict {
                    is_passed: true,
                    examiner_name: "Sato".into(),
                    reason: None,
                },
            ),
            (
                AmebaId::new("blogger-b"),
                ExaminationVerdict {
                    is_passed: false,
                    examiner_name: "Sato".into(),
                    reason: None,
                },
            ),
        ]),
    };
    let commits_before = harness.store.commits();

    // Act
    let result = handle_upload_examination_results(&upload, &harness.store).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert_eq!(harness.store.commits(), commits_before);
    for ameba_id in ["blogger-a", "blogger-b"] {
        let assignee = harness
            .store
            .assignee(&id, &AmebaId::new(ameba_id))
            .unwrap();
        assert_eq!(assignee.stage(), Stage::PreExamination);
        let latest = get_examination(&id, assignee.id(), EntryType::Draft, &harness.store)
            .await
            .unwrap();
        assert_eq!(latest.is_passed(), None);
    }
}
