//! Tests for creating, updating, completing and deleting campaigns.

mod common;

use common::Harness;
use offer_item_core::error::DomainError;
use offer_item_lifecycle::application::assignee_handlers::handle_invite_offer;
use offer_item_lifecycle::application::offer_item_handlers::{
    SaveContext, ValidationSettings, handle_completed_offer_item, handle_delete_offer_item,
    handle_save_offer_item,
};
use offer_item_lifecycle::domain::assignee::Stage;
use offer_item_lifecycle::domain::commands::{
    CompletedOfferItem, DeleteOfferItem, InviteOffer, SaveOfferItem, ScheduleInput,
};
use offer_item_lifecycle::domain::examination::{EntryType, Examination};
use offer_item_lifecycle::domain::ids::{
    AmebaId, DfItemId, EntryId, ExaminationId, OfferItemId, ScheduleId,
};
use offer_item_lifecycle::domain::offer_item::WorkflowFlags;
use offer_item_lifecycle::domain::schedule::ScheduleType;
use offer_item_test_support::fixtures::{
    DF_ITEM_ID, assignee_input, at, questionnaire_input, save_offer_item,
};
use offer_item_test_support::{FailingStore, FixedClock};
use uuid::Uuid;

/// An update of `id` that names the stored schedules by id.
fn update_of(harness: &Harness, id: &OfferItemId) -> SaveOfferItem {
    let mut command = SaveOfferItem {
        offer_item_id: Some(id.clone()),
        ..save_offer_item(WorkflowFlags::default())
    };
    let offer_items = harness.store.offer_items();
    if let Some(stored) = offer_items.iter().find(|o| o.id() == id) {
        for input in &mut command.schedules {
            input.id = stored
                .schedules()
                .iter()
                .find(|s| s.schedule_type() == input.schedule_type)
                .map(|s| s.id().clone());
        }
    }
    command
}

async fn created(harness: &Harness, command: &SaveOfferItem) -> OfferItemId {
    harness.save(command).await.unwrap()
}

#[tokio::test]
async fn test_save_creates_offer_item_schedules_and_assignees() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags::default());
    command.assignees = vec![
        assignee_input("blogger-a", Stage::BeforeInvitation),
        assignee_input("blogger-b", Stage::Invitation),
    ];

    // Act
    let id = harness.save(&command).await.unwrap();

    // Assert
    assert_eq!(id, OfferItemId::new("id-0001"));
    let offer_items = harness.store.offer_items();
    assert_eq!(offer_items.len(), 1);
    assert_eq!(offer_items[0].name(), "Spring serum campaign");
    assert_eq!(offer_items[0].item().name, "Hydrating Serum");
    assert_eq!(offer_items[0].schedules().len(), 3);
    assert_eq!(offer_items[0].created_at(), FixedClock::standard().0);

    let assignees = harness.store.assignees();
    assert_eq!(assignees.len(), 2);
    assert_eq!(assignees[0].stage(), Stage::BeforeInvitation);
    assert_eq!(assignees[1].stage(), Stage::Invitation);
    assert_eq!(assignees[1].writing_fee(), 3000);
    assert_eq!(harness.store.commits(), 1);
}

#[tokio::test]
async fn test_save_creates_questionnaire_and_df_item() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags::default());
    command.df_item_id = Some(DfItemId::new(DF_ITEM_ID));
    command.questionnaire = Some(questionnaire_input());

    // Act
    let id = harness.save(&command).await.unwrap();

    // Assert
    let offer_item = &harness.store.offer_items()[0];
    assert_eq!(offer_item.df_item().unwrap().name, "Hydrating Serum (DF)");
    assert_eq!(
        offer_item.pick_info().df_item_id,
        Some(DfItemId::new(DF_ITEM_ID))
    );
    let questionnaire = harness.store.questionnaire(&id).unwrap();
    assert_eq!(questionnaire.questions().len(), 2);
    assert_eq!(questionnaire.questions()[0].title(), "Skin type?");
}

#[tokio::test]
async fn test_save_rejects_new_assignee_in_examination_stage() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags::default());
    command.assignees = vec![
        assignee_input("blogger-a", Stage::BeforeInvitation),
        assignee_input("blogger-b", Stage::Examination),
    ];

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert!(harness.store.offer_items().is_empty());
    assert!(harness.store.assignees().is_empty());
    assert_eq!(harness.store.commits(), 0);
}

#[tokio::test]
async fn test_save_ignores_deleted_entries_on_create() {
    // Arrange
    let harness = Harness::new();
    let mut deleted = assignee_input("blogger-b", Stage::BeforeInvitation);
    deleted.is_deleted = true;
    let mut command = save_offer_item(WorkflowFlags::default());
    command.assignees = vec![assignee_input("blogger-a", Stage::BeforeInvitation), deleted];

    // Act
    harness.save(&command).await.unwrap();

    // Assert
    let assignees = harness.store.assignees();
    assert_eq!(assignees.len(), 1);
    assert_eq!(assignees[0].ameba_id(), &AmebaId::new("blogger-a"));
}

#[tokio::test]
async fn test_save_rejects_empty_item_id() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags::default());
    command.item_id = "".into();

    // Act
    let result = harness.save(&command).await;

    // Assert
    match result {
        Err(DomainError::Validation(msg)) => assert_eq!(msg, "item id is required"),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_save_rejects_more_assignees_than_allowed() {
    // Arrange
    let harness = Harness::new();
    let settings = ValidationSettings {
        max_input_assignee_list_num: 1,
    };
    let ctx = SaveContext {
        settings: &settings,
        ..harness.ctx()
    };
    let mut command = save_offer_item(WorkflowFlags::default());
    command.assignees = vec![
        assignee_input("blogger-a", Stage::BeforeInvitation),
        assignee_input("blogger-b", Stage::BeforeInvitation),
    ];

    // Act
    let result = handle_save_offer_item(&command, ctx, &harness.store).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_save_rejects_duplicate_ameba_ids() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags::default());
    command.assignees = vec![
        assignee_input("blogger-a", Stage::BeforeInvitation),
        assignee_input("blogger-a", Stage::Invitation),
    ];

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_save_returns_not_found_for_unknown_catalog_item() {
    // Arrange
    let harness = Harness::new();
    let mut command = save_offer_item(WorkflowFlags::default());
    command.item_id = "item-unknown".into();

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_save_propagates_store_failure() {
    // Arrange
    let harness = Harness::new();
    let command = save_offer_item(WorkflowFlags::default());

    // Act
    let result = handle_save_offer_item(&command, harness.ctx(), &FailingStore).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
}

#[tokio::test]
async fn test_update_returns_not_found_for_unknown_offer_item() {
    // Arrange
    let harness = Harness::new();
    let mut command = update_of(&harness, &OfferItemId::new("missing"));
    for (n, input) in command.schedules.iter_mut().enumerate() {
        input.id = Some(ScheduleId::new(format!("schedule-{n}")));
    }

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_update_applies_fields_and_keeps_schedule_ids() {
    // Arrange
    let harness = Harness::new();
    let id = created(&harness, &save_offer_item(WorkflowFlags::default())).await;
    let original_ids: Vec<ScheduleId> = harness.store.offer_items()[0]
        .schedules()
        .iter()
        .map(|s| s.id().clone())
        .collect();

    let mut command = update_of(&harness, &id);
    command.name = "Summer serum campaign".into();
    command.flags.has_lottery = true;
    command.schedules[0].end_date = Some(at(12));

    // Act
    harness.save(&command).await.unwrap();

    // Assert
    let offer_item = &harness.store.offer_items()[0];
    assert_eq!(offer_item.name(), "Summer serum campaign");
    assert!(offer_item.has_lottery());
    let ids: Vec<ScheduleId> = offer_item
        .schedules()
        .iter()
        .map(|s| s.id().clone())
        .collect();
    assert_eq!(ids, original_ids);
    let invitation = offer_item
        .schedules()
        .iter()
        .find(|s| s.schedule_type() == ScheduleType::Invitation)
        .unwrap();
    assert_eq!(invitation.end_date(), Some(at(12)));
}

#[tokio::test]
async fn test_update_with_unknown_schedule_id_leaves_offer_item_unchanged() {
    // Arrange
    let harness = Harness::new();
    let id = created(&harness, &save_offer_item(WorkflowFlags::default())).await;
    let mut command = update_of(&harness, &id);
    command.name = "Renamed".into();
    command.schedules[0].id = Some(ScheduleId::new("no-such-schedule"));

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    assert_eq!(harness.store.offer_items()[0].name(), "Spring serum campaign");
}

#[tokio::test]
async fn test_update_rejects_schedules_without_id() {
    // Arrange
    let harness = Harness::new();
    let id = created(&harness, &save_offer_item(WorkflowFlags::default())).await;
    let mut command = save_offer_item(WorkflowFlags::default());
    command.offer_item_id = Some(id.clone());
    command.name = "Renamed".into();
    command.schedules.push(ScheduleInput {
        id: None,
        schedule_type: ScheduleType::Lottery,
        start_date: Some(at(11)),
        end_date: Some(at(12)),
    });
    let commits_before = harness.store.commits();

    // Act
    let result = harness.save(&command).await;

    // Assert
    match result {
        Err(DomainError::Validation(message)) => assert_eq!(message, "schedule id is required"),
        other => panic!("expected validation error, got {other:?}"),
    }
    let offer_item = &harness.store.offer_items()[0];
    assert_eq!(offer_item.name(), "Spring serum campaign");
    assert_eq!(offer_item.schedules().len(), 3);
    assert_eq!(harness.store.commits(), commits_before);
}

#[tokio::test]
async fn test_update_with_blank_schedule_id_is_rejected() {
    // Arrange
    let harness = Harness::new();
    let id = created(&harness, &save_offer_item(WorkflowFlags::default())).await;
    let mut command = update_of(&harness, &id);
    command.schedules[1].id = Some(ScheduleId::new(""));

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_update_creates_updates_and_deletes_assignees() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.assignees = vec![
        assignee_input("blogger-a", Stage::BeforeInvitation),
        assignee_input("blogger-b", Stage::BeforeInvitation),
    ];
    let id = created(&harness, &create).await;

    let mut command = update_of(&harness, &id);
    let mut updated = assignee_input("blogger-a", Stage::Invitation);
    updated.writing_fee = 5000;
    let mut deleted = assignee_input("blogger-b", Stage::BeforeInvitation);
    deleted.is_deleted = true;
    command.assignees = vec![
        updated,
        deleted,
        assignee_input("blogger-c", Stage::BeforeInvitation),
    ];

    // Act
    harness.save(&command).await.unwrap();

    // Assert
    let a = harness.store.assignee(&id, &AmebaId::new("blogger-a")).unwrap();
    assert_eq!(a.stage(), Stage::Invitation);
    assert_eq!(a.writing_fee(), 5000);
    assert!(harness.store.assignee(&id, &AmebaId::new("blogger-b")).is_none());
    assert!(harness.store.assignee(&id, &AmebaId::new("blogger-c")).is_some());
}

#[tokio::test]
async fn test_update_rejects_deleting_invited_assignee() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.assignees = vec![assignee_input("blogger-a", Stage::BeforeInvitation)];
    let id = created(&harness, &create).await;
    handle_invite_offer(
        &InviteOffer {
            correlation_id: Uuid::new_v4(),
            offer_item_id: id.clone(),
        },
        &harness.store,
    )
    .await
    .unwrap();

    let mut command = update_of(&harness, &id);
    let mut deleted = assignee_input("blogger-a", Stage::Invitation);
    deleted.is_deleted = true;
    command.assignees = vec![deleted];

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert!(harness.store.assignee(&id, &AmebaId::new("blogger-a")).is_some());
}

#[tokio::test]
async fn test_update_requires_examination_before_examination_stage() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.assignees = vec![assignee_input("blogger-a", Stage::ArticlePosting)];
    let id = created(&harness, &create).await;

    let mut command = update_of(&harness, &id);
    command.assignees = vec![assignee_input("blogger-a", Stage::Examination)];

    // Act
    let result = harness.save(&command).await;

    // Assert
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    let assignee = harness.store.assignee(&id, &AmebaId::new("blogger-a")).unwrap();
    assert_eq!(assignee.stage(), Stage::ArticlePosting);
}

#[tokio::test]
async fn test_update_moves_to_examination_stage_when_examination_exists() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.assignees = vec![assignee_input("blogger-a", Stage::ArticlePosting)];
    let id = created(&harness, &create).await;
    let assignee = harness.store.assignee(&id, &AmebaId::new("blogger-a")).unwrap();
    harness.store.insert_examination(
        Examination::new(
            ExaminationId::new("exam-1"),
            id.clone(),
            assignee.id().clone(),
            AmebaId::new("blogger-a"),
            EntryType::Entry,
            Some(EntryId::new("entry-1")),
            at(12),
        )
        .unwrap(),
    );

    let mut command = update_of(&harness, &id);
    command.assignees = vec![assignee_input("blogger-a", Stage::Examination)];

    // Act
    harness.save(&command).await.unwrap();

    // Assert
    let assignee = harness.store.assignee(&id, &AmebaId::new("blogger-a")).unwrap();
    assert_eq!(assignee.stage(), Stage::Examination);
}

#[tokio::test]
async fn test_update_without_questionnaire_deletes_it() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.questionnaire = Some(questionnaire_input());
    let id = created(&harness, &create).await;

    // Act
    harness.save(&update_of(&harness, &id)).await.unwrap();

    // Assert
    assert!(harness.store.questionnaire(&id).is_none());
}

#[tokio::test]
async fn test_update_reuses_question_ids() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.questionnaire = Some(questionnaire_input());
    let id = created(&harness, &create).await;
    let before = harness.store.questionnaire(&id).unwrap();

    let mut input = questionnaire_input();
    input.questions[0].id = Some(before.questions()[0].id().clone());
    input.questions[0].title = "What is your skin type?".into();
    let mut command = update_of(&harness, &id);
    command.questionnaire = Some(input);

    // Act
    harness.save(&command).await.unwrap();

    // Assert
    let after = harness.store.questionnaire(&id).unwrap();
    assert_eq!(after.questions()[0].id(), before.questions()[0].id());
    assert_eq!(after.questions()[0].title(), "What is your skin type?");
    assert_ne!(after.questions()[1].id(), before.questions()[1].id());
}

#[tokio::test]
async fn test_completed_offer_item_finishes_assignees_and_closes() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.assignees = vec![
        assignee_input("blogger-a", Stage::BeforeInvitation),
        assignee_input("blogger-b", Stage::Paying),
    ];
    let id = created(&harness, &create).await;

    // Act
    let finished = handle_completed_offer_item(
        &CompletedOfferItem {
            correlation_id: Uuid::new_v4(),
            offer_item_id: id.clone(),
        },
        &harness.store,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(finished, 2);
    assert!(harness.store.offer_items()[0].is_closed());
    assert!(
        harness
            .store
            .assignees()
            .iter()
            .all(|a| a.stage() == Stage::Done)
    );
}

#[tokio::test]
async fn test_delete_offer_item_removes_owned_rows() {
    // Arrange
    let harness = Harness::new();
    let mut create = save_offer_item(WorkflowFlags::default());
    create.assignees = vec![assignee_input("blogger-a", Stage::BeforeInvitation)];
    create.questionnaire = Some(questionnaire_input());
    let id = created(&harness, &create).await;

    // Act
    handle_delete_offer_item(
        &DeleteOfferItem {
            correlation_id: Uuid::new_v4(),
            offer_item_id: id.clone(),
        },
        &harness.store,
    )
    .await
    .unwrap();

    // Assert
    assert!(harness.store.offer_items().is_empty());
    assert!(harness.store.assignees().is_empty());
    assert!(harness.store.questionnaire(&id).is_none());
}

#[tokio::test]
async fn test_delete_missing_offer_item_succeeds() {
    // Arrange
    let harness = Harness::new();

    // Act
    let result = handle_delete_offer_item(
        &DeleteOfferItem {
            correlation_id: Uuid::new_v4(),
            offer_item_id: OfferItemId::new("missing"),
        },
        &harness.store,
    )
    .await;

    // Assert
    assert!(result.is_ok());
}
