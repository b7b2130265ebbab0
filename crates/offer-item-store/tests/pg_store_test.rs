//! Lifecycle handlers running against a real `PostgreSQL` store.

use std::collections::HashMap;

use offer_item_core::error::DomainError;
use offer_item_core::list::{ListCondition, Sort};
use offer_item_lifecycle::application::assignee_handlers::{
    handle_invitation, handle_invite_offer,
};
use offer_item_lifecycle::application::examination_handlers::{
    handle_submission, handle_upload_examination_results,
};
use offer_item_lifecycle::application::offer_item_handlers::{
    SaveContext, ValidationSettings, handle_delete_offer_item, handle_save_offer_item,
};
use offer_item_lifecycle::application::query_handlers::{
    bulk_get_examinations, get_offer_item, get_questionnaire, list_offer_item_ids_by_end_date,
    list_stage_assignee_counts, search_offer_items,
};
use offer_item_lifecycle::domain::assignee::Stage;
use offer_item_lifecycle::domain::commands::{
    DeleteOfferItem, Invitation, InviteOffer, SaveOfferItem, Submission, UploadExaminationResults,
};
use offer_item_lifecycle::domain::examination::{EntryType, ExaminationVerdict};
use offer_item_lifecycle::domain::ids::{AmebaId, EntryId, OfferItemId, QuestionId};
use offer_item_lifecycle::domain::offer_item::WorkflowFlags;
use offer_item_lifecycle::domain::repository::{SearchCriteria, Store};
use offer_item_store::{PgCatalogAdapter, PgStore};
use offer_item_test_support::fixtures::{
    assignee_input, at, catalog_df_item, catalog_item, questionnaire_input, save_offer_item,
};
use offer_item_test_support::{FixedClock, SequenceIdGenerator};
use sqlx::PgPool;
use uuid::Uuid;

struct PgHarness {
    store: PgStore,
    catalog: PgCatalogAdapter,
    clock: FixedClock,
    ids: SequenceIdGenerator,
    settings: ValidationSettings,
}

impl PgHarness {
    async fn new(pool: PgPool) -> Self {
        let catalog = PgCatalogAdapter::new(pool.clone());
        catalog.put_item(&catalog_item()).await.unwrap();
        catalog.put_df_item(&catalog_df_item()).await.unwrap();
        Self {
            store: PgStore::new(pool),
            catalog,
            clock: FixedClock::standard(),
            ids: SequenceIdGenerator::new(),
            settings: ValidationSettings::default(),
        }
    }

    async fn save(&self, command: &SaveOfferItem) -> Result<OfferItemId, DomainError> {
        let ctx = SaveContext {
            settings: &self.settings,
            clock: &self.clock,
            ids: &self.ids,
            catalog: &self.catalog,
        };
        handle_save_offer_item(command, ctx, &self.store).await
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_saved_offer_item_round_trips(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool).await;
    let mut command = save_offer_item(WorkflowFlags::default());
    command.questionnaire = Some(questionnaire_input());
    command.assignees = vec![assignee_input("blogger-a", Stage::BeforeInvitation)];

    // Act
    let id = harness.save(&command).await.unwrap();
    let loaded = get_offer_item(&id, &harness.catalog, &harness.store)
        .await
        .unwrap();
    let questionnaire = get_questionnaire(&id, &harness.store).await.unwrap();

    // Assert
    assert_eq!(loaded.name(), "Spring serum campaign");
    assert_eq!(loaded.item().name, "Hydrating Serum");
    assert_eq!(loaded.schedules().len(), 3);
    assert_eq!(loaded.created_at(), harness.clock.0);
    assert_eq!(questionnaire.questions().len(), 2);
    assert_eq!(questionnaire.questions()[0].title(), "Skin type?");
    assert_eq!(questionnaire.questions()[0].options(), ["dry", "oily"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_unknown_offer_item_is_not_found(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool).await;

    // Act
    let result = get_offer_item(
        &OfferItemId::new("missing"),
        &harness.catalog,
        &harness.store,
    )
    .await;

    // Assert
    assert!(matches!(result, Err(DomainError::NotFound(_))));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_search_pages_and_filters_by_name(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool).await;
    for name in ["Alpha serum", "Bravo serum", "Charlie lotion"] {
        let mut command = save_offer_item(WorkflowFlags::default());
        command.name = name.into();
        harness.save(&command).await.unwrap();
    }
    let criteria = SearchCriteria {
        name_contains: Some("SERUM".into()),
        ..SearchCriteria::default()
    };
    let condition = ListCondition::new(
        1,
        1,
        vec![Sort {
            order_by: "name".into(),
            desc: false,
        }],
    )
    .unwrap();

    // Act
    let view = search_offer_items(&criteria, &condition, &harness.catalog, &harness.store)
        .await
        .unwrap();

    // Assert
    assert_eq!(view.offer_items.len(), 1);
    assert_eq!(view.offer_items[0].name(), "Bravo serum");
    assert_eq!(view.list_result.total_count, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_end_date_range_is_inclusive(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool).await;
    let id = harness
        .save(&save_offer_item(WorkflowFlags::default()))
        .await
        .unwrap();

    // Act
    let hits = list_offer_item_ids_by_end_date(at(10), at(10), &harness.store)
        .await
        .unwrap();
    let misses = list_offer_item_ids_by_end_date(at(11), at(12), &harness.store)
        .await
        .unwrap();

    // Assert
    assert_eq!(hits, vec![id]);
    assert!(misses.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_invitation_flow_persists_stage_and_answers(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool.clone()).await;
    let mut command = save_offer_item(WorkflowFlags::default());
    command.questionnaire = Some(questionnaire_input());
    command.assignees = vec![assignee_input("blogger-a", Stage::BeforeInvitation)];
    let id = harness.save(&command).await.unwrap();
    let questionnaire = get_questionnaire(&id, &harness.store).await.unwrap();
    let answers: HashMap<QuestionId, String> = questionnaire
        .questions()
        .iter()
        .zip(["dry", "The serum"])
        .map(|(question, answer)| (question.id().clone(), answer.to_owned()))
        .collect();

    // Act
    handle_invite_offer(
        &InviteOffer {
            correlation_id: Uuid::new_v4(),
            offer_item_id: id.clone(),
        },
        &harness.store,
    )
    .await
    .unwrap();
    let assignee = handle_invitation(
        &Invitation {
            correlation_id: Uuid::new_v4(),
            offer_item_id: id.clone(),
            ameba_id: AmebaId::new("blogger-a"),
            accepted: true,
            answers,
        },
        &harness.store,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(assignee.stage(), Stage::ArticlePosting);
    let counts = list_stage_assignee_counts(&id, &harness.store)
        .await
        .unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].stage, Stage::ArticlePosting);
    let stored: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM questionnaire_question_answer WHERE offer_item_id = $1",
    )
    .bind(id.as_str())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(stored, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_resubmission_after_rejection_counts_submissions(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool).await;
    let flags = WorkflowFlags {
        needs_after_review: true,
        ..WorkflowFlags::default()
    };
    let mut command = save_offer_item(flags);
    command.assignees = vec![assignee_input("blogger-a", Stage::ArticlePosting)];
    let id = harness.save(&command).await.unwrap();
    let submit = |entry_id: &str| Submission {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id.clone(),
        ameba_id: AmebaId::new("blogger-a"),
        entry_type: EntryType::Entry,
        entry_id: Some(EntryId::new(entry_id)),
    };
    let reject = UploadExaminationResults {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id.clone(),
        entry_type: EntryType::Entry,
        verdicts: HashMap::from([(
            AmebaId::new("blogger-a"),
            ExaminationVerdict {
                is_passed: false,
                examiner_name: "Sato".into(),
                reason: Some("logo is missing".into()),
            },
        )]),
    };

    // Act
    handle_submission(&submit("entry-1"), &harness.clock, &harness.ids, &harness.store)
        .await
        .unwrap();
    handle_upload_examination_results(&reject, &harness.store)
        .await
        .unwrap();
    handle_submission(&submit("entry-2"), &harness.clock, &harness.ids, &harness.store)
        .await
        .unwrap();
    let latest = bulk_get_examinations(&id, EntryType::Entry, &harness.store)
        .await
        .unwrap();

    // Assert
    let examination = &latest[&AmebaId::new("blogger-a")];
    assert_eq!(examination.entry_id().map(EntryId::as_str), Some("entry-2"));
    assert_eq!(examination.is_passed(), None);
    assert_eq!(examination.entry_submission_count(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_hides_offer_item_and_removes_assignees(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool.clone()).await;
    let mut command = save_offer_item(WorkflowFlags::default());
    command.assignees = vec![assignee_input("blogger-a", Stage::BeforeInvitation)];
    let id = harness.save(&command).await.unwrap();

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
    let result = get_offer_item(&id, &harness.catalog, &harness.store).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    let assignees: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assignee")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(assignees, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_campaign_id_conflicts(pool: PgPool) {
    // Arrange
    let harness = PgHarness::new(pool).await;
    let id = harness
        .save(&save_offer_item(WorkflowFlags::default()))
        .await
        .unwrap();
    let mut uow = harness.store.begin().await.unwrap();
    let existing = uow.get_offer_item(&id, true).await.unwrap();

    // Act
    let result = uow.create_offer_item(&existing).await;

    // Assert
    assert!(matches!(result, Err(DomainError::Conflict(_))));
}
