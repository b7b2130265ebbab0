//! Command handlers for draft and article submissions and their verdicts.

use offer_item_core::clock::Clock;
use offer_item_core::error::DomainError;
use offer_item_core::id::IdGenerator;
use tracing::{debug, info};

use super::assignee_handlers::TransitionReport;
use crate::domain::assignee::{Assignee, Stage};
use crate::domain::commands::{Submission, UploadExaminationResults};
use crate::domain::examination::{EntryType, Examination};
use crate::domain::ids::ExaminationId;
use crate::domain::repository::{
    AssigneeRepository, ExaminationRepository, OfferItemRepository, Store,
};

/// Handles `Submission`: records a new examination row and moves the
/// assignee to the matching review stage.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown campaign or assignee and
/// `DomainError::Validation` when the entry id is missing or the assignee is
/// in the wrong stage.
pub async fn handle_submission(
    command: &Submission,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    store: &dyn Store,
) -> Result<Examination, DomainError> {
    let mut uow = store.begin().await?;
    let mut assignee = uow
        .get_assignee(&command.offer_item_id, &command.ameba_id, true)
        .await?;
    let offer_item = uow.get_offer_item(&command.offer_item_id, true).await?;

    let examination = Examination::new(
        ExaminationId::new(ids.generate()),
        command.offer_item_id.clone(),
        assignee.id().clone(),
        command.ameba_id.clone(),
        command.entry_type,
        command.entry_id.clone(),
        clock.now(),
    )?;
    match command.entry_type {
        EntryType::Draft => assignee.change_stage_by_draft_submission()?,
        EntryType::Entry => {
            assignee.change_stage_by_entry_submission(offer_item.needs_after_review())?;
        }
    }

    uow.create_examination(&examination).await?;
    uow.update_assignee(&assignee).await?;
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        ameba_id = %command.ameba_id,
        entry_type = %command.entry_type,
        stage = %assignee.stage(),
        "submission recorded"
    );
    Ok(examination)
}

/// Handles `UploadExaminationResults`. Draft verdicts apply to assignees in
/// `PreExamination`, article verdicts to those in `Examination`. Assignees
/// without a verdict are skipped.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if a targeted assignee has no
/// examination row and `DomainError::Validation` when a rejection carries no
/// reason.
pub async fn handle_upload_examination_results(
    command: &UploadExaminationResults,
    store: &dyn Store,
) -> Result<TransitionReport, DomainError> {
    let stage = match command.entry_type {
        EntryType::Draft => Stage::PreExamination,
        EntryType::Entry => Stage::Examination,
    };

    let mut uow = store.begin().await?;
    let assignees = uow
        .list_assignees(&command.offer_item_id, Some(stage), true)
        .await?;
    let mut report = TransitionReport::default();
    for mut assignee in assignees {
        let Some(verdict) = command.verdicts.get(assignee.ameba_id()) else {
            report.skipped += 1;
            continue;
        };
        let mut examination = uow
            .get_latest_examination(
                &command.offer_item_id,
                assignee.id(),
                command.entry_type,
                true,
            )
            .await?;
        examination.set_examination_result(
            verdict.is_passed,
            verdict.examiner_name.clone(),
            verdict.reason.clone(),
        )?;
        apply_verdict(&mut assignee, command.entry_type, verdict.is_passed)?;

        uow.update_examination(&examination).await?;
        uow.update_assignee(&assignee).await?;
        report.transitioned += 1;
        debug!(
            ameba_id = %assignee.ameba_id(),
            is_passed = verdict.is_passed,
            stage = %assignee.stage(),
            "verdict applied"
        );
    }
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        entry_type = %command.entry_type,
        transitioned = report.transitioned,
        skipped = report.skipped,
        "examination results uploaded"
    );
    Ok(report)
}

fn apply_verdict(
    assignee: &mut Assignee,
    entry_type: EntryType,
    is_passed: bool,
) -> Result<(), DomainError> {
    match entry_type {
        EntryType::Draft => assignee.pre_examination(is_passed),
        EntryType::Entry => assignee.examination(is_passed),
    }
}
