//! Command handlers that move assignees through the stage machine.
//!
//! Bulk handlers load the affected assignees with a row lock, apply the
//! guarded transition to each, and abort the whole unit of work on the first
//! guard failure.

use std::collections::HashSet;

use offer_item_core::error::DomainError;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::assignee::{Assignee, Stage};
use crate::domain::commands::{
    Decline, FinishedShipment, Invitation, InviteOffer, PaymentCompleted, UploadLotteryResults,
};
use crate::domain::questionnaire::QuestionAnswer;
use crate::domain::repository::{
    AssigneeRepository, OfferItemRepository, QuestionAnswerRepository, QuestionnaireRepository,
    Store,
};

/// Outcome of a bulk transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TransitionReport {
    /// Assignees whose stage changed.
    pub transitioned: usize,
    /// Candidate assignees left untouched.
    pub skipped: usize,
}

/// Handles `InviteOffer`: every assignee before invitation is invited.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the campaign does not exist and
/// propagates store failures.
pub async fn handle_invite_offer(
    command: &InviteOffer,
    store: &dyn Store,
) -> Result<TransitionReport, DomainError> {
    let mut uow = store.begin().await?;
    uow.get_offer_item(&command.offer_item_id, false).await?;

    let assignees = uow
        .list_assignees(&command.offer_item_id, Some(Stage::BeforeInvitation), true)
        .await?;
    let mut report = TransitionReport::default();
    for mut assignee in assignees {
        assignee.set_stage_invitation()?;
        uow.update_assignee(&assignee).await?;
        report.transitioned += 1;
        debug!(ameba_id = %assignee.ameba_id(), "assignee invited");
    }
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        transitioned = report.transitioned,
        "invitations sent"
    );
    Ok(report)
}

/// Handles `Invitation`: the blogger accepts or refuses. On acceptance the
/// questionnaire answers are validated and stored in the same unit of work.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown campaign or assignee,
/// `DomainError::Validation` for a guard failure or invalid answers.
pub async fn handle_invitation(
    command: &Invitation,
    store: &dyn Store,
) -> Result<Assignee, DomainError> {
    let mut uow = store.begin().await?;
    let offer_item = uow.get_offer_item(&command.offer_item_id, true).await?;
    let questionnaire = uow
        .find_questionnaire(&command.offer_item_id, false)
        .await?;
    let mut assignee = uow
        .get_assignee(&command.offer_item_id, &command.ameba_id, true)
        .await?;

    if command.accepted {
        assignee.invitation(&offer_item)?;
        if let Some(questionnaire) = questionnaire {
            let answers =
                QuestionAnswer::for_questionnaire(assignee.id(), &questionnaire, &command.answers)?;
            uow.save_question_answers(&answers).await?;
        }
    } else {
        assignee.set_stage_done_from_invitation()?;
    }
    uow.update_assignee(&assignee).await?;
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        ameba_id = %command.ameba_id,
        accepted = command.accepted,
        stage = %assignee.stage(),
        "invitation answered"
    );
    Ok(assignee)
}

/// Handles `Decline`: withdraws the assignee from any stage.
///
/// # Errors
///
/// Returns `DomainError::NotFound` for an unknown assignee and
/// `DomainError::Validation` for a missing or overlong reason.
pub async fn handle_decline(command: &Decline, store: &dyn Store) -> Result<Assignee, DomainError> {
    let mut uow = store.begin().await?;
    let mut assignee = uow
        .get_assignee(&command.offer_item_id, &command.ameba_id, true)
        .await?;
    assignee.set_stage_done_by_decline(command.reason.clone())?;
    uow.update_assignee(&assignee).await?;
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        ameba_id = %command.ameba_id,
        "assignee declined"
    );
    Ok(assignee)
}

/// Handles `UploadLotteryResults`. Assignees in the lottery stage without a
/// result are skipped, so uploading the same file twice is harmless.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the campaign does not exist and
/// propagates store failures.
pub async fn handle_upload_lottery_results(
    command: &UploadLotteryResults,
    store: &dyn Store,
) -> Result<TransitionReport, DomainError> {
    let mut uow = store.begin().await?;
    let offer_item = uow.get_offer_item(&command.offer_item_id, true).await?;

    let assignees = uow
        .list_assignees(&command.offer_item_id, Some(Stage::Lottery), true)
        .await?;
    let mut report = TransitionReport::default();
    for mut assignee in assignees {
        let Some(result) = command.results.get(assignee.ameba_id()) else {
            report.skipped += 1;
            continue;
        };
        if result.is_passed_lottery {
            assignee.change_stage_by_lottery_result(
                &offer_item,
                result.shipping_data.clone(),
                result.jan_code.clone(),
            )?;
        } else {
            assignee.set_stage_lottery_lost()?;
        }
        uow.update_assignee(&assignee).await?;
        report.transitioned += 1;
        debug!(ameba_id = %assignee.ameba_id(), stage = %assignee.stage(), "lottery applied");
    }
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        transitioned = report.transitioned,
        skipped = report.skipped,
        "lottery results uploaded"
    );
    Ok(report)
}

/// Handles `FinishedShipment` for every assignee in the shipment stage.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the campaign does not exist and
/// propagates store failures.
pub async fn handle_finished_shipment(
    command: &FinishedShipment,
    store: &dyn Store,
) -> Result<TransitionReport, DomainError> {
    let mut uow = store.begin().await?;
    let offer_item = uow.get_offer_item(&command.offer_item_id, true).await?;

    let assignees = uow
        .list_assignees(&command.offer_item_id, Some(Stage::Shipment), true)
        .await?;
    let mut report = TransitionReport::default();
    for mut assignee in assignees {
        assignee.finished_shipment(offer_item.needs_preliminary_review())?;
        uow.update_assignee(&assignee).await?;
        report.transitioned += 1;
    }
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        transitioned = report.transitioned,
        "shipment finished"
    );
    Ok(report)
}

/// Handles `PaymentCompleted`. Listed bloggers that are not paying are
/// ignored.
///
/// # Errors
///
/// Returns `DomainError::Validation` when a blogger is listed twice,
/// `DomainError::NotFound` if the campaign does not exist, and propagates
/// store failures.
pub async fn handle_payment_completed(
    command: &PaymentCompleted,
    store: &dyn Store,
) -> Result<TransitionReport, DomainError> {
    let mut seen = HashSet::with_capacity(command.ameba_ids.len());
    if let Some(duplicate) = command.ameba_ids.iter().find(|id| !seen.insert(*id)) {
        return Err(DomainError::validation(format!(
            "ameba id {duplicate} is listed more than once"
        )));
    }

    let mut uow = store.begin().await?;
    uow.get_offer_item(&command.offer_item_id, false).await?;
    let assignees = uow
        .list_assignees_by_ameba_ids(
            &command.offer_item_id,
            &command.ameba_ids,
            Some(Stage::Paying),
            true,
        )
        .await?;
    let mut report = TransitionReport {
        transitioned: 0,
        skipped: command.ameba_ids.len().saturating_sub(assignees.len()),
    };
    for mut assignee in assignees {
        assignee.set_stage_payment_completed()?;
        uow.update_assignee(&assignee).await?;
        report.transitioned += 1;
    }
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        transitioned = report.transitioned,
        skipped = report.skipped,
        "payments completed"
    );
    Ok(report)
}
