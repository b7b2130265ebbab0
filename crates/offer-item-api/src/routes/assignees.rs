//! Assignee endpoints: invitation, lottery, shipment, decline, payment and
//! the assignee queries.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get, routing::post};
use offer_item_core::error::DomainError;
use offer_item_lifecycle::application::assignee_handlers::{
    TransitionReport, handle_decline, handle_finished_shipment, handle_invitation,
    handle_invite_offer, handle_payment_completed, handle_upload_lottery_results,
};
use offer_item_lifecycle::application::query_handlers::{self, AssigneeOfferItemPair};
use offer_item_lifecycle::domain::assignee::{Assignee, AssigneeCount, LotteryResult, Stage};
use offer_item_lifecycle::domain::commands::{
    Decline, FinishedShipment, Invitation, InviteOffer, PaymentCompleted, UploadLotteryResults,
};
use offer_item_lifecycle::domain::ids::{AmebaId, OfferItemId, QuestionId};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::offer_items::AmebaIdsRequest;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{id}/lottery-results.
#[derive(Debug, Deserialize)]
pub struct LotteryResultsRequest {
    #[serde(default)]
    pub lottery_results: HashMap<AmebaId, LotteryResult>,
    /// Pass/fail flags without shipping data. No longer accepted.
    #[serde(default)]
    pub legacy_lottery_results: HashMap<AmebaId, bool>,
}

/// Request body for POST /{id}/assignees/{ameba_id}/invitation.
#[derive(Debug, Deserialize)]
pub struct InvitationRequest {
    pub accepted: bool,
    #[serde(default)]
    pub answers: HashMap<QuestionId, String>,
}

/// Request body for POST /{id}/assignees/{ameba_id}/decline.
#[derive(Debug, Deserialize)]
pub struct DeclineRequest {
    pub reason: String,
}

/// Query parameters for GET /{id}/assignees.
#[derive(Debug, Deserialize)]
pub struct StageParams {
    pub stage: Option<Stage>,
}

/// POST /{id}/invite
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn invite_offer(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<TransitionReport>, ApiError> {
    let command = InviteOffer {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling invite_offer command");

    let report = handle_invite_offer(&command, state.store.as_ref()).await?;
    Ok(Json(report))
}

/// POST /{id}/lottery-results
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn upload_lottery_results(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
    Json(request): Json<LotteryResultsRequest>,
) -> Result<Json<TransitionReport>, ApiError> {
    if !request.legacy_lottery_results.is_empty() {
        return Err(DomainError::validation(
            "legacy_lottery_results is no longer supported, send lottery_results",
        )
        .into());
    }
    let command = UploadLotteryResults {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
        results: request.lottery_results,
    };

    info!(correlation_id = %command.correlation_id, "handling upload_lottery_results command");

    let report = handle_upload_lottery_results(&command, state.store.as_ref()).await?;
    Ok(Json(report))
}

/// POST /{id}/finished-shipment
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn finished_shipment(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<TransitionReport>, ApiError> {
    let command = FinishedShipment {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling finished_shipment command");

    let report = handle_finished_shipment(&command, state.store.as_ref()).await?;
    Ok(Json(report))
}

/// POST /{id}/payment-completed
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn payment_completed(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
    Json(request): Json<AmebaIdsRequest>,
) -> Result<Json<TransitionReport>, ApiError> {
    let command = PaymentCompleted {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
        ameba_ids: request.ameba_ids,
    };

    info!(correlation_id = %command.correlation_id, "handling payment_completed command");

    let report = handle_payment_completed(&command, state.store.as_ref()).await?;
    Ok(Json(report))
}

/// POST /{id}/assignees/{ameba_id}/invitation
#[instrument(skip_all, fields(offer_item_id = %id, ameba_id = %ameba_id))]
async fn answer_invitation(
    State(state): State<AppState>,
    Path((id, ameba_id)): Path<(OfferItemId, AmebaId)>,
    Json(request): Json<InvitationRequest>,
) -> Result<Json<Assignee>, ApiError> {
    let command = Invitation {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
        ameba_id,
        accepted: request.accepted,
        answers: request.answers,
    };

    info!(correlation_id = %command.correlation_id, "handling invitation command");

    let assignee = handle_invitation(&command, state.store.as_ref()).await?;
    Ok(Json(assignee))
}

/// POST /{id}/assignees/{ameba_id}/decline
#[instrument(skip_all, fields(offer_item_id = %id, ameba_id = %ameba_id))]
async fn decline(
    State(state): State<AppState>,
    Path((id, ameba_id)): Path<(OfferItemId, AmebaId)>,
    Json(request): Json<DeclineRequest>,
) -> Result<Json<Assignee>, ApiError> {
    let command = Decline {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
        ameba_id,
        reason: request.reason,
    };

    info!(correlation_id = %command.correlation_id, "handling decline command");

    let assignee = handle_decline(&command, state.store.as_ref()).await?;
    Ok(Json(assignee))
}

/// GET /{id}/assignees
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn list_assignees(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
    Query(params): Query<StageParams>,
) -> Result<Json<Vec<Assignee>>, ApiError> {
    let assignees =
        query_handlers::list_assignees(&id, params.stage, state.store.as_ref()).await?;
    Ok(Json(assignees))
}

/// GET /{id}/assignee-counts
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn list_stage_assignee_counts(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<Vec<AssigneeCount>>, ApiError> {
    let counts = query_handlers::list_stage_assignee_counts(&id, state.store.as_ref()).await?;
    Ok(Json(counts))
}

/// GET /{id}/assignees/{ameba_id}
#[instrument(skip_all, fields(offer_item_id = %id, ameba_id = %ameba_id))]
async fn get_assignee(
    State(state): State<AppState>,
    Path((id, ameba_id)): Path<(OfferItemId, AmebaId)>,
) -> Result<Json<Assignee>, ApiError> {
    let assignee = query_handlers::get_assignee(&id, &ameba_id, state.store.as_ref()).await?;
    Ok(Json(assignee))
}

/// GET /under-examination
#[instrument(skip_all)]
async fn list_assignees_under_examination(
    State(state): State<AppState>,
) -> Result<Json<Vec<Assignee>>, ApiError> {
    let assignees = query_handlers::list_assignees_under_examination(state.store.as_ref()).await?;
    Ok(Json(assignees))
}

/// GET /{ameba_id}/offer-items
#[instrument(skip_all, fields(ameba_id = %ameba_id))]
async fn list_assignee_offer_item_pairs(
    State(state): State<AppState>,
    Path(ameba_id): Path<AmebaId>,
) -> Result<Json<Vec<AssigneeOfferItemPair>>, ApiError> {
    let pairs = query_handlers::list_assignee_offer_item_pairs(
        &ameba_id,
        state.catalog.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(pairs))
}

/// Routes nested under one campaign.
pub fn offer_item_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/invite", post(invite_offer))
        .route("/{id}/lottery-results", post(upload_lottery_results))
        .route("/{id}/finished-shipment", post(finished_shipment))
        .route("/{id}/payment-completed", post(payment_completed))
        .route("/{id}/assignees", get(list_assignees))
        .route("/{id}/assignee-counts", get(list_stage_assignee_counts))
        .route("/{id}/assignees/{ameba_id}", get(get_assignee))
        .route("/{id}/assignees/{ameba_id}/invitation", post(answer_invitation))
        .route("/{id}/assignees/{ameba_id}/decline", post(decline))
}

/// Routes keyed by blogger across campaigns.
pub fn blogger_router() -> Router<AppState> {
    Router::new()
        .route("/under-examination", get(list_assignees_under_examination))
        .route("/{ameba_id}/offer-items", get(list_assignee_offer_item_pairs))
}
