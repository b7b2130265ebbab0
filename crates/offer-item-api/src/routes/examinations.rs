//! Submission and examination endpoints.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get, routing::post};
use offer_item_lifecycle::application::assignee_handlers::TransitionReport;
use offer_item_lifecycle::application::examination_handlers::{
    handle_submission, handle_upload_examination_results,
};
use offer_item_lifecycle::application::query_handlers;
use offer_item_lifecycle::domain::commands::{Submission, UploadExaminationResults};
use offer_item_lifecycle::domain::examination::{EntryType, Examination, ExaminationVerdict};
use offer_item_lifecycle::domain::ids::{AmebaId, AssigneeId, EntryId, OfferItemId};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{id}/assignees/{ameba_id}/submission.
#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub entry_type: EntryType,
    #[serde(default)]
    pub entry_id: Option<EntryId>,
}

/// Request body for POST /{id}/examination-results.
#[derive(Debug, Deserialize)]
pub struct ExaminationResultsRequest {
    pub entry_type: EntryType,
    pub verdicts: HashMap<AmebaId, ExaminationVerdict>,
}

/// Query parameters selecting the entry type.
#[derive(Debug, Deserialize)]
pub struct EntryTypeParams {
    pub entry_type: EntryType,
}

/// POST /{id}/assignees/{ameba_id}/submission
#[instrument(skip_all, fields(offer_item_id = %id, ameba_id = %ameba_id))]
async fn submit(
    State(state): State<AppState>,
    Path((id, ameba_id)): Path<(OfferItemId, AmebaId)>,
    Json(request): Json<SubmissionRequest>,
) -> Result<Json<Examination>, ApiError> {
    let command = Submission {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
        ameba_id,
        entry_type: request.entry_type,
        entry_id: request.entry_id,
    };

    info!(correlation_id = %command.correlation_id, "handling submission command");

    let examination = handle_submission(
        &command,
        state.clock.as_ref(),
        state.ids.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(examination))
}

/// POST /{id}/examination-results
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn upload_examination_results(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
    Json(request): Json<ExaminationResultsRequest>,
) -> Result<Json<TransitionReport>, ApiError> {
    let command = UploadExaminationResults {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
        entry_type: request.entry_type,
        verdicts: request.verdicts,
    };

    info!(
        correlation_id = %command.correlation_id,
        "handling upload_examination_results command"
    );

    let report = handle_upload_examination_results(&command, state.store.as_ref()).await?;
    Ok(Json(report))
}

/// GET /{id}/examinations
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn bulk_get_examinations(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
    Query(params): Query<EntryTypeParams>,
) -> Result<Json<HashMap<AmebaId, Examination>>, ApiError> {
    let examinations =
        query_handlers::bulk_get_examinations(&id, params.entry_type, state.store.as_ref())
            .await?;
    Ok(Json(examinations))
}

/// GET /{id}/examinations/{assignee_id}
#[instrument(skip_all, fields(offer_item_id = %id, assignee_id = %assignee_id))]
async fn get_examination(
    State(state): State<AppState>,
    Path((id, assignee_id)): Path<(OfferItemId, AssigneeId)>,
    Query(params): Query<EntryTypeParams>,
) -> Result<Json<Examination>, ApiError> {
    let examination = query_handlers::get_examination(
        &id,
        &assignee_id,
        params.entry_type,
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(examination))
}

/// Returns the examination router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/assignees/{ameba_id}/submission", post(submit))
        .route("/{id}/examination-results", post(upload_examination_results))
        .route("/{id}/examinations", get(bulk_get_examinations))
        .route("/{id}/examinations/{assignee_id}", get(get_examination))
}
