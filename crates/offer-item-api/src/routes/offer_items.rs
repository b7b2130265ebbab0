//! Campaign endpoints: save, delete, complete and the campaign queries.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Json, Router, routing::get, routing::post};
use chrono::{DateTime, Utc};
use offer_item_core::list::{ListCondition, Sort};
use offer_item_lifecycle::application::offer_item_handlers::{
    handle_completed_offer_item, handle_delete_offer_item, handle_save_offer_item,
};
use offer_item_lifecycle::application::query_handlers::{self, AnswerSheet, OfferItemListView};
use offer_item_lifecycle::domain::commands::{
    AssigneeInput, CompletedOfferItem, DeleteOfferItem, DraftedItemInfoInput, QuestionnaireInput,
    SaveOfferItem, ScheduleInput,
};
use offer_item_lifecycle::domain::ids::{AmebaId, BannerId, DfItemId, ItemId, OfferItemId};
use offer_item_lifecycle::domain::offer_item::{
    MailToggles, OfferItem, OfferTexts, PostTarget, SpecialCommission, WorkflowFlags,
};
use offer_item_lifecycle::domain::questionnaire::Questionnaire;
use offer_item_lifecycle::domain::repository::SearchCriteria;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use super::StatusResponse;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;

/// Request body for POST /. Omitting `offer_item_id` creates a campaign.
#[derive(Debug, Deserialize)]
pub struct SaveOfferItemRequest {
    #[serde(default)]
    pub offer_item_id: Option<OfferItemId>,
    pub name: String,
    pub item_id: ItemId,
    #[serde(default)]
    pub df_item_id: Option<DfItemId>,
    #[serde(default)]
    pub has_coupon: bool,
    #[serde(default)]
    pub coupon_banner_id: Option<BannerId>,
    #[serde(default)]
    pub special_commission: SpecialCommission,
    #[serde(default)]
    pub flags: WorkflowFlags,
    #[serde(default)]
    pub post_target: PostTarget,
    pub texts: OfferTexts,
    #[serde(default)]
    pub mail: MailToggles,
    #[serde(default)]
    pub is_closed: bool,
    pub schedules: Vec<ScheduleInput>,
    #[serde(default)]
    pub assignees: Vec<AssigneeInput>,
    #[serde(default)]
    pub questionnaire: Option<QuestionnaireInput>,
    pub drafted_item_info: DraftedItemInfoInput,
}

impl SaveOfferItemRequest {
    fn into_command(self) -> SaveOfferItem {
        SaveOfferItem {
            correlation_id: Uuid::new_v4(),
            offer_item_id: self.offer_item_id,
            name: self.name,
            item_id: self.item_id,
            df_item_id: self.df_item_id,
            has_coupon: self.has_coupon,
            coupon_banner_id: self.coupon_banner_id,
            special_commission: self.special_commission,
            flags: self.flags,
            post_target: self.post_target,
            texts: self.texts,
            mail: self.mail,
            is_closed: self.is_closed,
            schedules: self.schedules,
            assignees: self.assignees,
            questionnaire: self.questionnaire,
            drafted_item_info: self.drafted_item_info,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveOfferItemResponse {
    pub offer_item_id: OfferItemId,
}

/// Paging query parameters shared by list and search.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

impl ListParams {
    fn condition(&self) -> Result<ListCondition, ApiError> {
        let sorts = self
            .sort
            .iter()
            .filter(|key| !key.is_empty())
            .map(|key| Sort {
                order_by: key.clone(),
                desc: self.desc,
            })
            .collect();
        Ok(ListCondition::new(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_LIMIT),
            sorts,
        )?)
    }
}

/// Query parameters for GET /search. Blank filters are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub item_id: Option<String>,
    pub df_item_id: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

impl SearchParams {
    fn criteria(&self) -> SearchCriteria {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
        SearchCriteria {
            name_contains: present(&self.name),
            item_id: present(&self.item_id).map(ItemId::new),
            df_item_id: present(&self.df_item_id).map(DfItemId::new),
        }
    }

    fn paging(&self) -> ListParams {
        ListParams {
            offset: self.offset,
            limit: self.limit,
            sort: self.sort.clone(),
            desc: self.desc,
        }
    }
}

/// Query parameters for GET /ending. Both bounds are inclusive RFC 3339
/// timestamps.
#[derive(Debug, Deserialize)]
pub struct EndingParams {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OfferItemIdsResponse {
    pub offer_item_ids: Vec<OfferItemId>,
}

/// Request body naming a set of bloggers.
#[derive(Debug, Deserialize)]
pub struct AmebaIdsRequest {
    pub ameba_ids: Vec<AmebaId>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    /// Number of assignees moved to `done`.
    pub finished: usize,
}

/// POST /
#[instrument(skip_all, fields(offer_item_id = ?request.offer_item_id))]
async fn save_offer_item(
    State(state): State<AppState>,
    Json(request): Json<SaveOfferItemRequest>,
) -> Result<Json<SaveOfferItemResponse>, ApiError> {
    let command = request.into_command();

    info!(correlation_id = %command.correlation_id, "handling save_offer_item command");

    let offer_item_id =
        handle_save_offer_item(&command, state.save_context(), state.store.as_ref()).await?;

    Ok(Json(SaveOfferItemResponse { offer_item_id }))
}

/// GET /
#[instrument(skip_all)]
async fn list_offer_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<OfferItemListView>, ApiError> {
    let view = query_handlers::list_offer_items(
        &params.condition()?,
        state.catalog.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// GET /search
#[instrument(skip_all)]
async fn search_offer_items(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<OfferItemListView>, ApiError> {
    let view = query_handlers::search_offer_items(
        &params.criteria(),
        &params.paging().condition()?,
        state.catalog.as_ref(),
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// GET /ending
#[instrument(skip_all, fields(since = %params.since, until = %params.until))]
async fn list_ending_offer_items(
    State(state): State<AppState>,
    Query(params): Query<EndingParams>,
) -> Result<Json<OfferItemIdsResponse>, ApiError> {
    let offer_item_ids = query_handlers::list_offer_item_ids_by_end_date(
        params.since,
        params.until,
        state.store.as_ref(),
    )
    .await?;
    Ok(Json(OfferItemIdsResponse { offer_item_ids }))
}

/// GET /{id}
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn get_offer_item(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<OfferItem>, ApiError> {
    let offer_item =
        query_handlers::get_offer_item(&id, state.catalog.as_ref(), state.store.as_ref()).await?;
    Ok(Json(offer_item))
}

/// DELETE /{id}
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn delete_offer_item(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<StatusResponse>, ApiError> {
    let command = DeleteOfferItem {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling delete_offer_item command");

    handle_delete_offer_item(&command, state.store.as_ref()).await?;
    Ok(Json(StatusResponse::ok()))
}

/// POST /{id}/complete
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn complete_offer_item(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let command = CompletedOfferItem {
        correlation_id: Uuid::new_v4(),
        offer_item_id: id,
    };

    info!(correlation_id = %command.correlation_id, "handling completed_offer_item command");

    let finished = handle_completed_offer_item(&command, state.store.as_ref()).await?;
    Ok(Json(CompleteResponse { finished }))
}

/// GET /{id}/questionnaire
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn get_questionnaire(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
) -> Result<Json<Questionnaire>, ApiError> {
    let questionnaire = query_handlers::get_questionnaire(&id, state.store.as_ref()).await?;
    Ok(Json(questionnaire))
}

/// POST /{id}/question-answers
#[instrument(skip_all, fields(offer_item_id = %id))]
async fn bulk_get_question_answers(
    State(state): State<AppState>,
    Path(id): Path<OfferItemId>,
    Json(request): Json<AmebaIdsRequest>,
) -> Result<Json<HashMap<AmebaId, AnswerSheet>>, ApiError> {
    let answers =
        query_handlers::bulk_get_question_answers(&id, &request.ameba_ids, state.store.as_ref())
            .await?;
    Ok(Json(answers))
}

/// Returns the campaign router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(save_offer_item).get(list_offer_items))
        .route("/search", get(search_offer_items))
        .route("/ending", get(list_ending_offer_items))
        .route("/{id}", get(get_offer_item).delete(delete_offer_item))
        .route("/{id}/complete", post(complete_offer_item))
        .route("/{id}/questionnaire", get(get_questionnaire))
        .route("/{id}/question-answers", post(bulk_get_question_answers))
}
