//! Query handlers for campaigns, assignees, questionnaires and
//! examinations.
//!
//! Every query opens a unit of work, performs its reads and commits. Campaign
//! views are enriched with fresh catalog data where the catalog has it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use offer_item_core::list::{ListCondition, ListResult};
use serde::Serialize;

use crate::domain::assignee::{Assignee, AssigneeCount, Stage};
use crate::domain::catalog::{CatalogAdapter, CatalogItems};
use crate::domain::examination::{EntryType, Examination};
use crate::domain::ids::{AmebaId, AssigneeId, OfferItemId, QuestionId};
use crate::domain::item::ItemIdentifier;
use crate::domain::offer_item::OfferItem;
use crate::domain::questionnaire::{QuestionAnswer, Questionnaire};
use crate::domain::repository::{
    AssigneeRepository, ExaminationRepository, OfferItemPage, OfferItemRepository,
    QuestionAnswerRepository, QuestionnaireRepository, SearchCriteria, Store,
};

/// Attributes campaign lists may be ordered by.
pub const OFFER_ITEM_SORT_KEYS: [&str; 3] = ["created_at", "name", "id"];

/// A page of campaigns.
#[derive(Debug, Serialize)]
pub struct OfferItemListView {
    pub offer_items: Vec<OfferItem>,
    pub list_result: ListResult,
}

/// One participation of a blogger together with its campaign.
#[derive(Debug, Serialize)]
pub struct AssigneeOfferItemPair {
    pub assignee: Assignee,
    pub offer_item: OfferItem,
}

/// Answers of one assignee keyed by question.
pub type AnswerSheet = HashMap<QuestionId, QuestionAnswer>;

/// Replaces the catalog snapshots of `offer_items` with what the catalog
/// currently returns. Products the catalog does not return keep their
/// stored snapshot.
async fn enrich(
    offer_items: &mut [OfferItem],
    catalog: &dyn CatalogAdapter,
) -> Result<(), DomainError> {
    if offer_items.is_empty() {
        return Ok(());
    }
    let mut seen = HashSet::new();
    let identifiers: Vec<ItemIdentifier> = offer_items
        .iter()
        .map(OfferItem::item_identifier)
        .filter(|identifier| seen.insert(identifier.clone()))
        .collect();
    let found = catalog.bulk_get_items(&identifiers).await?;
    for offer_item in offer_items.iter_mut() {
        apply_catalog(offer_item, &found)?;
    }
    Ok(())
}

fn apply_catalog(offer_item: &mut OfferItem, found: &CatalogItems) -> Result<(), DomainError> {
    if let Some(item) = found.items.get(&offer_item.item().id) {
        offer_item.set_item(item.clone())?;
    }
    let df_item = offer_item
        .df_item()
        .and_then(|df| found.df_items.get(&df.id))
        .cloned();
    if df_item.is_some() {
        offer_item.set_df_item(df_item);
    }
    Ok(())
}

fn check_sort_keys(condition: &ListCondition) -> Result<(), DomainError> {
    match condition
        .sorts()
        .iter()
        .find(|sort| !OFFER_ITEM_SORT_KEYS.contains(&sort.order_by.as_str()))
    {
        Some(sort) => Err(DomainError::validation(format!(
            "cannot sort offer items by {}",
            sort.order_by
        ))),
        None => Ok(()),
    }
}

async fn page_view(
    page: OfferItemPage,
    catalog: &dyn CatalogAdapter,
) -> Result<OfferItemListView, DomainError> {
    let mut offer_items = page.offer_items;
    enrich(&mut offer_items, catalog).await?;
    Ok(OfferItemListView {
        list_result: ListResult {
            count: offer_items.len() as u64,
            total_count: page.total_count,
        },
        offer_items,
    })
}

/// Loads one campaign with catalog enrichment.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the campaign does not exist or was
/// deleted.
pub async fn get_offer_item(
    offer_item_id: &OfferItemId,
    catalog: &dyn CatalogAdapter,
    store: &dyn Store,
) -> Result<OfferItem, DomainError> {
    let mut uow = store.begin().await?;
    let offer_item = uow.get_offer_item(offer_item_id, false).await?;
    uow.commit().await?;

    let mut offer_items = [offer_item];
    enrich(&mut offer_items, catalog).await?;
    let [offer_item] = offer_items;
    Ok(offer_item)
}

/// Lists campaigns, closed ones included.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unsupported sort key.
pub async fn list_offer_items(
    condition: &ListCondition,
    catalog: &dyn CatalogAdapter,
    store: &dyn Store,
) -> Result<OfferItemListView, DomainError> {
    check_sort_keys(condition)?;
    let mut uow = store.begin().await?;
    let page = uow.list_offer_items(condition).await?;
    uow.commit().await?;
    page_view(page, catalog).await
}

/// Searches campaigns by name and catalog ids.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an unsupported sort key.
pub async fn search_offer_items(
    criteria: &SearchCriteria,
    condition: &ListCondition,
    catalog: &dyn CatalogAdapter,
    store: &dyn Store,
) -> Result<OfferItemListView, DomainError> {
    check_sort_keys(condition)?;
    let mut uow = store.begin().await?;
    let page = uow.search_offer_items(criteria, condition).await?;
    uow.commit().await?;
    page_view(page, catalog).await
}

/// Ids of campaigns whose invitation window ends within `[since, until]`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `since` is after `until`.
pub async fn list_offer_item_ids_by_end_date(
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    store: &dyn Store,
) -> Result<Vec<OfferItemId>, DomainError> {
    if since > until {
        return Err(DomainError::validation("since must not be after until"));
    }
    let mut uow = store.begin().await?;
    let ids = uow.list_offer_item_ids_by_end_date(since, until).await?;
    uow.commit().await?;
    Ok(ids)
}

/// # Errors
///
/// Returns `DomainError::NotFound` when the campaign has no questionnaire.
pub async fn get_questionnaire(
    offer_item_id: &OfferItemId,
    store: &dyn Store,
) -> Result<Questionnaire, DomainError> {
    let mut uow = store.begin().await?;
    let questionnaire = uow.find_questionnaire(offer_item_id, false).await?;
    uow.commit().await?;
    questionnaire.ok_or_else(|| {
        DomainError::not_found(format!("questionnaire of offer item {offer_item_id}"))
    })
}

/// Answer sheets of the given bloggers. Bloggers that are not assigned are
/// skipped.
///
/// # Errors
///
/// Propagates store failures.
pub async fn bulk_get_question_answers(
    offer_item_id: &OfferItemId,
    ameba_ids: &[AmebaId],
    store: &dyn Store,
) -> Result<HashMap<AmebaId, AnswerSheet>, DomainError> {
    let mut uow = store.begin().await?;
    let assignees = uow
        .list_assignees_by_ameba_ids(offer_item_id, ameba_ids, None, false)
        .await?;
    let assignee_ids: Vec<AssigneeId> = assignees.iter().map(|a| a.id().clone()).collect();
    let answers = uow
        .list_question_answers(offer_item_id, &assignee_ids)
        .await?;
    uow.commit().await?;

    let bloggers: HashMap<&AssigneeId, &AmebaId> =
        assignees.iter().map(|a| (a.id(), a.ameba_id())).collect();
    let mut sheets: HashMap<AmebaId, AnswerSheet> = assignees
        .iter()
        .map(|a| (a.ameba_id().clone(), AnswerSheet::new()))
        .collect();
    for answer in answers {
        let Some(&ameba_id) = bloggers.get(&answer.assignee_id) else {
            continue;
        };
        if let Some(sheet) = sheets.get_mut(ameba_id) {
            sheet.insert(answer.question_id.clone(), answer);
        }
    }
    Ok(sheets)
}

/// Every open campaign a blogger participates in.
///
/// # Errors
///
/// Propagates store and catalog failures.
pub async fn list_assignee_offer_item_pairs(
    ameba_id: &AmebaId,
    catalog: &dyn CatalogAdapter,
    store: &dyn Store,
) -> Result<Vec<AssigneeOfferItemPair>, DomainError> {
    let mut uow = store.begin().await?;
    let assignees = uow.list_assignees_for_blogger(ameba_id).await?;
    let offer_item_ids: Vec<OfferItemId> = assignees
        .iter()
        .map(|a| a.offer_item_id().clone())
        .collect();
    let mut offer_items = uow.bulk_get_offer_items(&offer_item_ids, false).await?;
    uow.commit().await?;

    enrich(&mut offer_items, catalog).await?;
    let mut by_id: HashMap<OfferItemId, OfferItem> = offer_items
        .into_iter()
        .map(|offer_item| (offer_item.id().clone(), offer_item))
        .collect();
    Ok(assignees
        .into_iter()
        .filter_map(|assignee| {
            let offer_item = by_id.remove(assignee.offer_item_id())?;
            Some(AssigneeOfferItemPair {
                assignee,
                offer_item,
            })
        })
        .collect())
}

/// # Errors
///
/// Returns `DomainError::NotFound` if the blogger is not assigned.
pub async fn get_assignee(
    offer_item_id: &OfferItemId,
    ameba_id: &AmebaId,
    store: &dyn Store,
) -> Result<Assignee, DomainError> {
    let mut uow = store.begin().await?;
    let assignee = uow.get_assignee(offer_item_id, ameba_id, false).await?;
    uow.commit().await?;
    Ok(assignee)
}

/// # Errors
///
/// Propagates store failures.
pub async fn list_assignees(
    offer_item_id: &OfferItemId,
    stage: Option<Stage>,
    store: &dyn Store,
) -> Result<Vec<Assignee>, DomainError> {
    let mut uow = store.begin().await?;
    let assignees = uow.list_assignees(offer_item_id, stage, false).await?;
    uow.commit().await?;
    Ok(assignees)
}

/// Assignees of every campaign awaiting a verdict.
///
/// # Errors
///
/// Propagates store failures.
pub async fn list_assignees_under_examination(
    store: &dyn Store,
) -> Result<Vec<Assignee>, DomainError> {
    let mut uow = store.begin().await?;
    let assignees = uow.list_assignees_under_examination().await?;
    uow.commit().await?;
    Ok(assignees)
}

/// Number of assignees per stage, in stage order. Empty stages are omitted.
///
/// # Errors
///
/// Propagates store failures.
pub async fn list_stage_assignee_counts(
    offer_item_id: &OfferItemId,
    store: &dyn Store,
) -> Result<Vec<AssigneeCount>, DomainError> {
    let mut uow = store.begin().await?;
    let mut counts = uow.count_assignees_by_stage(offer_item_id).await?;
    uow.commit().await?;
    counts.sort_by_key(|count| count.stage);
    Ok(counts)
}

/// # Errors
///
/// Propagates store failures.
pub async fn bulk_get_examinations(
    offer_item_id: &OfferItemId,
    entry_type: EntryType,
    store: &dyn Store,
) -> Result<HashMap<AmebaId, Examination>, DomainError> {
    let mut uow = store.begin().await?;
    let examinations = uow
        .bulk_get_latest_examinations(offer_item_id, entry_type)
        .await?;
    uow.commit().await?;
    Ok(examinations)
}

/// # Errors
///
/// Returns `DomainError::NotFound` when nothing was ever submitted.
pub async fn get_examination(
    offer_item_id: &OfferItemId,
    assignee_id: &AssigneeId,
    entry_type: EntryType,
    store: &dyn Store,
) -> Result<Examination, DomainError> {
    let mut uow = store.begin().await?;
    let examination = uow
        .get_latest_examination(offer_item_id, assignee_id, entry_type, false)
        .await?;
    uow.commit().await?;
    Ok(examination)
}
