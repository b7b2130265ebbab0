//! Command handlers that create, update, close and delete campaigns.
//!
//! Every handler opens exactly one unit of work and commits it only after
//! every step succeeded; returning early drops the unit of work, which rolls
//! it back.

use std::collections::{HashMap, HashSet};

use offer_item_core::clock::Clock;
use offer_item_core::error::DomainError;
use offer_item_core::id::IdGenerator;
use tracing::{debug, info};

use crate::domain::assignee::{Assignee, Stage, StageOverride};
use crate::domain::catalog::CatalogAdapter;
use crate::domain::commands::{
    AssigneeInput, CompletedOfferItem, DeleteOfferItem, SaveOfferItem, ScheduleInput,
};
use crate::domain::examination::EntryType;
use crate::domain::ids::{AmebaId, AssigneeId, OfferItemId, ScheduleId};
use crate::domain::item::{DfItem, DraftedItemInfo, Item, ItemIdentifier};
use crate::domain::offer_item::{NewOfferItem, OfferItem};
use crate::domain::questionnaire::Questionnaire;
use crate::domain::repository::{
    AssigneeRepository, ExaminationRepository, OfferItemRepository, QuestionAnswerRepository,
    QuestionnaireRepository, Store, UnitOfWork,
};
use crate::domain::schedule::Schedule;

/// Limits applied to save requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSettings {
    /// Maximum number of assignees one save request may carry.
    pub max_input_assignee_list_num: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_input_assignee_list_num: 1000,
        }
    }
}

/// Collaborators the save handler needs besides the store.
#[derive(Clone, Copy)]
pub struct SaveContext<'a> {
    pub settings: &'a ValidationSettings,
    pub clock: &'a dyn Clock,
    pub ids: &'a dyn IdGenerator,
    pub catalog: &'a dyn CatalogAdapter,
}

/// Handles `SaveOfferItem`: creates a campaign when no id is given,
/// otherwise reconciles the existing one with the request.
///
/// This is a CREATION command when `offer_item_id` is `None`; the handler
/// generates the id.
///
/// # Errors
///
/// Returns `DomainError::Validation` for any violated invariant,
/// `DomainError::NotFound` for unknown campaigns, schedules, questions or
/// missing examinations, and propagates store and catalog failures.
pub async fn handle_save_offer_item(
    command: &SaveOfferItem,
    ctx: SaveContext<'_>,
    store: &dyn Store,
) -> Result<OfferItemId, DomainError> {
    if command.item_id.is_empty() {
        return Err(DomainError::validation("item id is required"));
    }
    if command.assignees.len() > ctx.settings.max_input_assignee_list_num {
        return Err(DomainError::validation(format!(
            "at most {} assignees may be saved at once, got {}",
            ctx.settings.max_input_assignee_list_num,
            command.assignees.len()
        )));
    }
    validate_assignee_inputs(&command.assignees)?;

    let input = &command.drafted_item_info;
    let drafted_item_info = DraftedItemInfo::new(
        input.name.clone(),
        input.content_name.clone(),
        input.image_url.clone(),
        input.url.clone(),
        input.min_commission,
        input.max_commission,
    )?;

    let identifier = ItemIdentifier {
        item_id: command.item_id.clone(),
        df_item_id: command.df_item_id.clone().filter(|id| !id.is_empty()),
    };
    let (item, df_item) = ctx.catalog.get_items(&identifier).await?;

    let mut uow = store.begin().await?;
    let offer_item_id = match &command.offer_item_id {
        None => {
            create_offer_item(uow.as_mut(), command, item, df_item, drafted_item_info, ctx).await?
        }
        Some(id) => {
            update_offer_item(
                uow.as_mut(),
                id,
                command,
                item,
                df_item,
                drafted_item_info,
                ctx,
            )
            .await?;
            id.clone()
        }
    };
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %offer_item_id,
        assignees = command.assignees.len(),
        "offer item saved"
    );
    Ok(offer_item_id)
}

fn validate_assignee_inputs(inputs: &[AssigneeInput]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(inputs.len());
    for input in inputs {
        if input.ameba_id.is_empty() {
            return Err(DomainError::validation("assignee ameba id is required"));
        }
        if !seen.insert(&input.ameba_id) {
            return Err(DomainError::validation(format!(
                "assignee {} is listed more than once",
                input.ameba_id
            )));
        }
    }
    Ok(())
}

fn reject_examination_stage(input: &AssigneeInput) -> Result<(), DomainError> {
    if matches!(input.stage, Stage::PreExamination | Stage::Examination) {
        return Err(DomainError::validation(format!(
            "new assignee {} must not start in {}",
            input.ameba_id, input.stage
        )));
    }
    Ok(())
}

async fn create_offer_item(
    uow: &mut dyn UnitOfWork,
    command: &SaveOfferItem,
    item: Item,
    df_item: Option<DfItem>,
    drafted_item_info: DraftedItemInfo,
    ctx: SaveContext<'_>,
) -> Result<OfferItemId, DomainError> {
    let offer_item_id = OfferItemId::new(ctx.ids.generate());
    let now = ctx.clock.now();

    let schedules = command
        .schedules
        .iter()
        .map(|s| new_schedule(s, ctx.ids))
        .collect::<Result<Vec<_>, _>>()?;

    let offer_item = OfferItem::create(
        offer_item_id.clone(),
        NewOfferItem {
            name: command.name.clone(),
            item,
            df_item,
            has_coupon: command.has_coupon,
            coupon_banner_id: command.coupon_banner_id.clone(),
            special_commission: command.special_commission,
            flags: command.flags,
            post_target: command.post_target,
            texts: command.texts.clone(),
            mail: command.mail,
            is_closed: command.is_closed,
            schedules,
            drafted_item_info,
        },
        now,
    )?;
    uow.create_offer_item(&offer_item).await?;

    if let Some(input) = &command.questionnaire {
        let questionnaire = Questionnaire::from_inputs(
            offer_item_id.clone(),
            input.description.clone(),
            input.questions.clone(),
            ctx.ids,
        )?;
        uow.save_questionnaire(&questionnaire).await?;
    }

    for input in command.assignees.iter().filter(|a| !a.is_deleted) {
        reject_examination_stage(input)?;
        let assignee = Assignee::new(
            AssigneeId::new(ctx.ids.generate()),
            offer_item_id.clone(),
            input.ameba_id.clone(),
            input.writing_fee,
            input.stage,
            now,
        )?;
        uow.create_assignee(&assignee).await?;
    }

    Ok(offer_item_id)
}

fn new_schedule(input: &ScheduleInput, ids: &dyn IdGenerator) -> Result<Schedule, DomainError> {
    Schedule::new(
        ScheduleId::new(ids.generate()),
        input.schedule_type,
        input.start_date,
        input.end_date,
    )
}

/// Re-dates the stored schedules the inputs name. Every input must carry
/// the id of a schedule the campaign already has.
fn reconcile_schedules(
    existing: &[Schedule],
    inputs: &[ScheduleInput],
) -> Result<Vec<Schedule>, DomainError> {
    let mut schedules = Vec::with_capacity(inputs.len());
    for input in inputs {
        let id = input
            .id
            .as_ref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DomainError::validation("schedule id is required"))?;
        let mut schedule = existing
            .iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| DomainError::not_found(format!("schedule {id}")))?
            .clone();
        schedule.set_date(input.start_date, input.end_date)?;
        schedules.push(schedule);
    }
    Ok(schedules)
}

async fn update_offer_item(
    uow: &mut dyn UnitOfWork,
    offer_item_id: &OfferItemId,
    command: &SaveOfferItem,
    item: Item,
    df_item: Option<DfItem>,
    drafted_item_info: DraftedItemInfo,
    ctx: SaveContext<'_>,
) -> Result<(), DomainError> {
    if command
        .schedules
        .iter()
        .any(|s| s.id.as_ref().is_none_or(ScheduleId::is_empty))
    {
        return Err(DomainError::validation("schedule id is required"));
    }
    let mut offer_item = uow.get_offer_item(offer_item_id, true).await?;

    offer_item.set_item(item)?;
    offer_item.set_df_item(df_item);
    offer_item.set_name(command.name.clone())?;
    offer_item.set_special_commission(command.special_commission)?;
    offer_item.set_flags(command.flags);
    offer_item.set_post_target(command.post_target);
    offer_item.set_coupon(command.has_coupon, command.coupon_banner_id.clone())?;
    offer_item.set_texts(command.texts.clone())?;
    offer_item.set_mail_toggles(command.mail);
    offer_item.set_is_closed(command.is_closed);
    let schedules = reconcile_schedules(offer_item.schedules(), &command.schedules)?;
    offer_item.set_schedules(schedules)?;
    offer_item.set_drafted_item_info(drafted_item_info);
    uow.update_offer_item(&offer_item).await?;

    match &command.questionnaire {
        Some(input) => {
            let questionnaire = match uow.find_questionnaire(offer_item_id, true).await? {
                Some(mut questionnaire) => {
                    questionnaire.reconcile(
                        input.description.clone(),
                        input.questions.clone(),
                        ctx.ids,
                    )?;
                    questionnaire
                }
                None => Questionnaire::from_inputs(
                    offer_item_id.clone(),
                    input.description.clone(),
                    input.questions.clone(),
                    ctx.ids,
                )?,
            };
            uow.save_questionnaire(&questionnaire).await?;
        }
        None => {
            uow.delete_question_answers(offer_item_id).await?;
            uow.delete_questionnaire(offer_item_id).await?;
        }
    }

    reconcile_assignees(uow, offer_item_id, &command.assignees, ctx).await
}

async fn reconcile_assignees(
    uow: &mut dyn UnitOfWork,
    offer_item_id: &OfferItemId,
    inputs: &[AssigneeInput],
    ctx: SaveContext<'_>,
) -> Result<(), DomainError> {
    let ameba_ids: Vec<AmebaId> = inputs.iter().map(|a| a.ameba_id.clone()).collect();
    let mut existing: HashMap<AmebaId, Assignee> = uow
        .list_assignees_by_ameba_ids(offer_item_id, &ameba_ids, None, true)
        .await?
        .into_iter()
        .map(|a| (a.ameba_id().clone(), a))
        .collect();

    for input in inputs {
        let Some(mut assignee) = existing.remove(&input.ameba_id) else {
            if input.is_deleted {
                continue;
            }
            reject_examination_stage(input)?;
            let assignee = Assignee::new(
                AssigneeId::new(ctx.ids.generate()),
                offer_item_id.clone(),
                input.ameba_id.clone(),
                input.writing_fee,
                input.stage,
                ctx.clock.now(),
            )?;
            uow.create_assignee(&assignee).await?;
            debug!(ameba_id = %input.ameba_id, stage = %input.stage, "assignee created");
            continue;
        };

        if input.is_deleted {
            if assignee.stage() != Stage::BeforeInvitation {
                return Err(DomainError::validation(format!(
                    "assignee {} can only be deleted before invitation, stage is {}",
                    input.ameba_id,
                    assignee.stage()
                )));
            }
            uow.delete_assignee(assignee.id()).await?;
            debug!(ameba_id = %input.ameba_id, "assignee deleted");
            continue;
        }

        let required_entry = match input.stage {
            Stage::PreExamination => Some(EntryType::Draft),
            Stage::Examination => Some(EntryType::Entry),
            _ => None,
        };
        if let Some(entry_type) = required_entry {
            uow.get_latest_examination(offer_item_id, assignee.id(), entry_type, false)
                .await
                .map_err(|err| match err {
                    DomainError::NotFound(_) => DomainError::not_found(format!(
                        "{entry_type} examination of assignee {} required for stage {}",
                        input.ameba_id, input.stage
                    )),
                    other => other,
                })?;
        }

        assignee.set_writing_fee(input.writing_fee)?;
        assignee.override_stage(input.stage);
        uow.update_assignee(&assignee).await?;
        debug!(ameba_id = %input.ameba_id, stage = %input.stage, "assignee updated");
    }
    Ok(())
}

/// Handles `DeleteOfferItem`. Deleting a missing campaign succeeds.
///
/// # Errors
///
/// Propagates store failures.
pub async fn handle_delete_offer_item(
    command: &DeleteOfferItem,
    store: &dyn Store,
) -> Result<(), DomainError> {
    let mut uow = store.begin().await?;
    uow.delete_offer_item(&command.offer_item_id).await?;
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        "offer item deleted"
    );
    Ok(())
}

/// Handles `CompletedOfferItem`: finishes every assignee and closes the
/// campaign.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the campaign does not exist and
/// propagates store failures.
pub async fn handle_completed_offer_item(
    command: &CompletedOfferItem,
    store: &dyn Store,
) -> Result<usize, DomainError> {
    let mut uow = store.begin().await?;
    let mut offer_item = uow.get_offer_item(&command.offer_item_id, true).await?;

    let assignees = uow
        .list_assignees(&command.offer_item_id, None, true)
        .await?;
    for mut assignee in assignees.iter().cloned() {
        assignee.set_stage_done();
        uow.update_assignee(&assignee).await?;
    }

    offer_item.set_is_closed(true);
    uow.update_offer_item(&offer_item).await?;
    uow.commit().await?;

    info!(
        correlation_id = %command.correlation_id,
        offer_item_id = %command.offer_item_id,
        finished = assignees.len(),
        "offer item completed"
    );
    Ok(assignees.len())
}
