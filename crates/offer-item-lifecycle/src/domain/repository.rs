//! Repository traits and the unit of work that groups them.
//!
//! Each lifecycle operation opens one unit of work through a [`Store`],
//! performs all reads and writes on it, and commits. Dropping a unit of work
//! without committing rolls it back. Methods that read state later used in a
//! guard take a `with_lock` flag requesting a row lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use offer_item_core::list::ListCondition;

use super::assignee::{Assignee, AssigneeCount, Stage};
use super::examination::{EntryType, Examination};
use super::ids::{AmebaId, AssigneeId, DfItemId, ItemId, OfferItemId};
use super::offer_item::OfferItem;
use super::questionnaire::{QuestionAnswer, Questionnaire};

/// Filters for searching campaigns. Absent or blank filters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Case-insensitive substring of the campaign name.
    pub name_contains: Option<String>,
    /// Case-insensitive catalog item id.
    pub item_id: Option<ItemId>,
    /// Case-insensitive catalog DF item id.
    pub df_item_id: Option<DfItemId>,
}

/// A page of campaigns plus the total number matching the query.
#[derive(Debug, Clone)]
pub struct OfferItemPage {
    pub offer_items: Vec<OfferItem>,
    pub total_count: u64,
}

#[async_trait]
pub trait OfferItemRepository: Send {
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if no live campaign has `id`.
    async fn get_offer_item(
        &mut self,
        id: &OfferItemId,
        with_lock: bool,
    ) -> Result<OfferItem, DomainError>;

    /// Loads the live campaigns among `ids`, skipping unknown ones.
    async fn bulk_get_offer_items(
        &mut self,
        ids: &[OfferItemId],
        include_closed: bool,
    ) -> Result<Vec<OfferItem>, DomainError>;

    async fn list_offer_items(
        &mut self,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError>;

    async fn search_offer_items(
        &mut self,
        criteria: &SearchCriteria,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError>;

    /// Ids of campaigns whose invitation window closes within
    /// `[since, until]`.
    async fn list_offer_item_ids_by_end_date(
        &mut self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OfferItemId>, DomainError>;

    async fn create_offer_item(&mut self, offer_item: &OfferItem) -> Result<(), DomainError>;

    /// Persists every field and the full schedule set.
    async fn update_offer_item(&mut self, offer_item: &OfferItem) -> Result<(), DomainError>;

    /// Soft-deletes the campaign and hard-deletes everything it owns. A
    /// missing campaign is not an error.
    async fn delete_offer_item(&mut self, id: &OfferItemId) -> Result<(), DomainError>;
}

#[async_trait]
pub trait AssigneeRepository: Send {
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if the blogger is not assigned.
    async fn get_assignee(
        &mut self,
        offer_item_id: &OfferItemId,
        ameba_id: &AmebaId,
        with_lock: bool,
    ) -> Result<Assignee, DomainError>;

    /// Assignees of one campaign, optionally restricted to one stage.
    async fn list_assignees(
        &mut self,
        offer_item_id: &OfferItemId,
        stage: Option<Stage>,
        with_lock: bool,
    ) -> Result<Vec<Assignee>, DomainError>;

    /// Assignees of one campaign among the given bloggers, optionally
    /// restricted to one stage.
    async fn list_assignees_by_ameba_ids(
        &mut self,
        offer_item_id: &OfferItemId,
        ameba_ids: &[AmebaId],
        stage: Option<Stage>,
        with_lock: bool,
    ) -> Result<Vec<Assignee>, DomainError>;

    /// Assignees of every campaign awaiting a draft or article verdict.
    async fn list_assignees_under_examination(&mut self) -> Result<Vec<Assignee>, DomainError>;

    /// Every participation of one blogger.
    async fn list_assignees_for_blogger(
        &mut self,
        ameba_id: &AmebaId,
    ) -> Result<Vec<Assignee>, DomainError>;

    async fn count_assignees_by_stage(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<Vec<AssigneeCount>, DomainError>;

    async fn create_assignee(&mut self, assignee: &Assignee) -> Result<(), DomainError>;

    async fn update_assignee(&mut self, assignee: &Assignee) -> Result<(), DomainError>;

    async fn delete_assignee(&mut self, id: &AssigneeId) -> Result<(), DomainError>;
}

#[async_trait]
pub trait ExaminationRepository: Send {
    /// The most recent examination of one assignee and entry type, with its
    /// submission count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` if none was ever submitted.
    async fn get_latest_examination(
        &mut self,
        offer_item_id: &OfferItemId,
        assignee_id: &AssigneeId,
        entry_type: EntryType,
        with_lock: bool,
    ) -> Result<Examination, DomainError>;

    /// The most recent examination per assignee, keyed by blogger.
    async fn bulk_get_latest_examinations(
        &mut self,
        offer_item_id: &OfferItemId,
        entry_type: EntryType,
    ) -> Result<HashMap<AmebaId, Examination>, DomainError>;

    async fn create_examination(&mut self, examination: &Examination) -> Result<(), DomainError>;

    async fn update_examination(&mut self, examination: &Examination) -> Result<(), DomainError>;
}

#[async_trait]
pub trait QuestionnaireRepository: Send {
    async fn find_questionnaire(
        &mut self,
        offer_item_id: &OfferItemId,
        with_lock: bool,
    ) -> Result<Option<Questionnaire>, DomainError>;

    /// Replaces the stored questionnaire and its questions.
    async fn save_questionnaire(
        &mut self,
        questionnaire: &Questionnaire,
    ) -> Result<(), DomainError>;

    async fn delete_questionnaire(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait QuestionAnswerRepository: Send {
    async fn list_question_answers(
        &mut self,
        offer_item_id: &OfferItemId,
        assignee_ids: &[AssigneeId],
    ) -> Result<Vec<QuestionAnswer>, DomainError>;

    /// Inserts or replaces answers keyed by assignee and question.
    async fn save_question_answers(
        &mut self,
        answers: &[QuestionAnswer],
    ) -> Result<(), DomainError>;

    async fn delete_question_answers(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<(), DomainError>;
}

/// All repositories bound to one transaction.
#[async_trait]
pub trait UnitOfWork:
    OfferItemRepository
    + AssigneeRepository
    + ExaminationRepository
    + QuestionnaireRepository
    + QuestionAnswerRepository
    + Send
{
    /// Commits every write made through this unit of work.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}

/// Opens units of work at serializable isolation.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError>;
}
