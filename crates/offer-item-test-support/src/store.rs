//! Test stores: in-memory `Store` implementations.
//!
//! [`InMemoryStore`] gives every unit of work a private copy of the state
//! and publishes it on commit, so a failed operation leaves nothing behind.
//! Row locks are not modelled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use offer_item_core::list::ListCondition;
use offer_item_lifecycle::domain::assignee::{Assignee, AssigneeCount, Stage};
use offer_item_lifecycle::domain::examination::{EntryType, Examination, ExaminationRecord};
use offer_item_lifecycle::domain::ids::{AmebaId, AssigneeId, OfferItemId};
use offer_item_lifecycle::domain::offer_item::OfferItem;
use offer_item_lifecycle::domain::questionnaire::{QuestionAnswer, Questionnaire};
use offer_item_lifecycle::domain::repository::{
    AssigneeRepository, ExaminationRepository, OfferItemPage, OfferItemRepository,
    QuestionAnswerRepository, QuestionnaireRepository, SearchCriteria, Store, UnitOfWork,
};
use offer_item_lifecycle::domain::schedule::ScheduleType;

#[derive(Debug, Clone, Default)]
struct State {
    offer_items: Vec<OfferItem>,
    assignees: Vec<Assignee>,
    examinations: Vec<Examination>,
    questionnaires: HashMap<OfferItemId, Questionnaire>,
    answers: Vec<QuestionAnswer>,
}

/// A store holding everything in memory.
///
/// Each unit of work works on a snapshot taken at `begin` and replaces the
/// shared state on `commit`. Units of work that overlap are not isolated:
/// the last commit wins and the other side's writes are lost.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    commits: Arc<Mutex<usize>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a campaign without going through a unit of work.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_offer_item(&self, offer_item: OfferItem) {
        self.state.lock().unwrap().offer_items.push(offer_item);
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_assignee(&self, assignee: Assignee) {
        self.state.lock().unwrap().assignees.push(assignee);
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_examination(&self, examination: Examination) {
        self.state.lock().unwrap().examinations.push(examination);
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_questionnaire(&self, questionnaire: Questionnaire) {
        self.state
            .lock()
            .unwrap()
            .questionnaires
            .insert(questionnaire.offer_item_id().clone(), questionnaire);
    }

    /// Committed campaigns in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn offer_items(&self) -> Vec<OfferItem> {
        self.state.lock().unwrap().offer_items.clone()
    }

    /// Committed assignees in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn assignees(&self) -> Vec<Assignee> {
        self.state.lock().unwrap().assignees.clone()
    }

    /// Committed assignee of one blogger, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn assignee(&self, offer_item_id: &OfferItemId, ameba_id: &AmebaId) -> Option<Assignee> {
        self.state
            .lock()
            .unwrap()
            .assignees
            .iter()
            .find(|a| a.offer_item_id() == offer_item_id && a.ameba_id() == ameba_id)
            .cloned()
    }

    /// Committed examination rows in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn examinations(&self) -> Vec<Examination> {
        self.state.lock().unwrap().examinations.clone()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn questionnaire(&self, offer_item_id: &OfferItemId) -> Option<Questionnaire> {
        self.state
            .lock()
            .unwrap()
            .questionnaires
            .get(offer_item_id)
            .cloned()
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn question_answers(&self) -> Vec<QuestionAnswer> {
        self.state.lock().unwrap().answers.clone()
    }

    /// Number of units of work committed so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn commits(&self) -> usize {
        *self.commits.lock().unwrap()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        let working = self.state.lock().unwrap().clone();
        Ok(Box::new(InMemoryUnitOfWork {
            shared: Arc::clone(&self.state),
            commits: Arc::clone(&self.commits),
            working,
        }))
    }
}

struct InMemoryUnitOfWork {
    shared: Arc<Mutex<State>>,
    commits: Arc<Mutex<usize>>,
    working: State,
}

fn with_submission_count(examination: &Examination, count: u32) -> Examination {
    Examination::restore(ExaminationRecord {
        id: examination.id().clone(),
        offer_item_id: examination.offer_item_id().clone(),
        assignee_id: examination.assignee_id().clone(),
        ameba_id: examination.ameba_id().clone(),
        entry_type: examination.entry_type(),
        entry_id: examination.entry_id().cloned(),
        is_passed: examination.is_passed(),
        examiner_name: examination.examiner_name().map(str::to_owned),
        reason: examination.reason().map(str::to_owned),
        created_at: examination.created_at(),
        entry_submission_count: count,
    })
}

impl State {
    fn latest_examination(
        &self,
        offer_item_id: &OfferItemId,
        assignee_id: &AssigneeId,
        entry_type: EntryType,
    ) -> Option<Examination> {
        let rows: Vec<&Examination> = self
            .examinations
            .iter()
            .filter(|e| {
                e.offer_item_id() == offer_item_id
                    && e.assignee_id() == assignee_id
                    && e.entry_type() == entry_type
            })
            .collect();
        let count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        rows.into_iter()
            .max_by_key(|e| e.created_at())
            .map(|e| with_submission_count(e, count))
    }

    fn page(&self, matches: impl Fn(&OfferItem) -> bool, condition: &ListCondition) -> OfferItemPage {
        let mut offer_items: Vec<OfferItem> = self
            .offer_items
            .iter()
            .filter(|o| matches(o))
            .cloned()
            .collect();
        for sort in condition.sorts().iter().rev() {
            offer_items.sort_by(|a, b| {
                let ordering = match sort.order_by.as_str() {
                    "name" => a.name().cmp(b.name()),
                    "id" => a.id().cmp(b.id()),
                    _ => a.created_at().cmp(&b.created_at()),
                };
                if sort.desc {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        let total_count = offer_items.len() as u64;
        let offer_items = offer_items
            .into_iter()
            .skip(condition.offset() as usize)
            .take(condition.limit() as usize)
            .collect();
        OfferItemPage {
            offer_items,
            total_count,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl OfferItemRepository for InMemoryUnitOfWork {
    async fn get_offer_item(
        &mut self,
        id: &OfferItemId,
        _with_lock: bool,
    ) -> Result<OfferItem, DomainError> {
        self.working
            .offer_items
            .iter()
            .find(|o| o.id() == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("offer item {id}")))
    }

    async fn bulk_get_offer_items(
        &mut self,
        ids: &[OfferItemId],
        include_closed: bool,
    ) -> Result<Vec<OfferItem>, DomainError> {
        Ok(self
            .working
            .offer_items
            .iter()
            .filter(|o| ids.contains(o.id()) && (include_closed || !o.is_closed()))
            .cloned()
            .collect())
    }

    async fn list_offer_items(
        &mut self,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError> {
        Ok(self.working.page(|_| true, condition))
    }

    async fn search_offer_items(
        &mut self,
        criteria: &SearchCriteria,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError> {
        let name = criteria.name_contains.as_deref().filter(|n| !n.is_empty());
        let item_id = criteria.item_id.as_ref().filter(|id| !id.is_empty());
        let df_item_id = criteria.df_item_id.as_ref().filter(|id| !id.is_empty());
        Ok(self.working.page(
            |o| {
                name.is_none_or(|n| contains_ignore_case(o.name(), n))
                    && item_id.is_none_or(|id| {
                        o.item().id.as_str().eq_ignore_ascii_case(id.as_str())
                    })
                    && df_item_id.is_none_or(|id| {
                        o.df_item()
                            .is_some_and(|df| df.id.as_str().eq_ignore_ascii_case(id.as_str()))
                    })
            },
            condition,
        ))
    }

    async fn list_offer_item_ids_by_end_date(
        &mut self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OfferItemId>, DomainError> {
        Ok(self
            .working
            .offer_items
            .iter()
            .filter(|o| {
                o.schedules().iter().any(|s| {
                    s.schedule_type() == ScheduleType::Invitation
                        && s.end_date().is_some_and(|end| since <= end && end <= until)
                })
            })
            .map(|o| o.id().clone())
            .collect())
    }

    async fn create_offer_item(&mut self, offer_item: &OfferItem) -> Result<(), DomainError> {
        if self.working.offer_items.iter().any(|o| o.id() == offer_item.id()) {
            return Err(DomainError::Conflict(format!(
                "offer item {} already exists",
                offer_item.id()
            )));
        }
        self.working.offer_items.push(offer_item.clone());
        Ok(())
    }

    async fn update_offer_item(&mut self, offer_item: &OfferItem) -> Result<(), DomainError> {
        let slot = self
            .working
            .offer_items
            .iter_mut()
            .find(|o| o.id() == offer_item.id())
            .ok_or_else(|| DomainError::not_found(format!("offer item {}", offer_item.id())))?;
        *slot = offer_item.clone();
        Ok(())
    }

    async fn delete_offer_item(&mut self, id: &OfferItemId) -> Result<(), DomainError> {
        let state = &mut self.working;
        state.offer_items.retain(|o| o.id() != id);
        state.assignees.retain(|a| a.offer_item_id() != id);
        state.examinations.retain(|e| e.offer_item_id() != id);
        state.questionnaires.remove(id);
        state.answers.retain(|a| &a.offer_item_id != id);
        Ok(())
    }
}

#[async_trait]
impl AssigneeRepository for InMemoryUnitOfWork {
    async fn get_assignee(
        &mut self,
        offer_item_id: &OfferItemId,
        ameba_id: &AmebaId,
        _with_lock: bool,
    ) -> Result<Assignee, DomainError> {
        self.working
            .assignees
            .iter()
            .find(|a| a.offer_item_id() == offer_item_id && a.ameba_id() == ameba_id)
            .cloned()
            .ok_or_else(|| {
                DomainError::not_found(format!("assignee {ameba_id} of offer item {offer_item_id}"))
            })
    }

    async fn list_assignees(
        &mut self,
        offer_item_id: &OfferItemId,
        stage: Option<Stage>,
        _with_lock: bool,
    ) -> Result<Vec<Assignee>, DomainError> {
        Ok(self
            .working
            .assignees
            .iter()
            .filter(|a| a.offer_item_id() == offer_item_id)
            .filter(|a| stage.is_none_or(|s| a.stage() == s))
            .cloned()
            .collect())
    }

    async fn list_assignees_by_ameba_ids(
        &mut self,
        offer_item_id: &OfferItemId,
        ameba_ids: &[AmebaId],
        stage: Option<Stage>,
        _with_lock: bool,
    ) -> Result<Vec<Assignee>, DomainError> {
        Ok(self
            .working
            .assignees
            .iter()
            .filter(|a| a.offer_item_id() == offer_item_id && ameba_ids.contains(a.ameba_id()))
            .filter(|a| stage.is_none_or(|s| a.stage() == s))
            .cloned()
            .collect())
    }

    async fn list_assignees_under_examination(&mut self) -> Result<Vec<Assignee>, DomainError> {
        Ok(self
            .working
            .assignees
            .iter()
            .filter(|a| matches!(a.stage(), Stage::PreExamination | Stage::Examination))
            .cloned()
            .collect())
    }

    async fn list_assignees_for_blogger(
        &mut self,
        ameba_id: &AmebaId,
    ) -> Result<Vec<Assignee>, DomainError> {
        Ok(self
            .working
            .assignees
            .iter()
            .filter(|a| a.ameba_id() == ameba_id)
            .cloned()
            .collect())
    }

    async fn count_assignees_by_stage(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<Vec<AssigneeCount>, DomainError> {
        let mut counts: Vec<AssigneeCount> = Vec::new();
        for assignee in self
            .working
            .assignees
            .iter()
            .filter(|a| a.offer_item_id() == offer_item_id)
        {
            match counts.iter_mut().find(|c| c.stage == assignee.stage()) {
                Some(count) => count.count += 1,
                None => counts.push(AssigneeCount {
                    stage: assignee.stage(),
                    count: 1,
                }),
            }
        }
        Ok(counts)
    }

    async fn create_assignee(&mut self, assignee: &Assignee) -> Result<(), DomainError> {
        if self.working.assignees.iter().any(|a| {
            a.offer_item_id() == assignee.offer_item_id() && a.ameba_id() == assignee.ameba_id()
        }) {
            return Err(DomainError::Conflict(format!(
                "assignee {} already exists",
                assignee.ameba_id()
            )));
        }
        self.working.assignees.push(assignee.clone());
        Ok(())
    }

    async fn update_assignee(&mut self, assignee: &Assignee) -> Result<(), DomainError> {
        let slot = self
            .working
            .assignees
            .iter_mut()
            .find(|a| a.id() == assignee.id())
            .ok_or_else(|| DomainError::not_found(format!("assignee {}", assignee.id())))?;
        *slot = assignee.clone();
        Ok(())
    }

    async fn delete_assignee(&mut self, id: &AssigneeId) -> Result<(), DomainError> {
        self.working.assignees.retain(|a| a.id() != id);
        self.working.answers.retain(|a| &a.assignee_id != id);
        Ok(())
    }
}

#[async_trait]
impl ExaminationRepository for InMemoryUnitOfWork {
    async fn get_latest_examination(
        &mut self,
        offer_item_id: &OfferItemId,
        assignee_id: &AssigneeId,
        entry_type: EntryType,
        _with_lock: bool,
    ) -> Result<Examination, DomainError> {
        self.working
            .latest_examination(offer_item_id, assignee_id, entry_type)
            .ok_or_else(|| {
                DomainError::not_found(format!(
                    "{entry_type} examination of assignee {assignee_id}"
                ))
            })
    }

    async fn bulk_get_latest_examinations(
        &mut self,
        offer_item_id: &OfferItemId,
        entry_type: EntryType,
    ) -> Result<HashMap<AmebaId, Examination>, DomainError> {
        let mut latest = HashMap::new();
        for assignee in self
            .working
            .assignees
            .iter()
            .filter(|a| a.offer_item_id() == offer_item_id)
        {
            if let Some(examination) =
                self.working
                    .latest_examination(offer_item_id, assignee.id(), entry_type)
            {
                latest.insert(assignee.ameba_id().clone(), examination);
            }
        }
        Ok(latest)
    }

    async fn create_examination(&mut self, examination: &Examination) -> Result<(), DomainError> {
        self.working.examinations.push(examination.clone());
        Ok(())
    }

    async fn update_examination(&mut self, examination: &Examination) -> Result<(), DomainError> {
        let slot = self
            .working
            .examinations
            .iter_mut()
            .find(|e| e.id() == examination.id())
            .ok_or_else(|| DomainError::not_found(format!("examination {}", examination.id())))?;
        let count = slot.entry_submission_count();
        *slot = with_submission_count(examination, count);
        Ok(())
    }
}

#[async_trait]
impl QuestionnaireRepository for InMemoryUnitOfWork {
    async fn find_questionnaire(
        &mut self,
        offer_item_id: &OfferItemId,
        _with_lock: bool,
    ) -> Result<Option<Questionnaire>, DomainError> {
        Ok(self.working.questionnaires.get(offer_item_id).cloned())
    }

    async fn save_questionnaire(
        &mut self,
        questionnaire: &Questionnaire,
    ) -> Result<(), DomainError> {
        self.working
            .questionnaires
            .insert(questionnaire.offer_item_id().clone(), questionnaire.clone());
        Ok(())
    }

    async fn delete_questionnaire(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<(), DomainError> {
        self.working.questionnaires.remove(offer_item_id);
        Ok(())
    }
}

#[async_trait]
impl QuestionAnswerRepository for InMemoryUnitOfWork {
    async fn list_question_answers(
        &mut self,
        offer_item_id: &OfferItemId,
        assignee_ids: &[AssigneeId],
    ) -> Result<Vec<QuestionAnswer>, DomainError> {
        Ok(self
            .working
            .answers
            .iter()
            .filter(|a| &a.offer_item_id == offer_item_id && assignee_ids.contains(&a.assignee_id))
            .cloned()
            .collect())
    }

    async fn save_question_answers(
        &mut self,
        answers: &[QuestionAnswer],
    ) -> Result<(), DomainError> {
        for answer in answers {
            self.working.answers.retain(|a| {
                !(a.offer_item_id == answer.offer_item_id
                    && a.assignee_id == answer.assignee_id
                    && a.question_id == answer.question_id)
            });
            self.working.answers.push(answer.clone());
        }
        Ok(())
    }

    async fn delete_question_answers(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<(), DomainError> {
        self.working
            .answers
            .retain(|a| &a.offer_item_id != offer_item_id);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let this = *self;
        *this.shared.lock().unwrap() = this.working;
        *this.commits.lock().unwrap() += 1;
        Ok(())
    }
}

/// A store that cannot open a unit of work.
#[derive(Debug)]
pub struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
