//! Submission records and their verdicts.

use std::fmt;

use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::ids::{AmebaId, AssigneeId, EntryId, ExaminationId, OfferItemId};

/// Which kind of submission an examination reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Draft,
    Entry,
}

impl EntryType {
    /// Stable storage code.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            EntryType::Draft => 1,
            EntryType::Entry => 2,
        }
    }

    /// Decodes a storage code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown code.
    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(EntryType::Draft),
            2 => Ok(EntryType::Entry),
            _ => Err(DomainError::validation(format!("entry type {code} is invalid"))),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A verdict submitted by an examiner for one blogger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExaminationVerdict {
    pub is_passed: bool,
    pub examiner_name: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Persisted state of an examination, as loaded by a repository.
#[derive(Debug, Clone)]
pub struct ExaminationRecord {
    pub id: ExaminationId,
    pub offer_item_id: OfferItemId,
    pub assignee_id: AssigneeId,
    pub ameba_id: AmebaId,
    pub entry_type: EntryType,
    pub entry_id: Option<EntryId>,
    pub is_passed: Option<bool>,
    pub examiner_name: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub entry_submission_count: u32,
}

/// One submission of a draft or article and the verdict on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Examination {
    id: ExaminationId,
    offer_item_id: OfferItemId,
    assignee_id: AssigneeId,
    ameba_id: AmebaId,
    entry_type: EntryType,
    entry_id: Option<EntryId>,
    is_passed: Option<bool>,
    examiner_name: Option<String>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    entry_submission_count: u32,
}

impl Examination {
    /// Records a new submission.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no entry id is given.
    pub fn new(
        id: ExaminationId,
        offer_item_id: OfferItemId,
        assignee_id: AssigneeId,
        ameba_id: AmebaId,
        entry_type: EntryType,
        entry_id: Option<EntryId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let Some(entry_id) = entry_id.filter(|e| !e.is_empty()) else {
            return Err(DomainError::validation("entry id is required"));
        };
        Ok(Self {
            id,
            offer_item_id,
            assignee_id,
            ameba_id,
            entry_type,
            entry_id: Some(entry_id),
            is_passed: None,
            examiner_name: None,
            reason: None,
            created_at,
            entry_submission_count: 0,
        })
    }

    /// Rebuilds an examination from persisted state without validation.
    #[must_use]
    pub fn restore(record: ExaminationRecord) -> Self {
        Self {
            id: record.id,
            offer_item_id: record.offer_item_id,
            assignee_id: record.assignee_id,
            ameba_id: record.ameba_id,
            entry_type: record.entry_type,
            entry_id: record.entry_id,
            is_passed: record.is_passed,
            examiner_name: record.examiner_name,
            reason: record.reason,
            created_at: record.created_at,
            entry_submission_count: record.entry_submission_count,
        }
    }

    /// Records the verdict. A rejection must carry a reason.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when rejecting without a reason.
    pub fn set_examination_result(
        &mut self,
        is_passed: bool,
        examiner_name: String,
        reason: Option<String>,
    ) -> Result<(), DomainError> {
        if !is_passed && reason.as_deref().is_none_or(str::is_empty) {
            return Err(DomainError::validation(
                "reason is required when the examination is not passed",
            ));
        }
        self.is_passed = Some(is_passed);
        self.examiner_name = Some(examiner_name);
        self.reason = reason;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &ExaminationId {
        &self.id
    }

    #[must_use]
    pub fn offer_item_id(&self) -> &OfferItemId {
        &self.offer_item_id
    }

    #[must_use]
    pub fn assignee_id(&self) -> &AssigneeId {
        &self.assignee_id
    }

    #[must_use]
    pub fn ameba_id(&self) -> &AmebaId {
        &self.ameba_id
    }

    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    #[must_use]
    pub fn entry_id(&self) -> Option<&EntryId> {
        self.entry_id.as_ref()
    }

    #[must_use]
    pub fn is_passed(&self) -> Option<bool> {
        self.is_passed
    }

    #[must_use]
    pub fn examiner_name(&self) -> Option<&str> {
        self.examiner_name.as_deref()
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of submissions of this entry type by this assignee, derived
    /// when read from the store.
    #[must_use]
    pub fn entry_submission_count(&self) -> u32 {
        self.entry_submission_count
    }
}
