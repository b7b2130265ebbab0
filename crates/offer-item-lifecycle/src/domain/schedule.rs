//! Campaign schedules and the rules for a valid schedule set.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::ids::ScheduleId;

/// Kind of date window a schedule describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Invitation,
    Lottery,
    Shipment,
    DraftSubmission,
    PreExamination,
    ArticlePosting,
    Examination,
    Payment,
}

impl ScheduleType {
    /// Every schedule type, in workflow order.
    pub const ALL: [ScheduleType; 8] = [
        ScheduleType::Invitation,
        ScheduleType::Lottery,
        ScheduleType::Shipment,
        ScheduleType::DraftSubmission,
        ScheduleType::PreExamination,
        ScheduleType::ArticlePosting,
        ScheduleType::Examination,
        ScheduleType::Payment,
    ];

    /// Schedule types every campaign must carry.
    pub const REQUIRED: [ScheduleType; 3] = [
        ScheduleType::Invitation,
        ScheduleType::ArticlePosting,
        ScheduleType::Payment,
    ];

    /// Stable storage code.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            ScheduleType::Invitation => 1,
            ScheduleType::Lottery => 2,
            ScheduleType::Shipment => 3,
            ScheduleType::DraftSubmission => 4,
            ScheduleType::PreExamination => 5,
            ScheduleType::ArticlePosting => 6,
            ScheduleType::Examination => 7,
            ScheduleType::Payment => 8,
        }
    }

    /// Decodes a storage code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown code.
    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| DomainError::validation(format!("schedule type {code} is unknown")))
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A typed date window (or single deadline) of one campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    id: ScheduleId,
    schedule_type: ScheduleType,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

impl Schedule {
    /// Creates a schedule after checking the date rules of its type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the dates do not fit the type.
    pub fn new(
        id: ScheduleId,
        schedule_type: ScheduleType,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Self, DomainError> {
        validate_dates(schedule_type, start_date, end_date)?;
        Ok(Self {
            id,
            schedule_type,
            start_date,
            end_date,
        })
    }

    /// Rebuilds a schedule from persisted state without validation.
    #[must_use]
    pub fn restore(
        id: ScheduleId,
        schedule_type: ScheduleType,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            schedule_type,
            start_date,
            end_date,
        }
    }

    /// Replaces both dates, keeping the old ones if the new pair is invalid.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the dates do not fit the type.
    pub fn set_date(
        &mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<(), DomainError> {
        validate_dates(self.schedule_type, start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &ScheduleId {
        &self.id
    }

    #[must_use]
    pub fn schedule_type(&self) -> ScheduleType {
        self.schedule_type
    }

    #[must_use]
    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }
}

fn validate_dates(
    schedule_type: ScheduleType,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> Result<(), DomainError> {
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            return Err(DomainError::validation(format!(
                "{schedule_type} schedule end date must not precede its start date"
            )));
        }
    }

    let ok = match schedule_type {
        ScheduleType::Payment => start_date.is_none() && end_date.is_some(),
        ScheduleType::Invitation | ScheduleType::ArticlePosting => {
            start_date.is_some() && end_date.is_some()
        }
        _ => start_date.is_some() == end_date.is_some(),
    };
    if ok {
        Ok(())
    } else {
        let rule = match schedule_type {
            ScheduleType::Payment => "takes an end date only",
            ScheduleType::Invitation | ScheduleType::ArticlePosting => {
                "requires both start and end dates"
            }
            _ => "requires both dates or neither",
        };
        Err(DomainError::validation(format!(
            "{schedule_type} schedule {rule}"
        )))
    }
}

/// Checks that a schedule set has no duplicate types, carries every
/// required type, and stays within the size of the enumeration.
pub(crate) fn validate_schedule_set(schedules: &[Schedule]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(schedules.len());
    for schedule in schedules {
        if !seen.insert(schedule.schedule_type) {
            return Err(DomainError::validation(format!(
                "schedule type {} is duplicated",
                schedule.schedule_type
            )));
        }
    }
    for required in ScheduleType::REQUIRED {
        if !seen.contains(&required) {
            return Err(DomainError::validation(format!(
                "schedule type {required} is required"
            )));
        }
    }
    if schedules.len() < ScheduleType::REQUIRED.len() || schedules.len() > ScheduleType::ALL.len()
    {
        return Err(DomainError::validation(format!(
            "schedule count must be between {} and {}",
            ScheduleType::REQUIRED.len(),
            ScheduleType::ALL.len()
        )));
    }
    Ok(())
}
