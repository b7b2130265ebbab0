//! `ExaminationRepository` over the append-only `examination` table.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use offer_item_lifecycle::domain::examination::{EntryType, Examination, ExaminationRecord};
use offer_item_lifecycle::domain::ids::{
    AmebaId, AssigneeId, EntryId, ExaminationId, OfferItemId,
};
use offer_item_lifecycle::domain::repository::ExaminationRepository;

use crate::error::{corrupt, map_sqlx};
use crate::store::{PgUnitOfWork, lock_clause};

#[derive(sqlx::FromRow)]
struct ExaminationRow {
    id: String,
    offer_item_id: String,
    assignee_id: String,
    ameba_id: String,
    entry_type: i16,
    entry_id: Option<String>,
    is_passed: Option<bool>,
    examiner_name: Option<String>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl ExaminationRow {
    fn into_examination(self, submission_count: i64) -> Result<Examination, DomainError> {
        let entry_type =
            EntryType::from_code(self.entry_type).map_err(|e| corrupt("examination.entry_type", e))?;
        let entry_submission_count = u32::try_from(submission_count)
            .map_err(|e| corrupt("examination submission count", e))?;
        Ok(Examination::restore(ExaminationRecord {
            id: ExaminationId::new(self.id),
            offer_item_id: OfferItemId::new(self.offer_item_id),
            assignee_id: AssigneeId::new(self.assignee_id),
            ameba_id: AmebaId::new(self.ameba_id),
            entry_type,
            entry_id: self.entry_id.map(EntryId::new),
            is_passed: self.is_passed,
            examiner_name: self.examiner_name,
            reason: self.reason,
            created_at: self.created_at,
            entry_submission_count,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct CountedExaminationRow {
    #[sqlx(flatten)]
    row: ExaminationRow,
    submission_count: i64,
}

#[async_trait]
impl ExaminationRepository for PgUnitOfWork {
    async fn get_latest_examination(
        &mut self,
        offer_item_id: &OfferItemId,
        assignee_id: &AssigneeId,
        entry_type: EntryType,
        with_lock: bool,
    ) -> Result<Examination, DomainError> {
        let sql = format!(
            "SELECT id, offer_item_id, assignee_id, ameba_id, entry_type, entry_id, is_passed, \
             examiner_name, reason, created_at FROM examination \
             WHERE offer_item_id = $1 AND assignee_id = $2 AND entry_type = $3 \
             ORDER BY created_at DESC, seq DESC LIMIT 1{}",
            lock_clause(with_lock)
        );
        let row: Option<ExaminationRow> = sqlx::query_as(&sql)
            .bind(offer_item_id.as_str())
            .bind(assignee_id.as_str())
            .bind(entry_type.code())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        let Some(row) = row else {
            return Err(DomainError::not_found(format!(
                "{entry_type} examination of assignee {assignee_id}"
            )));
        };

        // Row locks and aggregates do not mix, so the count is a second read.
        let submission_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM examination \
             WHERE offer_item_id = $1 AND assignee_id = $2 AND entry_type = $3",
        )
        .bind(offer_item_id.as_str())
        .bind(assignee_id.as_str())
        .bind(entry_type.code())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        row.into_examination(submission_count)
    }

    async fn bulk_get_latest_examinations(
        &mut self,
        offer_item_id: &OfferItemId,
        entry_type: EntryType,
    ) -> Result<HashMap<AmebaId, Examination>, DomainError> {
        let rows: Vec<CountedExaminationRow> = sqlx::query_as(
            "SELECT DISTINCT ON (assignee_id) id, offer_item_id, assignee_id, ameba_id, \
             entry_type, entry_id, is_passed, examiner_name, reason, created_at, \
             COUNT(*) OVER (PARTITION BY assignee_id) AS submission_count \
             FROM examination WHERE offer_item_id = $1 AND entry_type = $2 \
             ORDER BY assignee_id, created_at DESC, seq DESC",
        )
        .bind(offer_item_id.as_str())
        .bind(entry_type.code())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter()
            .map(|counted| {
                let examination = counted.row.into_examination(counted.submission_count)?;
                Ok((examination.ameba_id().clone(), examination))
            })
            .collect()
    }

    async fn create_examination(&mut self, examination: &Examination) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO examination (id, offer_item_id, assignee_id, ameba_id, entry_type, \
             entry_id, is_passed, examiner_name, reason, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(examination.id().as_str())
        .bind(examination.offer_item_id().as_str())
        .bind(examination.assignee_id().as_str())
        .bind(examination.ameba_id().as_str())
        .bind(examination.entry_type().code())
        .bind(examination.entry_id().map(EntryId::as_str))
        .bind(examination.is_passed())
        .bind(examination.examiner_name())
        .bind(examination.reason())
        .bind(examination.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update_examination(&mut self, examination: &Examination) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE examination SET is_passed = $2, examiner_name = $3, reason = $4 WHERE id = $1",
        )
        .bind(examination.id().as_str())
        .bind(examination.is_passed())
        .bind(examination.examiner_name())
        .bind(examination.reason())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("examination {}", examination.id())));
        }
        Ok(())
    }
}
