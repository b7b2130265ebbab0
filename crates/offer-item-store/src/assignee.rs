//! `AssigneeRepository` over the `assignee` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use offer_item_lifecycle::domain::assignee::{Assignee, AssigneeCount, AssigneeRecord, Stage};
use offer_item_lifecycle::domain::ids::{AmebaId, AssigneeId, OfferItemId};
use offer_item_lifecycle::domain::repository::AssigneeRepository;
use sqlx::types::Json;

use crate::error::{corrupt, map_sqlx};
use crate::store::{PgUnitOfWork, lock_clause};

const SELECT_ASSIGNEE: &str = "SELECT a.id, a.offer_item_id, a.ameba_id, a.writing_fee, \
    a.stage, a.decline_reason, a.shipping_data, a.jan_code, a.created_at \
    FROM assignee a JOIN offer_item o ON o.id = a.offer_item_id \
    WHERE o.deleted_at IS NULL";

#[derive(sqlx::FromRow)]
struct AssigneeRow {
    id: String,
    offer_item_id: String,
    ameba_id: String,
    writing_fee: i64,
    stage: i16,
    decline_reason: Option<String>,
    shipping_data: Json<Vec<String>>,
    jan_code: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AssigneeRow> for Assignee {
    type Error = DomainError;

    fn try_from(row: AssigneeRow) -> Result<Self, Self::Error> {
        let stage = Stage::from_code(row.stage).map_err(|e| corrupt("assignee.stage", e))?;
        Ok(Assignee::restore(AssigneeRecord {
            id: AssigneeId::new(row.id),
            offer_item_id: OfferItemId::new(row.offer_item_id),
            ameba_id: AmebaId::new(row.ameba_id),
            writing_fee: row.writing_fee,
            stage,
            decline_reason: row.decline_reason,
            created_at: row.created_at,
            shipping_data: row.shipping_data.0,
            jan_code: row.jan_code,
        }))
    }
}

fn assignees(rows: Vec<AssigneeRow>) -> Result<Vec<Assignee>, DomainError> {
    rows.into_iter().map(Assignee::try_from).collect()
}

/// Locks only the assignee rows, not the joined campaign.
fn lock_assignees(with_lock: bool) -> &'static str {
    if with_lock { " FOR UPDATE OF a" } else { "" }
}

#[async_trait]
impl AssigneeRepository for PgUnitOfWork {
    async fn get_assignee(
        &mut self,
        offer_item_id: &OfferItemId,
        ameba_id: &AmebaId,
        with_lock: bool,
    ) -> Result<Assignee, DomainError> {
        let sql = format!(
            "{SELECT_ASSIGNEE} AND a.offer_item_id = $1 AND a.ameba_id = $2{}",
            lock_assignees(with_lock)
        );
        let row: Option<AssigneeRow> = sqlx::query_as(&sql)
            .bind(offer_item_id.as_str())
            .bind(ameba_id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        row.map(Assignee::try_from).transpose()?.ok_or_else(|| {
            DomainError::not_found(format!("assignee {ameba_id} of offer item {offer_item_id}"))
        })
    }

    async fn list_assignees(
        &mut self,
        offer_item_id: &OfferItemId,
        stage: Option<Stage>,
        with_lock: bool,
    ) -> Result<Vec<Assignee>, DomainError> {
        let sql = format!(
            "{SELECT_ASSIGNEE} AND a.offer_item_id = $1 AND ($2::SMALLINT IS NULL OR a.stage = $2) \
             ORDER BY a.created_at, a.id{}",
            lock_assignees(with_lock)
        );
        let rows: Vec<AssigneeRow> = sqlx::query_as(&sql)
            .bind(offer_item_id.as_str())
            .bind(stage.map(Stage::code))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        assignees(rows)
    }

    async fn list_assignees_by_ameba_ids(
        &mut self,
        offer_item_id: &OfferItemId,
        ameba_ids: &[AmebaId],
        stage: Option<Stage>,
        with_lock: bool,
    ) -> Result<Vec<Assignee>, DomainError> {
        let sql = format!(
            "{SELECT_ASSIGNEE} AND a.offer_item_id = $1 AND a.ameba_id = ANY($2) \
             AND ($3::SMALLINT IS NULL OR a.stage = $3) ORDER BY a.created_at, a.id{}",
            lock_assignees(with_lock)
        );
        let ameba_ids: Vec<String> = ameba_ids.iter().map(|id| id.as_str().to_owned()).collect();
        let rows: Vec<AssigneeRow> = sqlx::query_as(&sql)
            .bind(offer_item_id.as_str())
            .bind(ameba_ids)
            .bind(stage.map(Stage::code))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        assignees(rows)
    }

    async fn list_assignees_under_examination(&mut self) -> Result<Vec<Assignee>, DomainError> {
        let sql = format!("{SELECT_ASSIGNEE} AND a.stage = ANY($1) ORDER BY a.created_at, a.id");
        let rows: Vec<AssigneeRow> = sqlx::query_as(&sql)
            .bind(vec![Stage::PreExamination.code(), Stage::Examination.code()])
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        assignees(rows)
    }

    async fn list_assignees_for_blogger(
        &mut self,
        ameba_id: &AmebaId,
    ) -> Result<Vec<Assignee>, DomainError> {
        let sql = format!("{SELECT_ASSIGNEE} AND a.ameba_id = $1 ORDER BY a.created_at, a.id");
        let rows: Vec<AssigneeRow> = sqlx::query_as(&sql)
            .bind(ameba_id.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        assignees(rows)
    }

    async fn count_assignees_by_stage(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<Vec<AssigneeCount>, DomainError> {
        let rows: Vec<(i16, i64)> = sqlx::query_as(
            "SELECT a.stage, COUNT(*) FROM assignee a JOIN offer_item o ON o.id = a.offer_item_id \
             WHERE o.deleted_at IS NULL AND a.offer_item_id = $1 GROUP BY a.stage ORDER BY a.stage",
        )
        .bind(offer_item_id.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter()
            .map(|(stage, count)| {
                Ok(AssigneeCount {
                    stage: Stage::from_code(stage).map_err(|e| corrupt("assignee.stage", e))?,
                    count: u64::try_from(count).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn create_assignee(&mut self, assignee: &Assignee) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO assignee (id, offer_item_id, ameba_id, writing_fee, stage, \
             decline_reason, shipping_data, jan_code, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(assignee.id().as_str())
        .bind(assignee.offer_item_id().as_str())
        .bind(assignee.ameba_id().as_str())
        .bind(assignee.writing_fee())
        .bind(assignee.stage().code())
        .bind(assignee.decline_reason())
        .bind(Json(assignee.shipping_data()))
        .bind(assignee.jan_code())
        .bind(assignee.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn update_assignee(&mut self, assignee: &Assignee) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE assignee SET writing_fee = $2, stage = $3, decline_reason = $4, \
             shipping_data = $5, jan_code = $6 WHERE id = $1",
        )
        .bind(assignee.id().as_str())
        .bind(assignee.writing_fee())
        .bind(assignee.stage().code())
        .bind(assignee.decline_reason())
        .bind(Json(assignee.shipping_data()))
        .bind(assignee.jan_code())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("assignee {}", assignee.id())));
        }
        Ok(())
    }

    async fn delete_assignee(&mut self, id: &AssigneeId) -> Result<(), DomainError> {
        for table in ["questionnaire_question_answer", "examination"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE assignee_id = $1"))
                .bind(id.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx)?;
        }
        sqlx::query("DELETE FROM assignee WHERE id = $1")
            .bind(id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
