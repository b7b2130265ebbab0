//! `OfferItemRepository` over the `offer_item`, `drafted_item_info` and
//! `schedule` tables.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use offer_item_core::error::DomainError;
use offer_item_core::list::ListCondition;
use offer_item_lifecycle::domain::commission::{Commission, CommissionType};
use offer_item_lifecycle::domain::ids::{BannerId, OfferItemId, ScheduleId};
use offer_item_lifecycle::domain::item::{DfItem, DraftedItemInfo, Item};
use offer_item_lifecycle::domain::offer_item::{
    MailToggles, NewOfferItem, OfferItem, OfferItemRecord, OfferTexts, PostTarget,
    SpecialCommission, WorkflowFlags,
};
use offer_item_lifecycle::domain::repository::{
    OfferItemPage, OfferItemRepository, SearchCriteria,
};
use offer_item_lifecycle::domain::schedule::{Schedule, ScheduleType};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use crate::error::{corrupt, map_sqlx};
use crate::store::{PgUnitOfWork, lock_clause};

const SELECT_OFFER_ITEM: &str = "SELECT o.id, o.name, o.item, o.df_item, o.has_coupon, \
    o.coupon_banner_id, o.has_special_commission, o.special_rate, o.special_amount, \
    o.has_sample, o.needs_preliminary_review, o.needs_after_review, o.needs_pr_mark, \
    o.post_required, o.has_lottery, o.post_target, o.product_features, o.cautionary_points, \
    o.reference_info, o.other_info, o.mail, o.is_closed, o.created_at, \
    d.name AS drafted_name, d.content_name AS drafted_content_name, \
    d.image_url AS drafted_image_url, d.url AS drafted_url, d.min_commission_type, \
    d.min_commission_rate, d.max_commission_type, d.max_commission_rate \
    FROM offer_item o JOIN drafted_item_info d ON d.offer_item_id = o.id \
    WHERE o.deleted_at IS NULL";

#[derive(sqlx::FromRow)]
struct OfferItemRow {
    id: String,
    name: String,
    item: Json<Item>,
    df_item: Option<Json<DfItem>>,
    has_coupon: bool,
    coupon_banner_id: Option<String>,
    has_special_commission: bool,
    special_rate: f64,
    special_amount: i64,
    has_sample: bool,
    needs_preliminary_review: bool,
    needs_after_review: bool,
    needs_pr_mark: bool,
    post_required: bool,
    has_lottery: bool,
    post_target: i16,
    product_features: String,
    cautionary_points: String,
    reference_info: String,
    other_info: String,
    mail: Json<MailToggles>,
    is_closed: bool,
    created_at: DateTime<Utc>,
    drafted_name: String,
    drafted_content_name: String,
    drafted_image_url: String,
    drafted_url: String,
    min_commission_type: i16,
    min_commission_rate: f32,
    max_commission_type: i16,
    max_commission_rate: f32,
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    id: String,
    offer_item_id: String,
    schedule_type: i16,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

fn commission(code: i16, rate: f32, column: &str) -> Result<Commission, DomainError> {
    let commission_type = CommissionType::from_code(code).map_err(|e| corrupt(column, e))?;
    Ok(Commission {
        commission_type,
        calculated_rate: rate,
    })
}

impl OfferItemRow {
    fn into_offer_item(self, schedules: Vec<Schedule>) -> Result<OfferItem, DomainError> {
        let post_target = PostTarget::from_code(self.post_target)
            .map_err(|e| corrupt("offer_item.post_target", e))?;
        let drafted_item_info = DraftedItemInfo::restore(
            self.drafted_name,
            self.drafted_content_name,
            self.drafted_image_url,
            self.drafted_url,
            commission(
                self.min_commission_type,
                self.min_commission_rate,
                "drafted_item_info.min_commission_type",
            )?,
            commission(
                self.max_commission_type,
                self.max_commission_rate,
                "drafted_item_info.max_commission_type",
            )?,
        );
        Ok(OfferItem::restore(OfferItemRecord {
            id: OfferItemId::new(self.id),
            fields: NewOfferItem {
                name: self.name,
                item: self.item.0,
                df_item: self.df_item.map(|df| df.0),
                has_coupon: self.has_coupon,
                coupon_banner_id: self.coupon_banner_id.map(BannerId::new),
                special_commission: SpecialCommission {
                    enabled: self.has_special_commission,
                    rate: self.special_rate,
                    amount: self.special_amount,
                },
                flags: WorkflowFlags {
                    has_sample: self.has_sample,
                    needs_preliminary_review: self.needs_preliminary_review,
                    needs_after_review: self.needs_after_review,
                    needs_pr_mark: self.needs_pr_mark,
                    post_required: self.post_required,
                    has_lottery: self.has_lottery,
                },
                post_target,
                texts: OfferTexts {
                    product_features: self.product_features,
                    cautionary_points: self.cautionary_points,
                    reference_info: self.reference_info,
                    other_info: self.other_info,
                },
                mail: self.mail.0,
                is_closed: self.is_closed,
                schedules,
                drafted_item_info,
            },
            created_at: self.created_at,
        }))
    }
}

impl PgUnitOfWork {
    async fn load_schedules(
        &mut self,
        offer_item_ids: Vec<String>,
    ) -> Result<HashMap<String, Vec<Schedule>>, DomainError> {
        let rows: Vec<ScheduleRow> = sqlx::query_as(
            "SELECT id, offer_item_id, schedule_type, start_date, end_date FROM schedule \
             WHERE offer_item_id = ANY($1) ORDER BY schedule_type",
        )
        .bind(offer_item_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        let mut by_offer_item: HashMap<String, Vec<Schedule>> = HashMap::new();
        for row in rows {
            let schedule_type = ScheduleType::from_code(row.schedule_type)
                .map_err(|e| corrupt("schedule.schedule_type", e))?;
            by_offer_item
                .entry(row.offer_item_id)
                .or_default()
                .push(Schedule::restore(
                    ScheduleId::new(row.id),
                    schedule_type,
                    row.start_date,
                    row.end_date,
                ));
        }
        Ok(by_offer_item)
    }

    async fn assemble(&mut self, rows: Vec<OfferItemRow>) -> Result<Vec<OfferItem>, DomainError> {
        let ids = rows.iter().map(|r| r.id.clone()).collect();
        let mut schedules = self.load_schedules(ids).await?;
        rows.into_iter()
            .map(|row| {
                let own = schedules.remove(&row.id).unwrap_or_default();
                row.into_offer_item(own)
            })
            .collect()
    }

    async fn write_children(&mut self, offer_item: &OfferItem) -> Result<(), DomainError> {
        let id = offer_item.id().as_str();
        let info = offer_item.drafted_item_info();
        sqlx::query(
            "INSERT INTO drafted_item_info (offer_item_id, name, content_name, image_url, url, \
             min_commission_type, min_commission_rate, max_commission_type, max_commission_rate) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (offer_item_id) DO UPDATE SET name = EXCLUDED.name, \
             content_name = EXCLUDED.content_name, image_url = EXCLUDED.image_url, \
             url = EXCLUDED.url, min_commission_type = EXCLUDED.min_commission_type, \
             min_commission_rate = EXCLUDED.min_commission_rate, \
             max_commission_type = EXCLUDED.max_commission_type, \
             max_commission_rate = EXCLUDED.max_commission_rate",
        )
        .bind(id)
        .bind(info.name())
        .bind(info.content_name())
        .bind(info.image_url())
        .bind(info.url())
        .bind(info.min_commission().commission_type.code())
        .bind(info.min_commission().calculated_rate)
        .bind(info.max_commission().commission_type.code())
        .bind(info.max_commission().calculated_rate)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("DELETE FROM schedule WHERE offer_item_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        for schedule in offer_item.schedules() {
            sqlx::query(
                "INSERT INTO schedule (id, offer_item_id, schedule_type, start_date, end_date) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(schedule.id().as_str())
            .bind(id)
            .bind(schedule.schedule_type().code())
            .bind(schedule.start_date())
            .bind(schedule.end_date())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        }
        Ok(())
    }

    async fn page(
        &mut self,
        criteria: &SearchCriteria,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM offer_item o WHERE o.deleted_at IS NULL",
        );
        push_filters(&mut count, criteria);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        let mut select = QueryBuilder::<Postgres>::new(SELECT_OFFER_ITEM);
        push_filters(&mut select, criteria);
        select.push(" ORDER BY ");
        for sort in condition.sorts() {
            select.push(sort_column(&sort.order_by)?);
            select.push(if sort.desc { " DESC, " } else { " ASC, " });
        }
        select.push("o.id ASC LIMIT ");
        select.push_bind(i64::from(condition.limit()));
        select.push(" OFFSET ");
        select.push_bind(i64::from(condition.offset()));
        let rows: Vec<OfferItemRow> = select
            .build_query_as()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        Ok(OfferItemPage {
            offer_items: self.assemble(rows).await?,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}

fn sort_column(order_by: &str) -> Result<&'static str, DomainError> {
    match order_by {
        "created_at" => Ok("o.created_at"),
        "name" => Ok("o.name"),
        "id" => Ok("o.id"),
        other => Err(DomainError::validation(format!(
            "cannot sort offer items by {other}"
        ))),
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, criteria: &SearchCriteria) {
    if let Some(name) = criteria.name_contains.as_deref().filter(|n| !n.is_empty()) {
        query.push(" AND o.name ILIKE ");
        query.push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(item_id) = criteria.item_id.as_ref().filter(|id| !id.is_empty()) {
        query.push(" AND LOWER(o.item_id) = LOWER(");
        query.push_bind(item_id.as_str().to_owned());
        query.push(")");
    }
    if let Some(df_item_id) = criteria.df_item_id.as_ref().filter(|id| !id.is_empty()) {
        query.push(" AND LOWER(o.df_item_id) = LOWER(");
        query.push_bind(df_item_id.as_str().to_owned());
        query.push(")");
    }
}

#[async_trait]
impl OfferItemRepository for PgUnitOfWork {
    async fn get_offer_item(
        &mut self,
        id: &OfferItemId,
        with_lock: bool,
    ) -> Result<OfferItem, DomainError> {
        let sql = format!("{SELECT_OFFER_ITEM} AND o.id = $1{}", lock_clause(with_lock));
        let row: Option<OfferItemRow> = sqlx::query_as(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        let Some(row) = row else {
            return Err(DomainError::not_found(format!("offer item {id}")));
        };
        self.assemble(vec![row])
            .await?
            .pop()
            .ok_or_else(|| DomainError::not_found(format!("offer item {id}")))
    }

    async fn bulk_get_offer_items(
        &mut self,
        ids: &[OfferItemId],
        include_closed: bool,
    ) -> Result<Vec<OfferItem>, DomainError> {
        let closed = if include_closed {
            ""
        } else {
            " AND o.is_closed = FALSE"
        };
        let sql = format!("{SELECT_OFFER_ITEM} AND o.id = ANY($1){closed} ORDER BY o.created_at");
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let rows: Vec<OfferItemRow> = sqlx::query_as(&sql)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        self.assemble(rows).await
    }

    async fn list_offer_items(
        &mut self,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError> {
        self.page(&SearchCriteria::default(), condition).await
    }

    async fn search_offer_items(
        &mut self,
        criteria: &SearchCriteria,
        condition: &ListCondition,
    ) -> Result<OfferItemPage, DomainError> {
        self.page(criteria, condition).await
    }

    async fn list_offer_item_ids_by_end_date(
        &mut self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<OfferItemId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT o.id FROM offer_item o JOIN schedule s ON s.offer_item_id = o.id \
             WHERE o.deleted_at IS NULL AND s.schedule_type = $1 \
             AND s.end_date BETWEEN $2 AND $3 ORDER BY s.end_date, o.id",
        )
        .bind(ScheduleType::Invitation.code())
        .bind(since)
        .bind(until)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(ids.into_iter().map(OfferItemId::new).collect())
    }

    async fn create_offer_item(&mut self, offer_item: &OfferItem) -> Result<(), DomainError> {
        let special = offer_item.special_commission();
        let flags = offer_item.flags();
        let texts = offer_item.texts();
        sqlx::query(
            "INSERT INTO offer_item (id, name, item_id, df_item_id, item, df_item, has_coupon, \
             coupon_banner_id, has_special_commission, special_rate, special_amount, has_sample, \
             needs_preliminary_review, needs_after_review, needs_pr_mark, post_required, \
             has_lottery, post_target, product_features, cautionary_points, reference_info, \
             other_info, mail, pick_info, is_closed, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)",
        )
        .bind(offer_item.id().as_str())
        .bind(offer_item.name())
        .bind(offer_item.item().id.as_str())
        .bind(offer_item.df_item().map(|df| df.id.as_str()))
        .bind(Json(offer_item.item()))
        .bind(offer_item.df_item().map(Json))
        .bind(offer_item.has_coupon())
        .bind(offer_item.coupon_banner_id().map(BannerId::as_str))
        .bind(special.enabled)
        .bind(special.rate)
        .bind(special.amount)
        .bind(flags.has_sample)
        .bind(flags.needs_preliminary_review)
        .bind(flags.needs_after_review)
        .bind(flags.needs_pr_mark)
        .bind(flags.post_required)
        .bind(flags.has_lottery)
        .bind(offer_item.post_target().code())
        .bind(texts.product_features.as_str())
        .bind(texts.cautionary_points.as_str())
        .bind(texts.reference_info.as_str())
        .bind(texts.other_info.as_str())
        .bind(Json(offer_item.mail_toggles()))
        .bind(Json(offer_item.pick_info()))
        .bind(offer_item.is_closed())
        .bind(offer_item.created_at())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        self.write_children(offer_item).await
    }

    async fn update_offer_item(&mut self, offer_item: &OfferItem) -> Result<(), DomainError> {
        let special = offer_item.special_commission();
        let flags = offer_item.flags();
        let texts = offer_item.texts();
        let result = sqlx::query(
            "UPDATE offer_item SET name = $2, item_id = $3, df_item_id = $4, item = $5, \
             df_item = $6, has_coupon = $7, coupon_banner_id = $8, \
             has_special_commission = $9, special_rate = $10, special_amount = $11, \
             has_sample = $12, needs_preliminary_review = $13, needs_after_review = $14, \
             needs_pr_mark = $15, post_required = $16, has_lottery = $17, post_target = $18, \
             product_features = $19, cautionary_points = $20, reference_info = $21, \
             other_info = $22, mail = $23, pick_info = $24, is_closed = $25, \
             updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(offer_item.id().as_str())
        .bind(offer_item.name())
        .bind(offer_item.item().id.as_str())
        .bind(offer_item.df_item().map(|df| df.id.as_str()))
        .bind(Json(offer_item.item()))
        .bind(offer_item.df_item().map(Json))
        .bind(offer_item.has_coupon())
        .bind(offer_item.coupon_banner_id().map(BannerId::as_str))
        .bind(special.enabled)
        .bind(special.rate)
        .bind(special.amount)
        .bind(flags.has_sample)
        .bind(flags.needs_preliminary_review)
        .bind(flags.needs_after_review)
        .bind(flags.needs_pr_mark)
        .bind(flags.post_required)
        .bind(flags.has_lottery)
        .bind(offer_item.post_target().code())
        .bind(texts.product_features.as_str())
        .bind(texts.cautionary_points.as_str())
        .bind(texts.reference_info.as_str())
        .bind(texts.other_info.as_str())
        .bind(Json(offer_item.mail_toggles()))
        .bind(Json(offer_item.pick_info()))
        .bind(offer_item.is_closed())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "offer item {}",
                offer_item.id()
            )));
        }
        self.write_children(offer_item).await
    }

    async fn delete_offer_item(&mut self, id: &OfferItemId) -> Result<(), DomainError> {
        sqlx::query("UPDATE offer_item SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        for table in [
            "questionnaire_question_answer",
            "questionnaire_question",
            "questionnaire",
            "examination",
            "assignee",
            "schedule",
            "drafted_item_info",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE offer_item_id = $1"))
                .bind(id.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(map_sqlx)?;
        }
        Ok(())
    }
}
