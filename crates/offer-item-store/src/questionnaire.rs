//! Questionnaire and answer repositories.

use async_trait::async_trait;
use offer_item_core::error::DomainError;
use offer_item_lifecycle::domain::ids::{AssigneeId, OfferItemId, QuestionId};
use offer_item_lifecycle::domain::questionnaire::{
    Question, QuestionAnswer, QuestionType, Questionnaire,
};
use offer_item_lifecycle::domain::repository::{QuestionAnswerRepository, QuestionnaireRepository};
use sqlx::types::Json;

use crate::error::{corrupt, map_sqlx};
use crate::store::{PgUnitOfWork, lock_clause};

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: String,
    question_type: i16,
    title: String,
    image_url: String,
    options: Json<Vec<String>>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = DomainError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = QuestionType::from_code(row.question_type)
            .map_err(|e| corrupt("questionnaire_question.question_type", e))?;
        Ok(Question::restore(
            QuestionId::new(row.id),
            question_type,
            row.title,
            row.image_url,
            row.options.0,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    offer_item_id: String,
    assignee_id: String,
    question_id: String,
    content: String,
}

impl From<AnswerRow> for QuestionAnswer {
    fn from(row: AnswerRow) -> Self {
        Self {
            offer_item_id: OfferItemId::new(row.offer_item_id),
            assignee_id: AssigneeId::new(row.assignee_id),
            question_id: QuestionId::new(row.question_id),
            content: row.content,
        }
    }
}

impl PgUnitOfWork {
    async fn delete_questions(&mut self, offer_item_id: &OfferItemId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM questionnaire_question WHERE offer_item_id = $1")
            .bind(offer_item_id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

#[async_trait]
impl QuestionnaireRepository for PgUnitOfWork {
    async fn find_questionnaire(
        &mut self,
        offer_item_id: &OfferItemId,
        with_lock: bool,
    ) -> Result<Option<Questionnaire>, DomainError> {
        let sql = format!(
            "SELECT description FROM questionnaire WHERE offer_item_id = $1{}",
            lock_clause(with_lock)
        );
        let description: Option<String> = sqlx::query_scalar(&sql)
            .bind(offer_item_id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        let Some(description) = description else {
            return Ok(None);
        };

        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT id, question_type, title, image_url, options FROM questionnaire_question \
             WHERE offer_item_id = $1 ORDER BY priority",
        )
        .bind(offer_item_id.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        let questions = rows
            .into_iter()
            .map(Question::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Questionnaire::restore(
            offer_item_id.clone(),
            description,
            questions,
        )))
    }

    async fn save_questionnaire(
        &mut self,
        questionnaire: &Questionnaire,
    ) -> Result<(), DomainError> {
        let offer_item_id = questionnaire.offer_item_id();
        sqlx::query(
            "INSERT INTO questionnaire (offer_item_id, description) VALUES ($1, $2) \
             ON CONFLICT (offer_item_id) DO UPDATE SET description = EXCLUDED.description",
        )
        .bind(offer_item_id.as_str())
        .bind(questionnaire.description())
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;

        self.delete_questions(offer_item_id).await?;
        for (priority, question) in (0_i32..).zip(questionnaire.questions()) {
            sqlx::query(
                "INSERT INTO questionnaire_question \
                 (id, offer_item_id, priority, question_type, title, image_url, options) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(question.id().as_str())
            .bind(offer_item_id.as_str())
            .bind(priority)
            .bind(question.question_type().code())
            .bind(question.title())
            .bind(question.image_url())
            .bind(Json(question.options()))
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        }
        Ok(())
    }

    async fn delete_questionnaire(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<(), DomainError> {
        self.delete_questions(offer_item_id).await?;
        sqlx::query("DELETE FROM questionnaire WHERE offer_item_id = $1")
            .bind(offer_item_id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

#[async_trait]
impl QuestionAnswerRepository for PgUnitOfWork {
    async fn list_question_answers(
        &mut self,
        offer_item_id: &OfferItemId,
        assignee_ids: &[AssigneeId],
    ) -> Result<Vec<QuestionAnswer>, DomainError> {
        let assignee_ids: Vec<String> =
            assignee_ids.iter().map(|id| id.as_str().to_owned()).collect();
        let rows: Vec<AnswerRow> = sqlx::query_as(
            "SELECT offer_item_id, assignee_id, question_id, content \
             FROM questionnaire_question_answer \
             WHERE offer_item_id = $1 AND assignee_id = ANY($2) \
             ORDER BY assignee_id, question_id",
        )
        .bind(offer_item_id.as_str())
        .bind(assignee_ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(QuestionAnswer::from).collect())
    }

    async fn save_question_answers(
        &mut self,
        answers: &[QuestionAnswer],
    ) -> Result<(), DomainError> {
        for answer in answers {
            sqlx::query(
                "INSERT INTO questionnaire_question_answer \
                 (offer_item_id, assignee_id, question_id, content) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (offer_item_id, assignee_id, question_id) \
                 DO UPDATE SET content = EXCLUDED.content",
            )
            .bind(answer.offer_item_id.as_str())
            .bind(answer.assignee_id.as_str())
            .bind(answer.question_id.as_str())
            .bind(answer.content.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        }
        Ok(())
    }

    async fn delete_question_answers(
        &mut self,
        offer_item_id: &OfferItemId,
    ) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM questionnaire_question_answer WHERE offer_item_id = $1")
            .bind(offer_item_id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}
