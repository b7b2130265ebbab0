//! Per-campaign survey collected when an assignee accepts an invitation.

use std::collections::{HashMap, HashSet};

use offer_item_core::error::DomainError;
use offer_item_core::id::IdGenerator;
use serde::{Deserialize, Serialize};

use super::ids::{AssigneeId, OfferItemId, QuestionId};

/// Answer format of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Radio,
    Text,
}

impl QuestionType {
    /// Stable storage code.
    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            QuestionType::Radio => 1,
            QuestionType::Text => 2,
        }
    }

    /// Decodes a storage code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an unknown code.
    pub fn from_code(code: i16) -> Result<Self, DomainError> {
        match code {
            1 => Ok(QuestionType::Radio),
            2 => Ok(QuestionType::Text),
            _ => Err(DomainError::validation(format!(
                "question type {code} is unknown"
            ))),
        }
    }
}

/// One survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    question_type: QuestionType,
    title: String,
    image_url: String,
    options: Vec<String>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the title is blank or the
    /// options do not suit the question type.
    pub fn new(
        id: QuestionId,
        question_type: QuestionType,
        title: String,
        image_url: String,
        options: Vec<String>,
    ) -> Result<Self, DomainError> {
        validate_title(&title)?;
        validate_options(question_type, &options)?;
        Ok(Self {
            id,
            question_type,
            title,
            image_url,
            options,
        })
    }

    /// Rebuilds a question from persisted state without validation.
    #[must_use]
    pub fn restore(
        id: QuestionId,
        question_type: QuestionType,
        title: String,
        image_url: String,
        options: Vec<String>,
    ) -> Self {
        Self {
            id,
            question_type,
            title,
            image_url,
            options,
        }
    }

    /// Changes the type and options together.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the options do not suit the type.
    pub fn set_options(
        &mut self,
        question_type: QuestionType,
        options: Vec<String>,
    ) -> Result<(), DomainError> {
        validate_options(question_type, &options)?;
        self.question_type = question_type;
        self.options = options;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the title is blank.
    pub fn set_title(&mut self, title: String) -> Result<(), DomainError> {
        validate_title(&title)?;
        self.title = title;
        Ok(())
    }

    pub fn set_image_url(&mut self, image_url: String) {
        self.image_url = image_url;
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// Question as supplied by a save request. A missing, blank, or repeated
/// id means "new question".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionInput {
    #[serde(default)]
    pub id: Option<QuestionId>,
    pub question_type: QuestionType,
    pub title: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// The survey of one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Questionnaire {
    offer_item_id: OfferItemId,
    description: String,
    questions: Vec<Question>,
}

impl Questionnaire {
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the description is blank, there
    /// are no questions, or two questions share a title.
    pub fn new(
        offer_item_id: OfferItemId,
        description: String,
        questions: Vec<Question>,
    ) -> Result<Self, DomainError> {
        validate_description(&description)?;
        validate_questions(&questions)?;
        Ok(Self {
            offer_item_id,
            description,
            questions,
        })
    }

    /// Builds a questionnaire from request input, minting an id for every
    /// question.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any question or the set is
    /// invalid.
    pub fn from_inputs(
        offer_item_id: OfferItemId,
        description: String,
        inputs: Vec<QuestionInput>,
        ids: &dyn IdGenerator,
    ) -> Result<Self, DomainError> {
        let questions = inputs
            .into_iter()
            .map(|q| {
                Question::new(
                    QuestionId::new(ids.generate()),
                    q.question_type,
                    q.title,
                    q.image_url,
                    q.options,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(offer_item_id, description, questions)
    }

    /// Rebuilds a questionnaire from persisted state without validation.
    #[must_use]
    pub fn restore(offer_item_id: OfferItemId, description: String, questions: Vec<Question>) -> Self {
        Self {
            offer_item_id,
            description,
            questions,
        }
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the description is blank.
    pub fn set_description(&mut self, description: String) -> Result<(), DomainError> {
        validate_description(&description)?;
        self.description = description;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the set is empty or titles repeat.
    pub fn set_questions(&mut self, questions: Vec<Question>) -> Result<(), DomainError> {
        validate_questions(&questions)?;
        self.questions = questions;
        Ok(())
    }

    /// Reconciles the questions against request input. The first input
    /// naming an existing id updates that question in place; later repeats
    /// and inputs without an id become new questions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an id this questionnaire does not
    /// have, or `DomainError::Validation` if the result is invalid. On error
    /// the questionnaire is unchanged.
    pub fn reconcile(
        &mut self,
        description: String,
        inputs: Vec<QuestionInput>,
        ids: &dyn IdGenerator,
    ) -> Result<(), DomainError> {
        let mut existing: HashMap<QuestionId, Question> = self
            .questions
            .iter()
            .map(|q| (q.id.clone(), q.clone()))
            .collect();
        let mut claimed = HashSet::new();
        let mut questions = Vec::with_capacity(inputs.len());

        for input in inputs {
            let reuse = match input.id.filter(|id| !id.is_empty()) {
                Some(id) if claimed.contains(&id) => None,
                Some(id) => match existing.remove(&id) {
                    Some(question) => {
                        claimed.insert(id);
                        Some(question)
                    }
                    None => {
                        return Err(DomainError::not_found(format!("question {id}")));
                    }
                },
                None => None,
            };
            let question = match reuse {
                Some(mut question) => {
                    question.set_title(input.title)?;
                    question.set_image_url(input.image_url);
                    question.set_options(input.question_type, input.options)?;
                    question
                }
                None => Question::new(
                    QuestionId::new(ids.generate()),
                    input.question_type,
                    input.title,
                    input.image_url,
                    input.options,
                )?,
            };
            questions.push(question);
        }

        validate_description(&description)?;
        validate_questions(&questions)?;
        self.description = description;
        self.questions = questions;
        Ok(())
    }

    #[must_use]
    pub fn offer_item_id(&self) -> &OfferItemId {
        &self.offer_item_id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// One assignee's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionAnswer {
    pub offer_item_id: OfferItemId,
    pub assignee_id: AssigneeId,
    pub question_id: QuestionId,
    pub content: String,
}

impl QuestionAnswer {
    /// Validates a full answer sheet against the questionnaire and returns
    /// the answers in question order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the answer count differs from
    /// the question count, a question is unanswered, or a radio answer is
    /// not one of its options.
    pub fn for_questionnaire(
        assignee_id: &AssigneeId,
        questionnaire: &Questionnaire,
        answers: &HashMap<QuestionId, String>,
    ) -> Result<Vec<Self>, DomainError> {
        if answers.len() != questionnaire.questions.len() {
            return Err(DomainError::validation(format!(
                "expected {} answers, got {}",
                questionnaire.questions.len(),
                answers.len()
            )));
        }
        questionnaire
            .questions
            .iter()
            .map(|question| {
                let Some(content) = answers.get(&question.id) else {
                    return Err(DomainError::validation(format!(
                        "question {} is not answered",
                        question.id
                    )));
                };
                if question.question_type == QuestionType::Radio
                    && !question.options.contains(content)
                {
                    return Err(DomainError::validation(format!(
                        "answer to question {} must be one of its options",
                        question.id
                    )));
                }
                Ok(Self {
                    offer_item_id: questionnaire.offer_item_id.clone(),
                    assignee_id: assignee_id.clone(),
                    question_id: question.id.clone(),
                    content: content.clone(),
                })
            })
            .collect()
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.is_empty() {
        return Err(DomainError::validation("question title is required"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), DomainError> {
    if description.is_empty() {
        return Err(DomainError::validation(
            "questionnaire description is required",
        ));
    }
    Ok(())
}

fn validate_options(question_type: QuestionType, options: &[String]) -> Result<(), DomainError> {
    match question_type {
        QuestionType::Radio => {
            if options.is_empty() {
                return Err(DomainError::validation(
                    "radio question requires at least one option",
                ));
            }
            let mut seen = HashSet::with_capacity(options.len());
            if !options.iter().all(|o| seen.insert(o)) {
                return Err(DomainError::validation(
                    "radio question options must be unique",
                ));
            }
            Ok(())
        }
        QuestionType::Text if options.is_empty() => Ok(()),
        QuestionType::Text => Err(DomainError::validation(
            "text question must not have options",
        )),
    }
}

fn validate_questions(questions: &[Question]) -> Result<(), DomainError> {
    if questions.is_empty() {
        return Err(DomainError::validation(
            "questionnaire requires at least one question",
        ));
    }
    let mut titles = HashSet::with_capacity(questions.len());
    for question in questions {
        if !titles.insert(question.title.as_str()) {
            return Err(DomainError::validation(format!(
                "question title {:?} is duplicated",
                question.title
            )));
        }
    }
    Ok(())
}
