// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::{
    config::{DEFAULT_QUESTION_POINTS, PRIVILEGED_ROLES},
    error::AppError,
};

/// Returns true for roles allowed to see correct answers (instructor, admin).
pub fn is_privileged(role: &str) -> bool {
    PRIVILEGED_ROLES.contains(&role)
}

/// A single question embedded in a quiz's question bank.
/// Questions have no independent identity; answers are aligned to them
/// purely by array index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// The question text.
    pub question: String,

    /// Question type: 'multiple-choice' or 'true-false'.
    #[serde(rename = "type")]
    pub question_type: String,

    /// Ordered list of answer options.
    pub options: Vec<String>,

    /// The correct option, compared with exact string equality.
    pub correct_answer: String,

    /// Point value; questions without one are worth 1 point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

impl Question {
    pub fn point_value(&self) -> i64 {
        self.points.unwrap_or(DEFAULT_QUESTION_POINTS)
    }
}

/// Represents the 'quizzes' table in the database.
/// The question bank is stored as a JSON array column.
#[derive(Debug, Clone, FromRow)]
pub struct Quiz {
    pub id: i64,
    pub subject_id: i64,
    pub offering_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub total_points: i64,

    /// Lifecycle status: 'draft' or 'published'.
    pub status: String,

    pub questions: Json<Vec<Question>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sum of the quiz's question point values. Always computed server-side;
/// a client-supplied totalPoints field is ignored.
pub fn total_points(questions: &[Question]) -> i64 {
    questions.iter().map(|q| q.point_value()).sum()
}

/// DTO for creating or replacing a quiz. Question fields are optional at
/// the serde level so that an incomplete question surfaces as a 400 with a
/// descriptive message instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub questions: Option<Vec<QuestionInput>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
}

impl QuizPayload {
    /// Checks the embedded question bank and returns the concrete questions.
    ///
    /// Fails with a 400 if the question list is absent or empty, or if any
    /// question is missing its text, type, options, or correct answer.
    /// Whether correctAnswer actually appears in options is not checked.
    pub fn validated_questions(&self) -> Result<Vec<Question>, AppError> {
        let inputs = match &self.questions {
            Some(qs) if !qs.is_empty() => qs,
            _ => {
                return Err(AppError::BadRequest(
                    "A quiz requires a non-empty questions array".to_string(),
                ));
            }
        };

        let mut questions = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let question = input.question.clone().filter(|s| !s.is_empty()).ok_or_else(|| {
                AppError::BadRequest(format!("Question {} is missing its text", i + 1))
            })?;
            let question_type = input.question_type.clone().ok_or_else(|| {
                AppError::BadRequest(format!("Question {} is missing its type", i + 1))
            })?;
            let options = input.options.clone().ok_or_else(|| {
                AppError::BadRequest(format!("Question {} is missing its options", i + 1))
            })?;
            let correct_answer = input.correct_answer.clone().ok_or_else(|| {
                AppError::BadRequest(format!("Question {} is missing its correct answer", i + 1))
            })?;

            questions.push(Question {
                question,
                question_type,
                options,
                correct_answer,
                points: input.points,
            });
        }

        Ok(questions)
    }

    /// Validates the optional lifecycle status field.
    pub fn validated_status(&self) -> Result<Option<&str>, AppError> {
        match self.status.as_deref() {
            None => Ok(None),
            Some(s @ ("draft" | "published")) => Ok(Some(s)),
            Some(other) => Err(AppError::BadRequest(format!(
                "Invalid quiz status '{}'",
                other
            ))),
        }
    }
}

/// Role-appropriate projection of a question. For unprivileged callers the
/// correct answer is absent entirely rather than nulled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

/// DTO for sending a quiz to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    pub id: i64,
    pub subject_id: i64,
    pub offering_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub total_points: i64,
    pub status: String,
    pub questions: Vec<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizView {
    /// Builds the response payload for a caller with the given role.
    ///
    /// This is the only place correct answers are stripped; both the list
    /// and single-quiz read paths go through it. The stored document is
    /// never mutated, only the projection.
    pub fn for_role(quiz: Quiz, role: &str) -> Self {
        let privileged = is_privileged(role);
        let Json(questions) = quiz.questions;

        let questions = questions
            .into_iter()
            .map(|q| QuestionView {
                question: q.question,
                question_type: q.question_type,
                options: q.options,
                correct_answer: privileged.then_some(q.correct_answer),
                points: q.points,
            })
            .collect();

        QuizView {
            id: quiz.id,
            subject_id: quiz.subject_id,
            offering_id: quiz.offering_id,
            title: quiz.title,
            description: quiz.description,
            duration_minutes: quiz.duration_minutes,
            total_points: quiz.total_points,
            status: quiz.status,
            questions,
            expires_at: quiz.expires_at,
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
        }
    }
}
