// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::models::student::StudentInfo;

/// The per-question outcome of grading one submitted answer.
/// Aligned positionally to the quiz's question order at grading time;
/// the correct answer is snapshotted so later quiz edits do not rewrite
/// history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    pub question_index: i64,
    pub answer: String,
    pub correct_answer: String,
    pub correct: bool,
    pub points: i64,
}

/// Flat row shape for the submissions/students/users join.
/// Submissions are logically keyed by (quiz_id, student_id); at most one
/// row per pair.
#[derive(Debug, FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub answers: Json<Vec<GradedAnswer>>,
    pub score: i64,
    pub submitted_at: DateTime<Utc>,
    pub student_number: String,
    pub program: String,
    pub year_level: i64,
    pub full_name: String,
    pub email: String,
}

/// DTO for sending a graded submission to clients, enriched with the
/// student's display attributes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub answers: Vec<GradedAnswer>,
    pub score: i64,
    pub submitted_at: DateTime<Utc>,
    pub student: StudentInfo,
}

impl From<SubmissionRow> for SubmissionView {
    fn from(row: SubmissionRow) -> Self {
        let Json(answers) = row.answers;
        SubmissionView {
            id: row.id,
            quiz_id: row.quiz_id,
            student_id: row.student_id,
            answers,
            score: row.score,
            submitted_at: row.submitted_at,
            student: StudentInfo {
                student_number: row.student_number,
                program: row.program,
                year_level: row.year_level,
                full_name: row.full_name,
                email: row.email,
            },
        }
    }
}
