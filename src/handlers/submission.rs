// src/handlers/submission.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    handlers::quiz::fetch_quiz,
    models::{
        quiz::Question,
        submission::{GradedAnswer, SubmissionRow, SubmissionView},
    },
    utils::jwt::Claims,
};

/// Shared SELECT for submission reads, joined with the student profile and
/// user account that enrich the response.
const SUBMISSION_SELECT: &str = r#"
    SELECT sub.id, sub.quiz_id, sub.student_id, sub.answers, sub.score, sub.submitted_at,
           s.student_number, s.program, s.year_level, u.full_name, u.email
    FROM submissions sub
    JOIN students s ON sub.student_id = s.id
    JOIN users u ON s.user_id = u.id
"#;

/// Grades an ordered answer list against a quiz's question bank.
///
/// Answer i is compared to question i by position using exact string
/// equality. A correct answer is worth the question's point value (1 when
/// unset); an incorrect one is worth 0, with the correct answer snapshotted
/// either way. Fewer answers than questions leaves the trailing questions
/// ungraded (they contribute zero); more answers than questions is a
/// malformed submission.
fn grade_attempt(
    questions: &[Question],
    answers: &[String],
) -> Result<(Vec<GradedAnswer>, i64), AppError> {
    if answers.len() > questions.len() {
        return Err(AppError::BadRequest(format!(
            "Received {} answers for {} questions",
            answers.len(),
            questions.len()
        )));
    }

    let mut graded = Vec::with_capacity(answers.len());
    let mut score = 0;

    for (i, answer) in answers.iter().enumerate() {
        let question = &questions[i];
        let correct = *answer == question.correct_answer;
        let points = if correct { question.point_value() } else { 0 };
        score += points;

        graded.push(GradedAnswer {
            question_index: i as i64,
            answer: answer.clone(),
            correct_answer: question.correct_answer.clone(),
            correct,
            points,
        });
    }

    Ok((graded, score))
}

/// Submits (or resubmits) a student's answers for a quiz.
///
/// The body is taken as raw JSON so a missing or non-array `answers` field
/// surfaces as a 400 rather than a deserialization rejection. Grading is a
/// single pass; persistence is one conditional insert-or-replace keyed by
/// (quiz, student), so two racing submissions cannot produce a duplicate
/// record or a lost update.
pub async fn submit_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let answers = body
        .get("answers")
        .and_then(|v| v.as_array())
        .ok_or(AppError::BadRequest(
            "An answers array is required".to_string(),
        ))?;

    let answers: Vec<String> = answers
        .iter()
        .map(|v| {
            v.as_str().map(str::to_owned).ok_or(AppError::BadRequest(
                "Every answer must be a string".to_string(),
            ))
        })
        .collect::<Result<_, _>>()?;

    let user_id = claims.user_id()?;
    let student_id: i64 = sqlx::query_scalar("SELECT id FROM students WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::Forbidden(
            "Only students can submit quiz answers".to_string(),
        ))?;

    let quiz = fetch_quiz(&pool, quiz_id).await?;

    let (graded, score) = grade_attempt(&quiz.questions, &answers)?;

    let submission_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO submissions (quiz_id, student_id, answers, score, submitted_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (quiz_id, student_id) DO UPDATE SET
            answers = excluded.answers,
            score = excluded.score,
            submitted_at = excluded.submitted_at
        RETURNING id
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .bind(SqlJson(&graded))
    .bind(score)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let sql = format!("{} WHERE sub.id = ?", SUBMISSION_SELECT);
    let row = sqlx::query_as::<_, SubmissionRow>(&sql)
        .bind(submission_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(SubmissionView::from(row)))
}

/// Retrieves one student's graded submission for a quiz, enriched with the
/// student's display attributes. Students may only read their own;
/// instructors and admins may read any.
pub async fn get_submission(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, student_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.is_staff() {
        let own: Option<i64> = sqlx::query_scalar("SELECT id FROM students WHERE user_id = ?")
            .bind(claims.user_id()?)
            .fetch_optional(&pool)
            .await?;

        if own != Some(student_id) {
            return Err(AppError::Forbidden(
                "You may only view your own submission".to_string(),
            ));
        }
    }

    let sql = format!(
        "{} WHERE sub.quiz_id = ? AND sub.student_id = ?",
        SUBMISSION_SELECT
    );
    let row = sqlx::query_as::<_, SubmissionRow>(&sql)
        .bind(quiz_id)
        .bind(student_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(SubmissionView::from(row)))
}

/// Lists every submission for a quiz, enriched, newest first.
/// Instructor/admin only.
pub async fn list_submissions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.is_staff() {
        return Err(AppError::Forbidden(
            "Instructor or admin role required".to_string(),
        ));
    }

    let sql = format!(
        "{} WHERE sub.quiz_id = ? ORDER BY sub.submitted_at DESC, sub.id DESC",
        SUBMISSION_SELECT
    );
    let rows = sqlx::query_as::<_, SubmissionRow>(&sql)
        .bind(quiz_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list submissions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let views: Vec<SubmissionView> = rows.into_iter().map(SubmissionView::from).collect();

    Ok(Json(views))
}
