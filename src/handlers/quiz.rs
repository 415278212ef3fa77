// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::{SqlitePool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::quiz::{Quiz, QuizPayload, QuizView, total_points},
    utils::{html::clean_html, jwt::Claims},
};

fn require_staff(claims: &Claims) -> Result<(), AppError> {
    if !claims.is_staff() {
        return Err(AppError::Forbidden(
            "Instructor or admin role required".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn fetch_quiz(pool: &SqlitePool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, subject_id, offering_id, title, description, duration_minutes,
               total_points, status, questions, expires_at, created_at, updated_at
        FROM quizzes
        WHERE id = ?
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Creates a quiz for a subject offering.
///
/// Validates the question bank (non-empty, every question complete),
/// derives totalPoints from the question point values, and persists the
/// quiz with status 'draft'. Instructor/admin only.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path((subject_id, offering_id)): Path<(i64, i64)>,
    Json(payload): Json<QuizPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_staff(&claims)?;

    let questions = payload.validated_questions()?;
    let points = total_points(&questions);
    let description = payload.description.as_deref().map(clean_html);

    let quiz_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes
        (subject_id, offering_id, title, description, duration_minutes,
         total_points, status, questions, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, 'draft', ?, ?)
        RETURNING id
        "#,
    )
    .bind(subject_id)
    .bind(offering_id)
    .bind(&payload.title)
    .bind(&description)
    .bind(payload.duration_minutes)
    .bind(points)
    .bind(SqlJson(&questions))
    .bind(payload.expires_at)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let quiz = fetch_quiz(&pool, quiz_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(QuizView::for_role(quiz, &claims.role)),
    ))
}

/// Lists all quizzes for an offering, newest first.
/// Correct answers are stripped for unprivileged callers.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(offering_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, subject_id, offering_id, title, description, duration_minutes,
               total_points, status, questions, expires_at, created_at, updated_at
        FROM quizzes
        WHERE offering_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(offering_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let views: Vec<QuizView> = quizzes
        .into_iter()
        .map(|q| QuizView::for_role(q, &claims.role))
        .collect();

    Ok(Json(views))
}

/// Retrieves a single quiz by ID.
/// Correct answers are stripped for unprivileged callers.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = fetch_quiz(&pool, quiz_id).await?;

    Ok(Json(QuizView::for_role(quiz, &claims.role)))
}

/// Replaces a quiz's mutable fields (title, description, duration,
/// questions, status, expiration). totalPoints is re-derived from the new
/// question bank. Instructor/admin only.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<QuizPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_staff(&claims)?;

    let existing = fetch_quiz(&pool, quiz_id).await?;

    let questions = payload.validated_questions()?;
    let points = total_points(&questions);
    let status = payload
        .validated_status()?
        .map(|s| s.to_owned())
        .unwrap_or(existing.status);
    let description = payload.description.as_deref().map(clean_html);

    sqlx::query(
        r#"
        UPDATE quizzes
        SET title = ?, description = ?, duration_minutes = ?, total_points = ?,
            status = ?, questions = ?, expires_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.title)
    .bind(&description)
    .bind(payload.duration_minutes)
    .bind(points)
    .bind(&status)
    .bind(SqlJson(&questions))
    .bind(payload.expires_at)
    .bind(Utc::now())
    .bind(quiz_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let quiz = fetch_quiz(&pool, quiz_id).await?;

    Ok(Json(QuizView::for_role(quiz, &claims.role)))
}

/// Deletes a quiz along with every submission referencing it, in one
/// transaction so no orphaned grading records survive a partial failure.
/// Instructor/admin only.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_staff(&claims)?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM submissions WHERE quiz_id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete submissions for quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    let result = sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        // Dropping the transaction rolls back the submission delete.
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tx.commit().await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Quiz and its submissions deleted" })),
    ))
}
