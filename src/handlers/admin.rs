// src/handlers/admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{error::AppError, models::user::User, utils::hash::hash_password};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, full_name, role, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// DTO for Admin creating a user (can specify role).
/// This is how instructor accounts come to exist.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreateUserRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    pub role: String, // 'student', 'instructor', or 'admin'
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !["student", "instructor", "admin"].contains(&payload.role.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid role '{}'",
            payload.role
        )));
    }

    let hashed_password = hash_password(&payload.password)?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password, full_name, role)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.full_name)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Email '{}' already exists", payload.email))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}
