// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new student account.
///
/// Creates the user row and the student profile in one transaction so a
/// duplicate student number cannot leave a profile-less account behind.
/// Returns 201 Created with the new ids.
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;

    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password, full_name, role)
        VALUES (?, ?, ?, 'student')
        RETURNING id
        "#,
    )
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.full_name)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let student_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO students (user_id, student_number, program, year_level)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&payload.student_number)
    .bind(&payload.program)
    .bind(payload.year_level)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!(
                "Student number '{}' is already registered",
                payload.student_number
            ))
        } else {
            tracing::error!("Failed to create student profile: {:?}", e);
            AppError::from(e)
        }
    })?;

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": user_id, "studentId": student_id })),
    ))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password, full_name, role, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(user.id, &user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role
    })))
}
