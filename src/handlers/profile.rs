// src/handlers/profile.rs

use axum::{Json, extract::{Extension, State}, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::user::{MeResponse, User},
    utils::jwt::Claims,
};

/// Returns the current user's profile with a role-appropriate activity count.
pub async fn me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, external_id, username, email, role, created_at
         FROM users WHERE external_id = $1",
    )
    .bind(&claims.sub)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Forbidden(
        "No user record for this session".to_string(),
    ))?;

    let (attempts_count, quizzes_count) = match user.role.as_str() {
        "STUDENT" => {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM quiz_attempts WHERE student_id = $1")
                    .bind(user.id)
                    .fetch_one(&pool)
                    .await?;
            (count, 0)
        }
        _ => {
            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM quizzes WHERE teacher_id = $1")
                    .bind(user.id)
                    .fetch_one(&pool)
                    .await?;
            (0, count)
        }
    };

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        created_at: user.created_at,
        attempts_count,
        quizzes_count,
    }))
}
