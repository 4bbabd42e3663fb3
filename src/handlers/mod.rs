// src/handlers/mod.rs

pub mod profile;
pub mod questions;
pub mod quizzes;
pub mod subjects;
pub mod submissions;
pub mod webhooks;

use sqlx::PgPool;

use crate::{error::AppError, models::user::User, utils::jwt::Claims};

/// Maps the identity provider's external user id plus a required role to the
/// internal user row.
///
/// Returns `Forbidden` when no record matches the session or the record's
/// role differs from the required one. A missing session never reaches this
/// point; `auth_middleware` already rejected it with 401.
pub async fn require_user(pool: &PgPool, claims: &Claims, role: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, external_id, username, email, role, created_at
         FROM users WHERE external_id = $1",
    )
    .bind(&claims.sub)
    .fetch_optional(pool)
    .await?;

    match user {
        Some(user) if user.role == role => Ok(user),
        Some(_) => Err(AppError::Forbidden(format!("{} account required", role))),
        None => Err(AppError::Forbidden(
            "No user record for this session".to_string(),
        )),
    }
}
