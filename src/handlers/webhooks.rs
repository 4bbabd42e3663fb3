// src/handlers/webhooks.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{config::Config, error::AppError, models::user::SyncUserRequest};

/// Constant-time equality for the shared webhook secret, so the comparison
/// leaks nothing about how many leading bytes matched.
fn secrets_match(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();

    if given.len() != expected.len() {
        return false;
    }

    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Syncs a user record from the identity provider.
///
/// The provider calls this webhook on user lifecycle events. The call is
/// authenticated with a shared secret header, not a session token.
/// 'created' and 'updated' upsert on the external id, so replayed deliveries
/// are harmless; 'deleted' removes the row.
pub async fn sync_user(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    headers: HeaderMap,
    Json(payload): Json<SyncUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let secret = headers
        .get("x-webhook-secret")
        .and_then(|value| value.to_str().ok());

    match secret {
        Some(secret) if secrets_match(secret, &config.webhook_secret) => {}
        _ => return Err(AppError::Unauthorized("Invalid webhook secret".to_string())),
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    match payload.event.as_str() {
        "created" | "updated" => {
            let (id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO users (external_id, username, email, role)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (external_id) DO UPDATE SET
                    username = EXCLUDED.username,
                    email = EXCLUDED.email,
                    role = EXCLUDED.role
                RETURNING id
                "#,
            )
            .bind(&payload.external_id)
            .bind(&payload.username)
            .bind(&payload.email)
            .bind(&payload.role)
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to sync user: {:?}", e);
                AppError::from(e)
            })?;

            Ok((StatusCode::OK, Json(serde_json::json!({"id": id}))))
        }
        "deleted" => {
            sqlx::query("DELETE FROM users WHERE external_id = $1")
                .bind(&payload.external_id)
                .execute(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to delete user: {:?}", e);
                    AppError::from(e)
                })?;

            Ok((StatusCode::OK, Json(serde_json::json!({"deleted": true}))))
        }
        other => Err(AppError::BadRequest(format!(
            "Unknown webhook event '{}'",
            other
        ))),
    }
}
