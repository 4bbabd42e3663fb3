// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
/// Rows are synced from the identity provider, never created by login flows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Stable identifier assigned by the identity provider.
    pub external_id: String,

    pub username: String,

    pub email: Option<String>,

    /// User role: 'STUDENT' or 'TEACHER'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Attempts made (students) — zero for teachers.
    pub attempts_count: i64,
    /// Quizzes authored (teachers) — zero for students.
    pub quizzes_count: i64,
}

/// Payload delivered by the identity provider's user webhook.
#[derive(Debug, Deserialize, Validate)]
pub struct SyncUserRequest {
    /// One of 'created', 'updated', 'deleted'.
    #[validate(length(min = 1, max = 20))]
    pub event: String,

    #[validate(length(min = 1, max = 100))]
    pub external_id: String,

    #[validate(length(min = 1, max = 100))]
    pub username: String,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(custom(function = validate_role))]
    pub role: String,
}

/// Restricts the role claim to the two roles the platform knows.
fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != "STUDENT" && role != "TEACHER" {
        return Err(validator::ValidationError::new("invalid_role"));
    }
    Ok(())
}
