// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
};

/// Cross-field invariants shared by create and update: a question carries
/// exactly one of prompt/image, and the canonical answer must be one of the
/// listed options. Enforced at authoring time, not re-checked at grading.
fn check_question_invariants(
    prompt: &Option<String>,
    image_url: &Option<String>,
    options: &[String],
    correct_one: &str,
) -> Result<(), AppError> {
    if prompt.is_some() == image_url.is_some() {
        return Err(AppError::BadRequest(
            "A question needs exactly one of 'prompt' or 'image_url'".to_string(),
        ));
    }

    if !options.iter().any(|opt| opt == correct_one) {
        return Err(AppError::BadRequest(
            "'correct_one' must equal one of the options".to_string(),
        ));
    }

    Ok(())
}

/// Creates a new question.
/// Teacher only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    check_question_invariants(
        &payload.prompt,
        &payload.image_url,
        &payload.options,
        &payload.correct_one,
    )?;

    let options_json = serde_json::to_value(&payload.options)?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO questions (prompt, image_url, options, correct_one)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.prompt)
    .bind(&payload.image_url)
    .bind(&options_json)
    .bind(&payload.correct_one)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates a question by ID. Fields are optional; the merged row is
/// re-validated against the authoring invariants before writing.
/// Teacher only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = sqlx::query_as::<_, Question>(
        "SELECT id, prompt, image_url, options, correct_one, created_at
         FROM questions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Question not found".to_string()))?;

    // Sending a prompt clears a previous image prompt and vice versa.
    let (prompt, image_url) = match (payload.prompt, payload.image_url) {
        (Some(p), None) => (Some(p), None),
        (None, Some(img)) => (None, Some(img)),
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest(
                "A question needs exactly one of 'prompt' or 'image_url'".to_string(),
            ));
        }
        (None, None) => (existing.prompt, existing.image_url),
    };

    let options = payload.options.unwrap_or_else(|| existing.options.0.clone());
    let correct_one = payload.correct_one.unwrap_or(existing.correct_one);

    check_question_invariants(&prompt, &image_url, &options, &correct_one)?;

    let options_json = serde_json::to_value(&options)?;

    sqlx::query(
        r#"
        UPDATE questions
        SET prompt = $1, image_url = $2, options = $3, correct_one = $4
        WHERE id = $5
        "#,
    )
    .bind(&prompt)
    .bind(&image_url)
    .bind(&options_json)
    .bind(&correct_one)
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a question by ID.
/// Teacher only. Section links are removed by cascade.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                AppError::Conflict("Question is referenced by recorded attempts".to_string())
            } else {
                tracing::error!("Failed to delete question: {:?}", e);
                AppError::from(e)
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
